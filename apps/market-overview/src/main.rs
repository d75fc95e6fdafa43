//! Market Overview Binary
//!
//! Loads the market overview, prints it, and optionally streams a reasoning
//! session.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin market-overview -- show
//! cargo run --bin market-overview -- --lang en reason
//! cargo run --bin market-overview -- watch
//! ```
//!
//! # Environment Variables
//!
//! - `MARKET_OVERVIEW_BASE_URL`: Backend API root (default: <http://127.0.0.1:8000/api>)
//! - `MARKET_OVERVIEW_LANGUAGE`: en | zh, used when no preference is saved
//! - `MARKET_OVERVIEW_PREFERENCES_PATH`: Language preference file
//! - `MARKET_OVERVIEW_RUN_LLM`: Ask the backend to run the LLM step (default: true)
//! - `MARKET_OVERVIEW_ABANDONED_STREAM`: reload | skip (default: reload)
//! - `MARKET_OVERVIEW_HISTORY_ROWS`: History rows per index (default: 10)
//! - `MARKET_OVERVIEW_REQUEST_TIMEOUT_SECS` / `MARKET_OVERVIEW_CONNECT_TIMEOUT_SECS` /
//!   `MARKET_OVERVIEW_STREAM_IDLE_TIMEOUT_SECS`: HTTP timeouts
//! - `MARKET_OVERVIEW_RETRY_*`: Aggregate fetch retry policy
//! - `MARKET_OVERVIEW_METRICS_PORT`: Prometheus port (default: 0, disabled)
//! - `OTEL_ENABLED` / `OTEL_EXPORTER_OTLP_ENDPOINT` / `OTEL_SERVICE_NAME`: Trace export
//! - `RUST_LOG`: Log filter (logs go to stderr)

use std::io::Write as _;

use anyhow::{Context as _, anyhow};
use clap::{Parser, Subcommand};
use market_overview::{
    Dashboard, DashboardConfig, FileLanguageStore, HttpOverviewClient, Language, MetricsConfig,
    RenderedView, ScreenEvent, SectionRegistry, SessionReport, SnapshotRenderer,
    ViewStateController, init_metrics, init_telemetry,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

type ClientDashboard = Dashboard<HttpOverviewClient, FileLanguageStore>;

/// Headless market overview client.
#[derive(Debug, Parser)]
#[command(name = "market-overview", version, about)]
struct Cli {
    /// Backend API root, overriding `MARKET_OVERVIEW_BASE_URL`.
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Display language (en or zh); saved as the new preference.
    #[arg(long, global = true)]
    lang: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// Load and print the overview.
    Show,
    /// Load the overview, stream one reasoning session, then print the reloaded overview.
    Reason {
        /// Ask the backend to skip the LLM step.
        #[arg(long)]
        no_llm: bool,
    },
    /// Interactive mode reading commands from stdin.
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    load_dotenv();

    let _telemetry_guard = init_telemetry().context("failed to initialize telemetry")?;

    let mut config = DashboardConfig::from_env()?;
    if let Some(raw) = cli.base_url.as_deref() {
        config = config.with_base_url(raw)?;
    }
    let language = cli
        .lang
        .as_deref()
        .map(|raw| Language::parse(raw).ok_or_else(|| anyhow!("unsupported language: {raw}")))
        .transpose()?;
    log_config(&config);

    if config.metrics_port != 0 {
        init_metrics(&MetricsConfig::with_port(config.metrics_port))?;
    }

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(print_events(events_rx));

    let client = HttpOverviewClient::new(&config.http)?;
    let preferences = FileLanguageStore::new(&config.dashboard.preferences_path);
    let mut dashboard = Dashboard::new(client, preferences)
        .with_renderer(SnapshotRenderer::new(SectionRegistry::with_history_rows(
            config.dashboard.history_rows,
        )))
        .with_view(ViewStateController::with_events(events_tx))
        .with_policy(config.dashboard.abandoned_stream);
    if let Some(configured) = config.dashboard.language {
        dashboard = dashboard.with_language(configured);
    }

    if let Err(e) = dashboard.start().await {
        tracing::warn!(error = %e, "Initial load failed");
    }
    if let Some(language) = language
        && language != dashboard.locale().language()
    {
        dashboard.switch_language(language);
    }

    match cli.command.unwrap_or(Command::Show) {
        Command::Show => {}
        Command::Reason { no_llm } => {
            run_session(&mut dashboard, config.dashboard.run_llm && !no_llm).await?;
        }
        Command::Watch => watch(&mut dashboard, config.dashboard.run_llm).await?,
    }

    // Closes the event channel so the printer drains and exits.
    drop(dashboard);
    printer.await?;

    tracing::info!("Market overview stopped");
    Ok(())
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(e) if e.not_found() => load_dotenv_from_ancestors(),
        Err(e) => eprintln!("Failed to load .env: {e}"),
    }
}

/// Walk up from the working directory and load the first `.env` found.
fn load_dotenv_from_ancestors() {
    let Ok(cwd) = std::env::current_dir() else {
        return;
    };
    for dir in cwd.ancestors().skip(1) {
        let env_path = dir.join(".env");
        if env_path.exists() {
            // Telemetry is not up yet, so report straight to stderr.
            if let Some(message) = load_env_file(&env_path) {
                eprintln!("{message}");
            }
            return;
        }
    }
}

/// Load one env file, describing the failure if it cannot be applied.
fn load_env_file(path: &std::path::Path) -> Option<String> {
    dotenvy::from_path(path)
        .err()
        .map(|e| format!("Failed to load {}: {e}", path.display()))
}

/// Log the parsed configuration.
fn log_config(config: &DashboardConfig) {
    tracing::info!(
        base_url = %config.http.base_url,
        language = ?config.dashboard.language,
        run_llm = config.dashboard.run_llm,
        abandoned_stream = ?config.dashboard.abandoned_stream,
        metrics_port = config.metrics_port,
        "Configuration loaded"
    );
    tracing::debug!(
        request_timeout_secs = config.http.request_timeout.as_secs(),
        stream_idle_timeout_secs = config.http.stream_idle_timeout.as_secs(),
        max_attempts = config.http.retry.max_attempts,
        preferences_path = %config.dashboard.preferences_path.display(),
        "HTTP and preference settings"
    );
}

// =============================================================================
// Sessions
// =============================================================================

/// Run one reasoning session; Ctrl+C cancels it.
async fn run_session(dashboard: &mut ClientDashboard, run_llm: bool) -> anyhow::Result<SessionReport> {
    let cancel = CancellationToken::new();
    let watcher = tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    let report = dashboard.run_reasoning_with_cancel(run_llm, cancel).await;
    watcher.abort();

    let report = report?;
    tracing::info!(
        outcome = report.outcome.label(),
        reload = ?report.reload,
        "Session report"
    );
    Ok(report)
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    if signal::ctrl_c().await.is_ok() {
        tracing::info!("Received Ctrl+C, cancelling reasoning session");
        cancel.cancel();
    }
}

/// A line typed in watch mode.
#[derive(Debug, PartialEq, Eq)]
enum WatchCommand {
    Reason { run_llm: bool },
    Reload,
    Lang(Language),
    Show,
    Help,
    Quit,
}

impl WatchCommand {
    fn parse(line: &str, run_llm: bool) -> Result<Option<Self>, String> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(None);
        };
        let command = match head.to_lowercase().as_str() {
            "reason" | "r" => Self::Reason {
                run_llm: run_llm && words.next() != Some("--no-llm"),
            },
            "reload" => Self::Reload,
            "lang" | "language" => {
                let tag = words.next().ok_or("usage: lang <en|zh>")?;
                Self::Lang(Language::parse(tag).ok_or_else(|| format!("unsupported language: {tag}"))?)
            }
            "show" => Self::Show,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => return Err(format!("unknown command: {other} (try help)")),
        };
        Ok(Some(command))
    }
}

const WATCH_HELP: &str = "commands: reason [--no-llm] | reload | lang <en|zh> | show | quit";

/// Interactive loop over stdin until `quit`, end of input, or Ctrl+C.
async fn watch(dashboard: &mut ClientDashboard, run_llm: bool) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    eprintln!("{WATCH_HELP}");

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            result = signal::ctrl_c() => {
                result?;
                tracing::info!("Received Ctrl+C, exiting");
                break;
            }
        };
        let Some(line) = line else {
            break;
        };

        match WatchCommand::parse(&line, run_llm) {
            Ok(None) => {}
            Ok(Some(WatchCommand::Reason { run_llm })) => {
                run_session(dashboard, run_llm).await?;
            }
            Ok(Some(WatchCommand::Reload)) => {
                if let Err(e) = dashboard.load().await {
                    tracing::warn!(error = %e, "Reload failed");
                }
            }
            Ok(Some(WatchCommand::Lang(language))) => dashboard.switch_language(language),
            Ok(Some(WatchCommand::Show)) => {
                if let Some(view) = dashboard.view().snapshot() {
                    print_snapshot(view);
                }
            }
            Ok(Some(WatchCommand::Help)) => eprintln!("{WATCH_HELP}"),
            Ok(Some(WatchCommand::Quit)) => break,
            Err(message) => eprintln!("{message}"),
        }
    }
    Ok(())
}

// =============================================================================
// Terminal Output
// =============================================================================

/// Print screen events to stdout.
///
/// The snapshot is printed whenever it is rendered while visible, or when it
/// becomes visible again after a session. Stream text is printed as it
/// arrives.
async fn print_events(mut events: mpsc::UnboundedReceiver<ScreenEvent>) {
    let mut snapshot_visible = true;
    let mut latest: Option<Box<RenderedView>> = None;
    let mut shown = String::new();

    while let Some(event) = events.recv().await {
        match event {
            ScreenEvent::SnapshotRendered(view) => {
                if snapshot_visible {
                    print_snapshot(&view);
                }
                latest = Some(view);
            }
            ScreenEvent::Containers { snapshot, stream } => {
                snapshot_visible = snapshot;
                if stream {
                    println!("\n-----");
                }
                if snapshot {
                    println!();
                    if let Some(view) = &latest {
                        print_snapshot(view);
                    }
                }
            }
            ScreenEvent::StreamCleared => shown.clear(),
            ScreenEvent::StreamAppended(piece) => {
                print!("{piece}");
                let _ = std::io::stdout().flush();
                shown.push_str(&piece);
            }
            ScreenEvent::StreamReplaced(text) => {
                if shown.trim() != text {
                    println!("\n{text}");
                }
                shown = text;
            }
            ScreenEvent::State(state) => tracing::debug!(?state, "View state"),
            ScreenEvent::Trigger { enabled } => tracing::debug!(enabled, "Trigger"),
        }
    }
}

fn print_snapshot(view: &RenderedView) {
    println!("{view}");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn malformed_env_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "this line has no equals sign\n").unwrap();

        let message = load_env_file(&path).expect("parse failure should be reported");
        assert!(message.starts_with("Failed to load "));
        assert!(message.contains(".env"));
    }

    #[test]
    fn watch_commands_parse() {
        assert_eq!(WatchCommand::parse("", true), Ok(None));
        assert_eq!(
            WatchCommand::parse("reason", true),
            Ok(Some(WatchCommand::Reason { run_llm: true }))
        );
        assert_eq!(
            WatchCommand::parse("reason --no-llm", true),
            Ok(Some(WatchCommand::Reason { run_llm: false }))
        );
        assert_eq!(
            WatchCommand::parse("lang en", true),
            Ok(Some(WatchCommand::Lang(Language::En)))
        );
        assert!(WatchCommand::parse("lang fr", true).is_err());
        assert!(WatchCommand::parse("lang", true).is_err());
        assert_eq!(WatchCommand::parse("QUIT", true), Ok(Some(WatchCommand::Quit)));
        assert!(WatchCommand::parse("dance", true).is_err());
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["market-overview", "--lang", "en", "reason", "--no-llm"])
            .unwrap();
        assert_eq!(cli.lang.as_deref(), Some("en"));
        assert!(matches!(cli.command, Some(Command::Reason { no_llm: true })));

        let cli = Cli::try_parse_from(["market-overview"]).unwrap();
        assert!(cli.command.is_none());
    }
}
