//! OpenTelemetry Tracing Integration
//!
//! Structured logging to stderr (stdout carries the rendered overview and the
//! live stream) plus optional OTLP trace export.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: filter directives (default adds `market_overview=info`)
//! - `OTEL_ENABLED`: Set to "true" to export traces (default: false)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: http://localhost:4317)
//! - `OTEL_SERVICE_NAME`: Service name for traces (default: market-overview)
//!
//! # Usage
//!
//! ```ignore
//! use market_overview::infrastructure::telemetry;
//!
//! // Keep the guard alive until exit.
//! let _guard = telemetry::init()?;
//! ```

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Service name for OpenTelemetry traces.
const DEFAULT_SERVICE_NAME: &str = "market-overview";

/// Default OTLP endpoint (gRPC).
const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4317";

/// Directives added on top of `RUST_LOG`.
const DEFAULT_DIRECTIVES: [&str; 3] = ["market_overview=info", "hyper=warn", "reqwest=warn"];

/// Guard that shuts down OpenTelemetry when dropped.
pub struct TelemetryGuard {
    tracer_provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.tracer_provider.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("Failed to shutdown OpenTelemetry tracer provider: {e}");
        }
    }
}

/// Telemetry setup error.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// A filter directive did not parse.
    #[error("invalid log directive: {0}")]
    Directive(#[from] tracing_subscriber::filter::ParseError),
    /// The OTLP exporter could not be built.
    #[error("failed to create OTLP exporter: {0}")]
    Exporter(String),
    /// A global subscriber was already installed.
    #[error("failed to install subscriber: {0}")]
    Install(String),
}

/// Telemetry configuration.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Whether OTLP export is enabled.
    pub enabled: bool,
    /// OTLP exporter endpoint.
    pub otlp_endpoint: String,
    /// Service name for traces.
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            otlp_endpoint: DEFAULT_OTLP_ENDPOINT.to_string(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let enabled = std::env::var("OTEL_ENABLED")
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1"))
            .unwrap_or(false);

        let otlp_endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .unwrap_or_else(|_| DEFAULT_OTLP_ENDPOINT.to_string());

        let service_name =
            std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| DEFAULT_SERVICE_NAME.to_string());

        Self {
            enabled,
            otlp_endpoint,
            service_name,
        }
    }
}

/// Initialize telemetry from the environment.
///
/// # Errors
///
/// Returns an error if the filter, exporter, or subscriber cannot be set up.
pub fn init() -> Result<TelemetryGuard, TelemetryError> {
    init_with_config(TelemetryConfig::from_env())
}

/// Initialize telemetry with custom configuration.
///
/// # Errors
///
/// Returns an error if the filter, exporter, or subscriber cannot be set up.
pub fn init_with_config(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let env_filter = build_filter()?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if !config.enabled {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::Install(e.to_string()))?;

        return Ok(TelemetryGuard {
            tracer_provider: None,
        });
    }

    let otlp_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&config.otlp_endpoint)
        .build()
        .map_err(|e| TelemetryError::Exporter(e.to_string()))?;

    let tracer_provider = SdkTracerProvider::builder()
        .with_batch_exporter(otlp_exporter)
        .with_resource(
            opentelemetry_sdk::Resource::builder()
                .with_service_name(config.service_name.clone())
                .build(),
        )
        .build();

    let tracer = tracer_provider.tracer(config.service_name);
    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()
        .map_err(|e| TelemetryError::Install(e.to_string()))?;

    Ok(TelemetryGuard {
        tracer_provider: Some(tracer_provider),
    })
}

fn build_filter() -> Result<EnvFilter, TelemetryError> {
    DEFAULT_DIRECTIVES
        .iter()
        .try_fold(EnvFilter::from_default_env(), |filter, directive| {
            Ok(filter.add_directive(directive.parse()?))
        })
}

// =============================================================================
// Tests
// =============================================================================
