#![allow(clippy::unwrap_used, clippy::expect_used)]
//! End-to-end dashboard flows over HTTP against a mock backend.

use std::time::Duration;

use market_overview::domain::language::Message;
use market_overview::{
    Dashboard, FileLanguageStore, HttpOverviewClient, HttpSettings, Language, LanguageStore,
    Locale, ReloadOutcome, RetrySettings, ScreenEvent, SectionBody, SectionId, SessionOutcome,
    TableRow, ViewState, ViewStateController,
};
use serde_json::json;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> HttpOverviewClient {
    HttpOverviewClient::new(&HttpSettings {
        base_url: server.uri(),
        stream_idle_timeout: Duration::from_secs(2),
        retry: RetrySettings {
            max_attempts: 1,
            ..RetrySettings::default()
        },
        ..HttpSettings::default()
    })
    .unwrap()
}

/// Preference store in a fresh temp directory; keep the guard alive.
fn preferences() -> (tempfile::TempDir, FileLanguageStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = FileLanguageStore::new(dir.path().join("prefs.json"));
    (dir, store)
}

fn overview_body() -> serde_json::Value {
    json!({
        "realtimeIndices": [
            {"code": "000001", "name": "上证指数", "price": 3100.456, "changeAmount": -12.3, "changePct": -0.4}
        ],
        "marketFundFlow": [],
        "market_activity": [{"item": "上涨", "value": 3000}],
        "latestReasoning": {"model": "m1", "bias": "bullish", "confidence": 0.72}
    })
}

async fn mount_overview(server: &MockServer, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/market/overview"))
        .respond_with(ResponseTemplate::new(200).set_body_json(overview_body()))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn drain(events: &mut mpsc::UnboundedReceiver<ScreenEvent>) -> Vec<ScreenEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

#[tokio::test]
async fn renders_sections_with_no_data_rows() {
    let server = MockServer::start().await;
    mount_overview(&server, 1).await;

    let (_dir, prefs) = preferences();
    let mut dashboard = Dashboard::new(client(&server), prefs);
    dashboard.start().await.unwrap();

    let view = dashboard.view().snapshot().unwrap();
    assert_eq!(view.language, Language::Zh);

    let Some(SectionBody::Table { rows, .. }) =
        view.section(SectionId::MarketFundFlow).map(|s| &s.body)
    else {
        panic!("fund flow should render as a table");
    };
    assert_eq!(
        rows,
        &vec![TableRow::Empty {
            colspan: 7,
            message: "暂无数据".to_string()
        }]
    );

    let Some(SectionBody::Table { rows, .. }) =
        view.section(SectionId::RealtimeIndices).map(|s| &s.body)
    else {
        panic!("indices should render as a table");
    };
    let TableRow::Cells(cells) = &rows[0] else {
        panic!("expected a data row");
    };
    assert_eq!(cells[1].text, "上证指数");
    assert_eq!(cells[2].text, "3100.46");
    assert_eq!(cells[3].text, "-12.30");
    assert_eq!(cells[4].text, "-0.40%");
}

#[tokio::test]
async fn language_switch_never_refetches() {
    let server = MockServer::start().await;
    mount_overview(&server, 1).await;

    let (_dir, prefs) = preferences();
    let mut dashboard = Dashboard::new(client(&server), prefs);
    dashboard.start().await.unwrap();

    dashboard.switch_language(Language::En);
    let english = dashboard.view().snapshot().unwrap().clone();
    assert_eq!(english.language, Language::En);
    assert!(english.to_string().contains("Realtime Indices"));

    dashboard.switch_language(Language::Zh);
    assert!(dashboard.view().snapshot().unwrap().to_string().contains("实时指数"));

    server.verify().await;
}

#[tokio::test]
async fn streamed_text_is_shown_then_snapshot_reloaded() {
    let server = MockServer::start().await;
    mount_overview(&server, 2).await;
    Mock::given(method("POST"))
        .and(path("/market/overview/reason"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("  ABCDEF\n", "text/plain; charset=utf-8"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (tx, mut events) = mpsc::unbounded_channel();
    let (_dir, prefs) = preferences();
    let mut dashboard = Dashboard::new(client(&server), prefs)
        .with_view(ViewStateController::with_events(tx));
    dashboard.start().await.unwrap();
    drain(&mut events);

    let report = dashboard.run_reasoning(true).await.unwrap();
    assert_eq!(
        report.outcome,
        SessionOutcome::Completed {
            text: "ABCDEF".to_string()
        }
    );
    assert_eq!(report.reload, ReloadOutcome::Reloaded);

    let events = drain(&mut events);
    let appended: String = events
        .iter()
        .filter_map(|e| match e {
            ScreenEvent::StreamAppended(piece) => Some(piece.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(appended, "  ABCDEF\n");
    assert!(events.contains(&ScreenEvent::StreamReplaced("ABCDEF".to_string())));
    assert_eq!(
        events.last(),
        Some(&ScreenEvent::Containers {
            snapshot: true,
            stream: false
        })
    );

    let view = dashboard.view();
    assert_eq!(view.state(), ViewState::Idle);
    assert!(view.trigger_enabled());
    assert!(view.snapshot_visible());
}

#[tokio::test]
async fn failed_reasoning_shows_message_and_still_reloads() {
    let server = MockServer::start().await;
    mount_overview(&server, 2).await;
    Mock::given(method("POST"))
        .and(path("/market/overview/reason"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, prefs) = preferences();
    let mut dashboard = Dashboard::new(client(&server), prefs);
    dashboard.start().await.unwrap();
    let report = dashboard.run_reasoning(true).await.unwrap();

    assert!(matches!(report.outcome, SessionOutcome::Failed { .. }));
    assert_eq!(report.reload, ReloadOutcome::Reloaded);
    assert_eq!(
        dashboard.view().stream_text(),
        Locale::new(Language::Zh).text(Message::ReasoningFailed)
    );
    assert!(dashboard.view().trigger_enabled());
    assert!(dashboard.view().snapshot_visible());
    assert_eq!(dashboard.store().generation(), 2);
}

#[tokio::test]
async fn saved_language_survives_restart() {
    let server = MockServer::start().await;
    mount_overview(&server, 2).await;
    let dir = tempfile::tempdir().unwrap();
    let prefs = dir.path().join("prefs.json");

    let mut first = Dashboard::new(client(&server), FileLanguageStore::new(&prefs));
    first.start().await.unwrap();
    first.switch_language(Language::En);
    drop(first);

    let mut second = Dashboard::new(client(&server), FileLanguageStore::new(&prefs));
    second.start().await.unwrap();
    assert_eq!(second.locale().language(), Language::En);
    assert_eq!(second.preferences().load(), Some(Language::En));
    assert_eq!(second.view().snapshot().unwrap().language, Language::En);
}

#[tokio::test]
async fn backend_down_still_shows_placeholders() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/market/overview"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let (_dir, prefs) = preferences();
    let mut dashboard = Dashboard::new(client(&server), prefs)
        .with_language(Language::En);
    assert!(dashboard.start().await.is_err());

    let view = dashboard.view().snapshot().unwrap();
    assert_eq!(view.sections.len(), 10);
    assert!(matches!(
        view.section(SectionId::Reasoning).map(|s| &s.body),
        Some(SectionBody::Placeholder { .. })
    ));
    assert!(dashboard.view().snapshot_visible());
}
