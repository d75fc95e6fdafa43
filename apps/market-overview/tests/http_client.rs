#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Integration tests for the HTTP backend adapter against a mock server.

use std::time::Duration;

use market_overview::application::ports::ChunkSource;
use market_overview::{ApiError, HttpOverviewClient, HttpSettings, OverviewApi, RetrySettings, SectionId};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(server: &MockServer, max_attempts: u32) -> HttpSettings {
    HttpSettings {
        base_url: format!("{}/", server.uri()),
        request_timeout: Duration::from_secs(2),
        stream_idle_timeout: Duration::from_secs(2),
        retry: RetrySettings {
            max_attempts,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(50),
            multiplier: 2.0,
        },
        ..HttpSettings::default()
    }
}

async fn drain(mut source: Box<dyn ChunkSource>) -> Vec<u8> {
    let mut body = Vec::new();
    while let Some(chunk) = source.next_chunk().await.unwrap() {
        body.extend_from_slice(&chunk);
    }
    body
}

#[tokio::test]
async fn fetch_overview_parses_sections() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/market/overview"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "realtimeIndices": [{"code": "000001", "name": "SSE", "price": 3100.456}],
            "market_activity": [{"item": "up", "value": 3000}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpOverviewClient::new(&settings(&server, 3)).unwrap();
    assert_eq!(client.base_url(), server.uri());

    let payload = client.fetch_overview().await.unwrap();
    assert_eq!(payload.rows(SectionId::RealtimeIndices).unwrap().len(), 1);
    assert_eq!(payload.rows(SectionId::MarketActivity).unwrap().len(), 1);
    assert!(payload.rows(SectionId::MarketFundFlow).is_none());
}

#[tokio::test]
async fn fetch_overview_retries_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/market/overview"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/market/overview"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"marketActivity": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpOverviewClient::new(&settings(&server, 3)).unwrap();
    let payload = client.fetch_overview().await.unwrap();
    assert_eq!(payload.rows(SectionId::MarketActivity).map(<[_]>::len), Some(0));
}

#[tokio::test]
async fn fetch_overview_gives_up_after_max_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/market/overview"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let client = HttpOverviewClient::new(&settings(&server, 3)).unwrap();
    assert_eq!(
        client.fetch_overview().await.unwrap_err(),
        ApiError::MaxRetriesExceeded { attempts: 3 }
    );
}

#[tokio::test]
async fn fetch_overview_does_not_retry_client_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/market/overview"))
        .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpOverviewClient::new(&settings(&server, 3)).unwrap();
    assert_eq!(
        client.fetch_overview().await.unwrap_err(),
        ApiError::Status {
            status: 404,
            body: "missing".to_string()
        }
    );
}

#[tokio::test]
async fn fetch_overview_rejects_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/market/overview"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let client = HttpOverviewClient::new(&settings(&server, 1)).unwrap();
    assert!(matches!(
        client.fetch_overview().await,
        Err(ApiError::Decode(_))
    ));
}

#[tokio::test]
async fn fetch_overview_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/market/overview"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let mut settings = settings(&server, 1);
    settings.request_timeout = Duration::from_millis(100);
    let client = HttpOverviewClient::new(&settings).unwrap();

    assert!(matches!(
        client.fetch_overview().await,
        Err(ApiError::Timeout { .. })
    ));
}

#[tokio::test]
async fn reasoning_stream_posts_flag_and_reads_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/market/overview/reason"))
        .and(body_json(json!({"runLLM": false})))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("偏多 ABCDEF", "text/plain; charset=utf-8"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpOverviewClient::new(&settings(&server, 3)).unwrap();
    let source = client.open_reasoning_stream(false).await.unwrap();
    assert_eq!(source.charset(), Some("utf-8"));

    let body = drain(source).await;
    assert_eq!(String::from_utf8(body).unwrap(), "偏多 ABCDEF");
}

#[tokio::test]
async fn reasoning_stream_reports_status_before_reading() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/market/overview/reason"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model offline"))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpOverviewClient::new(&settings(&server, 3)).unwrap();
    let Err(error) = client.open_reasoning_stream(true).await else {
        panic!("expected a status error");
    };
    assert_eq!(
        error,
        ApiError::Status {
            status: 500,
            body: "model offline".to_string()
        }
    );
}

#[tokio::test]
async fn reasoning_stream_without_charset() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/market/overview/reason"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("ok", "text/plain"))
        .mount(&server)
        .await;

    let client = HttpOverviewClient::new(&settings(&server, 3)).unwrap();
    let source = client.open_reasoning_stream(true).await.unwrap();
    assert_eq!(source.charset(), None);
    assert_eq!(drain(source).await, b"ok");
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() {
    // Reserve a free port, then release it so nothing is listening there.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let client = HttpOverviewClient::new(&HttpSettings {
        base_url: format!("http://127.0.0.1:{port}"),
        retry: RetrySettings {
            max_attempts: 1,
            ..RetrySettings::default()
        },
        ..HttpSettings::default()
    })
    .unwrap();
    assert!(matches!(
        client.fetch_overview().await,
        Err(ApiError::Network(_))
    ));
}
