//! HTTP client for the overview backend with retry logic.
//!
//! The aggregate GET has a total timeout and retries with exponential backoff.
//! The reasoning POST is never retried and has no total timeout; instead the
//! wait for headers and every chunk read are bounded by the idle timeout.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;

use crate::application::ports::{ApiError, ChunkSource, OverviewApi};
use crate::domain::overview::AggregatePayload;
use crate::infrastructure::config::{HttpSettings, RetrySettings};

const OVERVIEW_PATH: &str = "/market/overview";
const REASON_PATH: &str = "/market/overview/reason";

#[derive(Debug, Serialize)]
struct ReasonRequest {
    #[serde(rename = "runLLM")]
    run_llm: bool,
}

/// HTTP client for the overview backend.
#[derive(Debug, Clone)]
pub struct HttpOverviewClient {
    client: Client,
    base_url: String,
    request_timeout: Duration,
    idle_timeout: Duration,
    retry: RetrySettings,
}

impl HttpOverviewClient {
    /// Create a new HTTP client from settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying client cannot be built.
    pub fn new(settings: &HttpSettings) -> Result<Self, ApiError> {
        let client = Client::builder()
            .connect_timeout(settings.connect_timeout)
            .user_agent(concat!("market-overview/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            request_timeout: settings.request_timeout,
            idle_timeout: settings.stream_idle_timeout,
            retry: settings.retry.clone(),
        })
    }

    /// API root in use.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn transport_error(err: &reqwest::Error, limit: Duration) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout {
                after_secs: limit.as_secs(),
            }
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl OverviewApi for HttpOverviewClient {
    async fn fetch_overview(&self) -> Result<AggregatePayload, ApiError> {
        let url = self.url(OVERVIEW_PATH);
        let mut backoff = ExponentialBackoff::new(&self.retry);

        loop {
            let sent = self
                .client
                .get(&url)
                .header(ACCEPT, "application/json")
                .timeout(self.request_timeout)
                .send()
                .await;

            let response = match sent {
                Ok(resp) => resp,
                Err(e) => {
                    let error = Self::transport_error(&e, self.request_timeout);
                    if let Some(delay) = backoff.next_backoff() {
                        tracing::warn!(
                            error = %error,
                            delay_ms = delay.as_millis(),
                            attempt = backoff.attempt,
                            "Network error, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(exhausted(&backoff, error));
                }
            };

            let status = response.status();

            if status.is_success() {
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| Self::transport_error(&e, self.request_timeout))?;
                let value: serde_json::Value = serde_json::from_slice(&body)?;
                tracing::debug!(bytes = body.len(), "Aggregate body received");
                return Ok(AggregatePayload::from_json(&value));
            }

            let retry_after = retry_after_secs(response.headers());
            let body = response.text().await.unwrap_or_default();
            let error = ApiError::Status {
                status: status.as_u16(),
                body,
            };

            match categorize_status(status) {
                ErrorCategory::RateLimited | ErrorCategory::Retryable => {
                    if let Some(delay) = backoff.next_backoff() {
                        let delay = retry_after
                            .map_or(delay, |secs| Duration::from_secs(secs).min(self.retry.max_backoff));
                        tracing::warn!(
                            status = status.as_u16(),
                            delay_ms = delay.as_millis(),
                            attempt = backoff.attempt,
                            "Retryable status, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(exhausted(&backoff, error));
                }
                ErrorCategory::NonRetryable => return Err(error),
            }
        }
    }

    async fn open_reasoning_stream(
        &self,
        run_llm: bool,
    ) -> Result<Box<dyn ChunkSource>, ApiError> {
        let idle_secs = self.idle_timeout.as_secs();
        let request = self
            .client
            .post(self.url(REASON_PATH))
            .header(ACCEPT, "text/plain")
            .json(&ReasonRequest { run_llm });

        let response = tokio::time::timeout(self.idle_timeout, request.send())
            .await
            .map_err(|_| ApiError::Timeout {
                after_secs: idle_secs,
            })??;

        let status = response.status();
        if !status.is_success() {
            let body = tokio::time::timeout(self.idle_timeout, response.text())
                .await
                .ok()
                .and_then(Result::ok)
                .unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let charset = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(charset_from_content_type);

        tracing::debug!(
            status = status.as_u16(),
            charset = charset.as_deref().unwrap_or("unspecified"),
            "Reasoning stream opened"
        );

        Ok(Box::new(HttpChunkSource {
            response,
            charset,
            idle_timeout: self.idle_timeout,
        }))
    }
}

// =============================================================================
// Chunk Source
// =============================================================================

/// A streaming response body.
#[derive(Debug)]
pub struct HttpChunkSource {
    response: Response,
    charset: Option<String>,
    idle_timeout: Duration,
}

#[async_trait]
impl ChunkSource for HttpChunkSource {
    fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, ApiError> {
        match tokio::time::timeout(self.idle_timeout, self.response.chunk()).await {
            Ok(Ok(chunk)) => Ok(chunk.map(|bytes| bytes.to_vec())),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(ApiError::Timeout {
                after_secs: self.idle_timeout.as_secs(),
            }),
        }
    }
}

/// Charset parameter of a content type, unquoted.
fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_string())
            .filter(|v| !v.is_empty())
    })
}

fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}

fn exhausted(backoff: &ExponentialBackoff, last: ApiError) -> ApiError {
    if backoff.max_attempts <= 1 {
        return last;
    }
    tracing::warn!(error = %last, attempts = backoff.attempt, "Giving up after retries");
    ApiError::MaxRetriesExceeded {
        attempts: backoff.attempt,
    }
}

// =============================================================================
// Retry
// =============================================================================

/// Error category for determining retry behavior.
enum ErrorCategory {
    RateLimited,
    Retryable,
    NonRetryable,
}

/// Categorize HTTP status code for retry handling.
const fn categorize_status(status: StatusCode) -> ErrorCategory {
    match status.as_u16() {
        429 => ErrorCategory::RateLimited,
        408 | 500 | 502 | 503 | 504 => ErrorCategory::Retryable,
        _ => ErrorCategory::NonRetryable,
    }
}

/// Exponential backoff calculator.
struct ExponentialBackoff {
    attempt: u32,
    max_attempts: u32,
    current_backoff: Duration,
    max_backoff: Duration,
    multiplier: f64,
}

impl ExponentialBackoff {
    const fn new(config: &RetrySettings) -> Self {
        Self {
            attempt: 0,
            max_attempts: config.max_attempts,
            current_backoff: config.initial_backoff,
            max_backoff: config.max_backoff,
            multiplier: config.multiplier,
        }
    }

    /// Delay before the next attempt, or `None` once attempts are used up.
    fn next_backoff(&mut self) -> Option<Duration> {
        self.attempt += 1;
        if self.attempt >= self.max_attempts {
            return None;
        }

        let backoff = self.current_backoff;
        self.current_backoff = Duration::from_secs_f64(
            (self.current_backoff.as_secs_f64() * self.multiplier)
                .min(self.max_backoff.as_secs_f64()),
        );

        Some(backoff)
    }
}
