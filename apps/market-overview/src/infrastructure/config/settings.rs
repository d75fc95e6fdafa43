//! Client Configuration Settings
//!
//! Configuration types for the overview client, loaded from environment
//! variables. Every value has a default; only malformed values are errors.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;

use crate::application::services::AbandonedStreamPolicy;
use crate::domain::language::Language;
use crate::domain::sections::DEFAULT_HISTORY_ROWS;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api";
const DEFAULT_PREFERENCES_PATH: &str = ".market-overview/preferences.json";

/// Retry settings for the aggregate fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrySettings {
    /// Maximum attempts, including the first.
    pub max_attempts: u32,
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Backoff multiplier.
    pub multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

/// Backend connection settings.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpSettings {
    /// API root, without a trailing slash (e.g. `http://host:8000/api`).
    pub base_url: String,
    /// Total timeout for the aggregate fetch.
    pub request_timeout: Duration,
    /// TCP/TLS connect timeout for every call.
    pub connect_timeout: Duration,
    /// Longest gap allowed between two stream chunks.
    pub stream_idle_timeout: Duration,
    /// Aggregate fetch retries.
    pub retry: RetrySettings,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(5),
            stream_idle_timeout: Duration::from_secs(120),
            retry: RetrySettings::default(),
        }
    }
}

/// Dashboard behaviour settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardSettings {
    /// Language to use when no preference is saved.
    pub language: Option<Language>,
    /// Where the language preference is kept.
    pub preferences_path: PathBuf,
    /// Reload policy for cancelled sessions.
    pub abandoned_stream: AbandonedStreamPolicy,
    /// Ask the backend to run the LLM step.
    pub run_llm: bool,
    /// History rows rendered per index code.
    pub history_rows: usize,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            language: None,
            preferences_path: PathBuf::from(DEFAULT_PREFERENCES_PATH),
            abandoned_stream: AbandonedStreamPolicy::default(),
            run_llm: true,
            history_rows: DEFAULT_HISTORY_ROWS,
        }
    }
}

/// Complete client configuration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DashboardConfig {
    /// Backend connection settings.
    pub http: HttpSettings,
    /// Dashboard behaviour.
    pub dashboard: DashboardSettings,
    /// Prometheus metrics port (0 = disabled).
    pub metrics_port: u16,
}

impl DashboardConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to a value that cannot be used.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to a value that cannot be used.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let env = Env(&lookup);

        let base_url = match env.get("MARKET_OVERVIEW_BASE_URL") {
            Some(raw) => normalize_base_url("MARKET_OVERVIEW_BASE_URL", &raw)?,
            None => defaults.http.base_url,
        };

        let retry = RetrySettings {
            max_attempts: env
                .u32("MARKET_OVERVIEW_RETRY_MAX_ATTEMPTS", defaults.http.retry.max_attempts)
                .max(1),
            initial_backoff: env.duration_millis(
                "MARKET_OVERVIEW_RETRY_INITIAL_BACKOFF_MS",
                defaults.http.retry.initial_backoff,
            ),
            max_backoff: env.duration_secs(
                "MARKET_OVERVIEW_RETRY_MAX_BACKOFF_SECS",
                defaults.http.retry.max_backoff,
            ),
            multiplier: env.f64("MARKET_OVERVIEW_RETRY_MULTIPLIER", defaults.http.retry.multiplier),
        };

        let http = HttpSettings {
            base_url,
            request_timeout: env.duration_secs(
                "MARKET_OVERVIEW_REQUEST_TIMEOUT_SECS",
                defaults.http.request_timeout,
            ),
            connect_timeout: env.duration_secs(
                "MARKET_OVERVIEW_CONNECT_TIMEOUT_SECS",
                defaults.http.connect_timeout,
            ),
            stream_idle_timeout: env.duration_secs(
                "MARKET_OVERVIEW_STREAM_IDLE_TIMEOUT_SECS",
                defaults.http.stream_idle_timeout,
            ),
            retry,
        };

        let language = match env.get("MARKET_OVERVIEW_LANGUAGE") {
            Some(raw) => Some(Language::parse(&raw).ok_or_else(|| ConfigError::InvalidValue {
                key: "MARKET_OVERVIEW_LANGUAGE".to_string(),
                value: raw.clone(),
                reason: "expected en or zh".to_string(),
            })?),
            None => defaults.dashboard.language,
        };

        let abandoned_stream = match env.get("MARKET_OVERVIEW_ABANDONED_STREAM") {
            Some(raw) => raw.parse::<AbandonedStreamPolicy>().map_err(|reason| ConfigError::InvalidValue {
                key: "MARKET_OVERVIEW_ABANDONED_STREAM".to_string(),
                value: raw.clone(),
                reason,
            })?,
            None => defaults.dashboard.abandoned_stream,
        };

        let dashboard = DashboardSettings {
            language,
            preferences_path: env
                .get("MARKET_OVERVIEW_PREFERENCES_PATH")
                .map_or(defaults.dashboard.preferences_path, PathBuf::from),
            abandoned_stream,
            run_llm: env.bool("MARKET_OVERVIEW_RUN_LLM", defaults.dashboard.run_llm),
            history_rows: env.usize("MARKET_OVERVIEW_HISTORY_ROWS", defaults.dashboard.history_rows),
        };

        Ok(Self {
            http,
            dashboard,
            metrics_port: env.u16("MARKET_OVERVIEW_METRICS_PORT", defaults.metrics_port),
        })
    }

    /// Replace the base URL (e.g. from a command-line flag).
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not an absolute http(s) URL.
    pub fn with_base_url(mut self, raw: &str) -> Result<Self, ConfigError> {
        self.http.base_url = normalize_base_url("--base-url", raw)?;
        Ok(self)
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Variable set to an unusable value.
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        /// Variable or flag name.
        key: String,
        /// Offending value.
        value: String,
        /// What was expected.
        reason: String,
    },
}

fn normalize_base_url(key: &str, raw: &str) -> Result<String, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
        reason,
    };

    let trimmed = raw.trim().trim_end_matches('/');
    let url = Url::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("expected an http or https URL".to_string()));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(trimmed.to_string())
}

// =============================================================================
// Variable Parsing
// =============================================================================

/// Typed view over a variable source. Blank values count as unset; values
/// that fail to parse fall back to the default.
struct Env<'a, F>(&'a F);

impl<F> Env<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        self.get(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn u16(&self, key: &str, default: u16) -> u16 {
        self.parse(key, default)
    }

    fn u32(&self, key: &str, default: u32) -> u32 {
        self.parse(key, default)
    }

    fn usize(&self, key: &str, default: usize) -> usize {
        self.parse(key, default)
    }

    fn f64(&self, key: &str, default: f64) -> f64 {
        self.parse(key, default)
    }

    fn bool(&self, key: &str, default: bool) -> bool {
        match self.get(key).map(|v| v.to_lowercase()).as_deref() {
            Some("1" | "true" | "yes" | "on") => true,
            Some("0" | "false" | "no" | "off") => false,
            _ => default,
        }
    }

    fn duration_secs(&self, key: &str, default: Duration) -> Duration {
        self.get(key)
            .and_then(|v| v.parse::<u64>().ok())
            .map_or(default, Duration::from_secs)
    }

    fn duration_millis(&self, key: &str, default: Duration) -> Duration {
        self.get(key)
            .and_then(|v| v.parse::<u64>().ok())
            .map_or(default, Duration::from_millis)
    }
}
