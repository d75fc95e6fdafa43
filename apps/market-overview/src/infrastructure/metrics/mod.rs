//! Prometheus metrics for the market overview client.
//!
//! Aggregate loads, reasoning sessions, and stream throughput. Recording is a
//! no-op until [`init_metrics`] installs the exporter.
//!
//! # Example
//!
//! ```ignore
//! use market_overview::infrastructure::metrics::{init_metrics, MetricsConfig};
//!
//! let config = MetricsConfig::with_port(9464);
//! init_metrics(&config)?;
//! ```

use std::net::{Ipv4Addr, SocketAddr};

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Configuration for the metrics exporter.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Address to bind the metrics HTTP listener.
    pub listen_addr: SocketAddr,
    /// Histogram buckets for durations (in seconds).
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 9464)),
            // 10ms to 5 minutes; a reasoning stream with the LLM can run long.
            duration_buckets: vec![
                0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0,
            ],
        }
    }
}

impl MetricsConfig {
    /// Listen on localhost at `port`.
    #[must_use]
    pub fn with_port(port: u16) -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, port)),
            ..Default::default()
        }
    }
}

/// Initialize the Prometheus metrics exporter.
///
/// This starts an HTTP server that exposes metrics at `/metrics`.
///
/// # Errors
///
/// Returns an error if the exporter fails to start (e.g., port already in use).
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(config.listen_addr)
        .set_buckets(&config.duration_buckets)
        .map_err(|e| MetricsError::Configuration(e.to_string()))?
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    tracing::info!(
        addr = %config.listen_addr,
        "Prometheus metrics exporter started"
    );

    Ok(())
}

/// Error type for metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to configure metrics exporter.
    #[error("metrics configuration error: {0}")]
    Configuration(String),
    /// Failed to install metrics exporter.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

// ============================================================================
// Aggregate Metrics
// ============================================================================

/// Record an aggregate load.
///
/// # Arguments
///
/// * `outcome` - `"ok"` or the error kind (e.g., `"status"`, `"timeout"`)
/// * `duration_seconds` - Fetch time including retries
pub fn record_load(outcome: &str, duration_seconds: f64) {
    counter!("overview_loads_total", "outcome" => outcome.to_string()).increment(1);
    histogram!("overview_load_duration_seconds").record(duration_seconds);
}

/// Record a language switch.
pub fn record_language_switch(language: &str) {
    counter!("overview_language_switches_total", "language" => language.to_string()).increment(1);
}

// ============================================================================
// Reasoning Stream Metrics
// ============================================================================

/// Record one received stream chunk.
pub fn record_stream_chunk(bytes: usize) {
    counter!("reasoning_stream_chunks_total").increment(1);
    counter!("reasoning_stream_bytes_total").increment(bytes as u64);
}

/// Record the end of a reasoning session.
///
/// # Arguments
///
/// * `outcome` - `"completed"`, `"failed"`, or `"cancelled"`
/// * `duration_seconds` - Time from open to terminal state
pub fn record_session(outcome: &str, duration_seconds: f64) {
    counter!("reasoning_sessions_total", "outcome" => outcome.to_string()).increment(1);
    histogram!("reasoning_session_duration_seconds", "outcome" => outcome.to_string())
        .record(duration_seconds);
}
