//! Infrastructure Layer
//!
//! Adapters and ambient concerns:
//! - **config**: environment configuration
//! - **http**: `reqwest` backend adapter
//! - **preferences**: file-backed language preference
//! - **telemetry**: tracing subscriber and optional OTLP export
//! - **metrics**: Prometheus exporter and recording helpers

pub mod config;
pub mod http;
pub mod metrics;
pub mod preferences;
pub mod telemetry;
