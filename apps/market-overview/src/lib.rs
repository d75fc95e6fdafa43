#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Market Overview - Headless Dashboard Client
//!
//! Fetches the aggregated market overview from the backend, renders it as
//! localized sections, and streams the backend's reasoning text while a
//! session is in flight.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Pure data model and screen rules
//!   - `fields`: snake/camel field resolution over loose JSON records
//!   - `overview`: aggregate payload and reasoning snapshot
//!   - `sections` / `rendered` / `format`: section layout and cell formatting
//!   - `language`: the bilingual dictionary
//!   - `stream_session` / `view_state`: stream accumulation and screen state
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: backend and language-preference interfaces
//!   - `services`: loader, renderer, stream consumer, dashboard coordinator
//!
//! - **Infrastructure**: Adapters and ambient concerns
//!   - `http`: `reqwest` backend client with retry and chunked reads
//!   - `config`: environment configuration
//!   - `preferences`: file-backed language preference
//!   - `telemetry` / `metrics`: tracing, OTLP, Prometheus
//!
//! # Data Flow
//!
//! ```text
//! GET /market/overview ──► SnapshotStore ──► SnapshotRenderer ──► RenderedView
//!                                                                   │
//! POST /market/overview/reason ──► StreamConsumer ──► ViewStateController ──► ScreenEvent
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Payload model, formatting, and screen state with no I/O.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::language::{Language, Locale};
pub use domain::rendered::{RenderedView, SectionBody, SectionView, TableRow};
pub use domain::sections::{SectionId, SectionRegistry};
pub use domain::view_state::{ScreenEvent, ViewState, ViewStateController};

// Application
pub use application::ports::{ApiError, LanguageStore, OverviewApi};
pub use application::services::{
    AbandonedStreamPolicy, Dashboard, DashboardError, ReloadOutcome, SessionOutcome,
    SessionReport, SnapshotRenderer,
};

// Infrastructure config
pub use infrastructure::config::{
    ConfigError, DashboardConfig, DashboardSettings, HttpSettings, RetrySettings,
};

// Adapters
pub use infrastructure::http::{HttpChunkSource, HttpOverviewClient};
pub use infrastructure::preferences::FileLanguageStore;

// Metrics
pub use infrastructure::metrics::{MetricsConfig, MetricsError, init_metrics};

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
