//! Application Services
//!
//! Use cases of the overview client. The [`Dashboard`] coordinator owns all
//! mutable state and drives the others.

mod dashboard;
mod loader;
mod renderer;
mod snapshot_store;
mod stream_consumer;

pub use dashboard::{
    AbandonedStreamPolicy, Dashboard, DashboardError, ReloadOutcome, SessionReport,
};
pub use loader::{AggregateLoader, LoadError};
pub use renderer::SnapshotRenderer;
pub use snapshot_store::SnapshotStore;
pub use stream_consumer::{SessionOutcome, StreamConsumer};
