//! Aggregate Loader
//!
//! One-shot fetch of the aggregate payload. On success the snapshot store is
//! replaced and re-rendered; on failure the store keeps whatever it had.

use std::time::Instant;

use chrono::Utc;

use super::renderer::SnapshotRenderer;
use super::snapshot_store::SnapshotStore;
use crate::application::ports::{ApiError, OverviewApi};
use crate::domain::language::Locale;
use crate::domain::rendered::RenderedView;
use crate::infrastructure::metrics;

/// Aggregate load error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// The backend call failed.
    #[error("aggregate load failed: {0}")]
    Fetch(#[from] ApiError),
}

/// Loads the aggregate into the snapshot store.
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregateLoader;

impl AggregateLoader {
    /// Fetch, replace the store, and render it.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Fetch`] when the backend call fails; the store is
    /// left untouched.
    pub async fn load<A>(
        api: &A,
        store: &mut SnapshotStore,
        renderer: &SnapshotRenderer,
        locale: &Locale,
    ) -> Result<RenderedView, LoadError>
    where
        A: OverviewApi + ?Sized,
    {
        let started = Instant::now();

        match api.fetch_overview().await {
            Ok(payload) => {
                let generation = store.replace(payload, Utc::now());
                metrics::record_load("ok", started.elapsed().as_secs_f64());
                tracing::info!(
                    generation,
                    elapsed_ms = started.elapsed().as_millis(),
                    "Aggregate loaded"
                );
                Ok(renderer.render(store, locale))
            }
            Err(e) => {
                metrics::record_load(e.kind(), started.elapsed().as_secs_f64());
                tracing::warn!(
                    error = %e,
                    generation = store.generation(),
                    "Aggregate load failed; keeping previous snapshot"
                );
                Err(LoadError::Fetch(e))
            }
        }
    }
}
