//! Snapshot Store
//!
//! The last successfully loaded aggregate and reasoning snapshot. Re-rendered
//! on every language switch without refetching. The aggregate loader is the
//! only writer; replacement is wholesale, never a partial merge.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::overview::{AggregatePayload, ReasoningSnapshot};

/// Last loaded state.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    overview: Option<Arc<AggregatePayload>>,
    reasoning: Option<ReasoningSnapshot>,
    loaded_at: Option<DateTime<Utc>>,
    generation: u64,
}

impl SnapshotStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current aggregate; `latest_reasoning` has been moved to
    /// [`Self::reasoning`].
    #[must_use]
    pub fn overview(&self) -> Option<&AggregatePayload> {
        self.overview.as_deref()
    }

    /// Current reasoning snapshot.
    #[must_use]
    pub const fn reasoning(&self) -> Option<&ReasoningSnapshot> {
        self.reasoning.as_ref()
    }

    /// When the current aggregate was stored.
    #[must_use]
    pub const fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }

    /// Number of successful loads so far.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether nothing has been loaded yet.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.overview.is_none()
    }

    /// Replace the whole store with a freshly loaded aggregate.
    pub(crate) fn replace(&mut self, mut payload: AggregatePayload, at: DateTime<Utc>) -> u64 {
        self.reasoning = payload.latest_reasoning.take();
        self.overview = Some(Arc::new(payload));
        self.loaded_at = Some(at);
        self.generation += 1;
        self.generation
    }
}
