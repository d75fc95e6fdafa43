//! Dashboard Coordinator
//!
//! The single owner of the overview's mutable state: backend port, snapshot
//! store, renderer, active locale, language preference, and the view-state
//! controller. Every user action goes through here, so no state lives in
//! free-floating globals.
//!
//! # Reasoning Session Lifecycle
//!
//! 1. `begin_streaming` (fails if a session is already active)
//! 2. Stream consumer runs under a [`StreamingGuard`]
//! 3. Guard released: trigger re-enabled, view back to `Idle`
//! 4. Aggregate reload (per [`AbandonedStreamPolicy`] when cancelled); the
//!    snapshot container is revealed whether or not the reload succeeds
//!
//! Step 3 always completes before step 4 starts.

use std::str::FromStr;

use tokio_util::sync::CancellationToken;

use super::loader::{AggregateLoader, LoadError};
use super::renderer::SnapshotRenderer;
use super::snapshot_store::SnapshotStore;
use super::stream_consumer::{SessionOutcome, StreamConsumer};
use crate::application::ports::{LanguageStore, OverviewApi};
use crate::domain::language::{Language, Locale};
use crate::domain::view_state::{StreamingGuard, ViewError, ViewStateController};
use crate::infrastructure::metrics;

/// Whether a cancelled session still reloads the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AbandonedStreamPolicy {
    /// Reload as after any other session.
    #[default]
    Reload,
    /// Reveal the current snapshot without reloading.
    SkipReload,
}

impl FromStr for AbandonedStreamPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reload" => Ok(Self::Reload),
            "skip" | "skip_reload" | "skip-reload" => Ok(Self::SkipReload),
            other => Err(format!("unknown abandoned-stream policy: {other}")),
        }
    }
}

/// What happened to the post-session reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// The aggregate was reloaded and rendered.
    Reloaded,
    /// The reload failed; the previous snapshot is shown.
    Failed(String),
    /// Skipped by policy after a cancellation.
    Skipped,
}

/// Result of one reasoning session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    /// How the stream ended.
    pub outcome: SessionOutcome,
    /// What the follow-up reload did.
    pub reload: ReloadOutcome,
}

/// Coordinator errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DashboardError {
    /// The view refused the transition.
    #[error(transparent)]
    View(#[from] ViewError),
}

/// The market overview dashboard.
#[derive(Debug)]
pub struct Dashboard<A, L> {
    api: A,
    preferences: L,
    store: SnapshotStore,
    renderer: SnapshotRenderer,
    locale: Locale,
    view: ViewStateController,
    policy: AbandonedStreamPolicy,
}

impl<A, L> Dashboard<A, L>
where
    A: OverviewApi,
    L: LanguageStore,
{
    /// Create a dashboard with default sections, Chinese locale, and a silent
    /// view controller.
    pub fn new(api: A, preferences: L) -> Self {
        Self {
            api,
            preferences,
            store: SnapshotStore::new(),
            renderer: SnapshotRenderer::default(),
            locale: Locale::default(),
            view: ViewStateController::new(),
            policy: AbandonedStreamPolicy::default(),
        }
    }

    /// Use a specific renderer.
    #[must_use]
    pub fn with_renderer(mut self, renderer: SnapshotRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    /// Use a specific view controller (e.g., one publishing screen events).
    #[must_use]
    pub fn with_view(mut self, view: ViewStateController) -> Self {
        self.view = view;
        self
    }

    /// Initial language, used when no preference is saved.
    #[must_use]
    pub const fn with_language(mut self, language: Language) -> Self {
        self.locale = Locale::new(language);
        self
    }

    /// Policy for cancelled sessions.
    #[must_use]
    pub const fn with_policy(mut self, policy: AbandonedStreamPolicy) -> Self {
        self.policy = policy;
        self
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Screen state.
    pub const fn view(&self) -> &ViewStateController {
        &self.view
    }

    /// Loaded data.
    pub const fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Active locale.
    pub const fn locale(&self) -> &Locale {
        &self.locale
    }

    /// Language preference store.
    pub const fn preferences(&self) -> &L {
        &self.preferences
    }

    /// Policy for cancelled sessions.
    pub const fn policy(&self) -> AbandonedStreamPolicy {
        self.policy
    }

    // -------------------------------------------------------------------------
    // Operations
    // -------------------------------------------------------------------------

    /// Apply the saved language, then run the initial load.
    ///
    /// # Errors
    ///
    /// Returns the load error; the view still shows a placeholder snapshot.
    pub async fn start(&mut self) -> Result<(), LoadError> {
        if let Some(language) = self.preferences.load() {
            tracing::debug!(language = %language, "Using saved language");
            self.locale = Locale::new(language);
        }
        self.load().await
    }

    /// Fetch the aggregate and show it.
    ///
    /// On failure the previous snapshot stays (or, before the first success,
    /// an all-placeholder view is rendered) and the snapshot container is
    /// revealed so the screen is never blank.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] when the fetch fails.
    pub async fn load(&mut self) -> Result<(), LoadError> {
        match AggregateLoader::load(&self.api, &mut self.store, &self.renderer, &self.locale).await
        {
            Ok(rendered) => {
                self.view.present_snapshot(rendered);
                Ok(())
            }
            Err(e) => {
                if self.view.snapshot().is_none() {
                    let rendered = self.renderer.render(&self.store, &self.locale);
                    self.view.present_snapshot(rendered);
                } else {
                    self.view.reveal_snapshot();
                }
                Err(e)
            }
        }
    }

    /// Switch the display language and re-render from the store.
    ///
    /// Never touches the network. A failed preference save is logged.
    pub fn switch_language(&mut self, language: Language) {
        self.locale = Locale::new(language);
        if let Err(e) = self.preferences.save(language) {
            tracing::warn!(error = %e, language = %language, "Failed to save language preference");
        }
        metrics::record_language_switch(language.code());

        let rendered = self.renderer.render(&self.store, &self.locale);
        self.view.present_snapshot(rendered);
        tracing::debug!(language = %language, generation = self.store.generation(), "Re-rendered");
    }

    /// Run a reasoning session that cannot be cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::View`] if a session is already active.
    pub async fn run_reasoning(&mut self, run_llm: bool) -> Result<SessionReport, DashboardError> {
        self.run_reasoning_with_cancel(run_llm, CancellationToken::new())
            .await
    }

    /// Run a reasoning session, then reload the aggregate.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::View`] if a session is already active.
    pub async fn run_reasoning_with_cancel(
        &mut self,
        run_llm: bool,
        cancel: CancellationToken,
    ) -> Result<SessionReport, DashboardError> {
        self.view.begin_streaming()?;
        tracing::info!(run_llm, "Reasoning session started");

        let outcome = {
            let mut guard = StreamingGuard::new(&mut self.view);
            let outcome =
                StreamConsumer::run(&self.api, run_llm, &mut guard, &self.locale, &cancel).await;
            guard.release();
            outcome
        };

        let reload = if outcome == SessionOutcome::Cancelled
            && self.policy == AbandonedStreamPolicy::SkipReload
        {
            self.view.reveal_snapshot();
            ReloadOutcome::Skipped
        } else {
            match self.load().await {
                Ok(()) => ReloadOutcome::Reloaded,
                Err(e) => {
                    tracing::warn!(error = %e, "Post-session reload failed");
                    ReloadOutcome::Failed(e.to_string())
                }
            }
        };

        tracing::info!(
            outcome = outcome.label(),
            reload = ?reload,
            "Reasoning session finished"
        );
        Ok(SessionReport { outcome, reload })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::application::ports::{
        ApiError, ChunkSource, MemoryLanguageStore, MockOverviewApi, ScriptedChunkSource,
    };
    use crate::domain::overview::AggregatePayload;
    use crate::domain::view_state::ViewState;

    fn payload() -> AggregatePayload {
        AggregatePayload::from_json(&json!({
            "marketActivity": [{"item": "up", "value": 3000}],
            "latestReasoning": {"model": "m1"}
        }))
    }

    fn boxed(source: ScriptedChunkSource) -> Result<Box<dyn ChunkSource>, ApiError> {
        Ok(Box::new(source))
    }

    fn assert_settled<A: OverviewApi, L: LanguageStore>(dashboard: &Dashboard<A, L>) {
        let view = dashboard.view();
        assert_eq!(view.state(), ViewState::Idle);
        assert!(view.trigger_enabled());
        assert!(view.snapshot_visible());
        assert!(!view.stream_visible());
    }

    #[test]
    fn policy_parses() {
        assert_eq!(
            "reload".parse::<AbandonedStreamPolicy>(),
            Ok(AbandonedStreamPolicy::Reload)
        );
        assert_eq!(
            " Skip ".parse::<AbandonedStreamPolicy>(),
            Ok(AbandonedStreamPolicy::SkipReload)
        );
        assert!("maybe".parse::<AbandonedStreamPolicy>().is_err());
    }

    #[tokio::test]
    async fn start_applies_saved_language() {
        let mut api = MockOverviewApi::new();
        api.expect_fetch_overview().times(1).returning(|| Ok(payload()));

        let mut dashboard = Dashboard::new(api, MemoryLanguageStore::new(Some(Language::En)));
        dashboard.start().await.unwrap();

        assert_eq!(dashboard.locale().language(), Language::En);
        assert_eq!(dashboard.view().snapshot().unwrap().language, Language::En);
        assert_settled(&dashboard);
    }

    #[tokio::test]
    async fn language_switch_does_not_fetch() {
        let mut api = MockOverviewApi::new();
        api.expect_fetch_overview().times(1).returning(|| Ok(payload()));

        let mut dashboard = Dashboard::new(api, MemoryLanguageStore::default());
        dashboard.start().await.unwrap();
        let before = dashboard.view().snapshot().cloned().unwrap();

        dashboard.switch_language(Language::En);
        dashboard.switch_language(Language::Zh);

        assert_eq!(dashboard.preferences().saves(), 2);
        assert_eq!(dashboard.preferences().load(), Some(Language::Zh));
        assert_eq!(dashboard.view().snapshot().unwrap(), &before);
        assert_eq!(dashboard.store().generation(), 1);
    }

    #[tokio::test]
    async fn failed_initial_load_renders_placeholders() {
        let mut api = MockOverviewApi::new();
        api.expect_fetch_overview()
            .returning(|| Err(ApiError::Network("refused".to_string())));

        let mut dashboard = Dashboard::new(api, MemoryLanguageStore::default());
        assert!(dashboard.start().await.is_err());

        let snapshot = dashboard.view().snapshot().unwrap();
        assert_eq!(snapshot.sections.len(), 10);
        assert_settled(&dashboard);
    }

    #[tokio::test]
    async fn completed_session_reloads() {
        let mut api = MockOverviewApi::new();
        api.expect_fetch_overview().times(2).returning(|| Ok(payload()));
        api.expect_open_reasoning_stream()
            .times(1)
            .returning(|_| boxed(ScriptedChunkSource::new(["AB", "CD"])));

        let mut dashboard = Dashboard::new(api, MemoryLanguageStore::default());
        dashboard.start().await.unwrap();
        let report = dashboard.run_reasoning(true).await.unwrap();

        assert_eq!(
            report,
            SessionReport {
                outcome: SessionOutcome::Completed {
                    text: "ABCD".to_string()
                },
                reload: ReloadOutcome::Reloaded,
            }
        );
        assert_eq!(dashboard.store().generation(), 2);
        assert_settled(&dashboard);
    }

    #[tokio::test]
    async fn http_error_still_reloads_and_reenables_trigger() {
        let mut api = MockOverviewApi::new();
        api.expect_fetch_overview().times(2).returning(|| Ok(payload()));
        api.expect_open_reasoning_stream().returning(|_| {
            Err(ApiError::Status {
                status: 500,
                body: String::new(),
            })
        });

        let mut dashboard =
            Dashboard::new(api, MemoryLanguageStore::default()).with_language(Language::En);
        dashboard.start().await.unwrap();
        let report = dashboard.run_reasoning(true).await.unwrap();

        assert!(matches!(report.outcome, SessionOutcome::Failed { .. }));
        assert_eq!(report.reload, ReloadOutcome::Reloaded);
        assert_eq!(
            dashboard.view().stream_text(),
            "Reasoning failed, please try again later."
        );
        assert_settled(&dashboard);
    }

    #[tokio::test]
    async fn reload_failure_is_isolated() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let mut api = MockOverviewApi::new();
        api.expect_fetch_overview().times(2).returning(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(payload())
            } else {
                Err(ApiError::MaxRetriesExceeded { attempts: 3 })
            }
        });
        api.expect_open_reasoning_stream()
            .returning(|_| boxed(ScriptedChunkSource::new(["done"])));

        let mut dashboard = Dashboard::new(api, MemoryLanguageStore::default());
        dashboard.start().await.unwrap();
        let report = dashboard.run_reasoning(false).await.unwrap();

        assert!(matches!(report.outcome, SessionOutcome::Completed { .. }));
        assert!(matches!(report.reload, ReloadOutcome::Failed(_)));
        assert_eq!(dashboard.store().generation(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_settled(&dashboard);
    }

    #[tokio::test]
    async fn cancelled_session_follows_skip_policy() {
        let mut api = MockOverviewApi::new();
        api.expect_fetch_overview().times(1).returning(|| Ok(payload()));
        api.expect_open_reasoning_stream()
            .returning(|_| boxed(ScriptedChunkSource::new(["AB"]).stall()));

        let mut dashboard = Dashboard::new(api, MemoryLanguageStore::default())
            .with_policy(AbandonedStreamPolicy::SkipReload);
        dashboard.start().await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = dashboard
            .run_reasoning_with_cancel(true, cancel)
            .await
            .unwrap();

        assert_eq!(report.outcome, SessionOutcome::Cancelled);
        assert_eq!(report.reload, ReloadOutcome::Skipped);
        assert_settled(&dashboard);
    }

    #[tokio::test]
    async fn cancelled_session_reloads_by_default() {
        let mut api = MockOverviewApi::new();
        api.expect_fetch_overview().times(2).returning(|| Ok(payload()));
        api.expect_open_reasoning_stream()
            .returning(|_| boxed(ScriptedChunkSource::new(["AB"]).stall()));

        let mut dashboard = Dashboard::new(api, MemoryLanguageStore::default());
        dashboard.start().await.unwrap();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });
        let report = dashboard
            .run_reasoning_with_cancel(true, cancel)
            .await
            .unwrap();

        assert_eq!(report.outcome, SessionOutcome::Cancelled);
        assert_eq!(report.reload, ReloadOutcome::Reloaded);
        assert_settled(&dashboard);
    }

    #[tokio::test]
    async fn dropped_session_restores_idle_view() {
        let mut api = MockOverviewApi::new();
        api.expect_fetch_overview().times(1).returning(|| Ok(payload()));
        api.expect_open_reasoning_stream()
            .returning(|_| boxed(ScriptedChunkSource::new(["AB"]).stall()));

        let mut dashboard = Dashboard::new(api, MemoryLanguageStore::default());
        dashboard.start().await.unwrap();

        let timed_out =
            tokio::time::timeout(Duration::from_millis(20), dashboard.run_reasoning(true)).await;
        assert!(timed_out.is_err());
        assert_settled(&dashboard);
    }
}
