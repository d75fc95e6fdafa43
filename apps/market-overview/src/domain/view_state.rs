//! View-State Controller
//!
//! Coordinates the two mutually exclusive containers of the overview screen
//! (the rendered snapshot and the live stream text) and the trigger control
//! that starts a reasoning session.
//!
//! # State Machine
//!
//! ```text
//!            begin_streaming (trigger enabled)
//!   Idle ─────────────────────────────────────► Streaming
//!    ▲                                              │
//!    └──────────────── finish_streaming ◄───────────┘
//!                  (always, on any outcome)
//! ```
//!
//! Exactly one container is visible at any time. Entering `Streaming` hides
//! the snapshot and shows a cleared stream container; leaving it re-enables
//! the trigger but keeps the stream container up until the caller reveals
//! the snapshot (after the post-stream reload, or immediately if that reload
//! fails).
//!
//! Every change is published as a [`ScreenEvent`] so a terminal printer or a
//! test can observe partial stream output as it arrives.

use std::ops::{Deref, DerefMut};

use tokio::sync::mpsc;

use super::rendered::RenderedView;

/// Renderable state of the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewState {
    /// Snapshot view; the trigger is usable.
    #[default]
    Idle,
    /// A reasoning session is in flight.
    Streaming,
}

/// A change to the screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenEvent {
    /// View state changed.
    State(ViewState),
    /// Trigger control enabled or disabled.
    Trigger {
        /// Whether the trigger is usable.
        enabled: bool,
    },
    /// Container visibility changed.
    Containers {
        /// Snapshot container shown.
        snapshot: bool,
        /// Stream container shown.
        stream: bool,
    },
    /// Stream container emptied.
    StreamCleared,
    /// Text appended to the stream container.
    StreamAppended(String),
    /// Stream container text replaced.
    StreamReplaced(String),
    /// Snapshot container content replaced.
    SnapshotRendered(Box<RenderedView>),
}

/// Transition errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewError {
    /// A session is already in flight.
    #[error("a reasoning session is already active")]
    SessionActive,
}

/// Owner of the screen state.
#[derive(Debug)]
pub struct ViewStateController {
    state: ViewState,
    trigger_enabled: bool,
    snapshot_visible: bool,
    stream_visible: bool,
    stream_text: String,
    snapshot: Option<RenderedView>,
    events: Option<mpsc::UnboundedSender<ScreenEvent>>,
}

impl Default for ViewStateController {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewStateController {
    /// Create a controller in `Idle` with the snapshot container shown.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ViewState::Idle,
            trigger_enabled: true,
            snapshot_visible: true,
            stream_visible: false,
            stream_text: String::new(),
            snapshot: None,
            events: None,
        }
    }

    /// Create a controller that publishes screen events.
    #[must_use]
    pub fn with_events(events: mpsc::UnboundedSender<ScreenEvent>) -> Self {
        Self {
            events: Some(events),
            ..Self::new()
        }
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> ViewState {
        self.state
    }

    /// Whether the trigger control is usable.
    #[must_use]
    pub const fn trigger_enabled(&self) -> bool {
        self.trigger_enabled
    }

    /// Whether the snapshot container is shown.
    #[must_use]
    pub const fn snapshot_visible(&self) -> bool {
        self.snapshot_visible
    }

    /// Whether the stream container is shown.
    #[must_use]
    pub const fn stream_visible(&self) -> bool {
        self.stream_visible
    }

    /// Stream container text.
    #[must_use]
    pub fn stream_text(&self) -> &str {
        &self.stream_text
    }

    /// Snapshot container content.
    #[must_use]
    pub const fn snapshot(&self) -> Option<&RenderedView> {
        self.snapshot.as_ref()
    }

    // -------------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------------

    /// Enter `Streaming`: disable the trigger, hide the snapshot, show and
    /// clear the stream container.
    pub fn begin_streaming(&mut self) -> Result<(), ViewError> {
        if self.state == ViewState::Streaming || !self.trigger_enabled {
            return Err(ViewError::SessionActive);
        }

        self.set_trigger(false);
        self.set_state(ViewState::Streaming);
        self.set_containers(false, true);
        self.stream_text.clear();
        self.emit(ScreenEvent::StreamCleared);
        Ok(())
    }

    /// Append decoded text to the stream container.
    ///
    /// Ignored outside `Streaming`.
    pub fn append_stream(&mut self, text: &str) {
        if self.state != ViewState::Streaming {
            tracing::debug!(len = text.len(), "Dropping stream text outside a session");
            return;
        }
        if text.is_empty() {
            return;
        }
        self.stream_text.push_str(text);
        self.emit(ScreenEvent::StreamAppended(text.to_string()));
    }

    /// Replace the stream container text.
    pub fn replace_stream(&mut self, text: String) {
        self.stream_text.clone_from(&text);
        self.emit(ScreenEvent::StreamReplaced(text));
    }

    /// Leave `Streaming`: re-enable the trigger and return to `Idle`.
    ///
    /// Safe to call in any state.
    pub fn finish_streaming(&mut self) {
        self.set_trigger(true);
        self.set_state(ViewState::Idle);
    }

    /// Replace the snapshot content, revealing it unless a session is in
    /// flight.
    pub fn present_snapshot(&mut self, view: RenderedView) {
        self.snapshot = Some(view.clone());
        self.emit(ScreenEvent::SnapshotRendered(Box::new(view)));
        self.reveal_snapshot();
    }

    /// Show the snapshot container and hide the stream container, unless a
    /// session is in flight.
    pub fn reveal_snapshot(&mut self) {
        if self.state == ViewState::Streaming {
            return;
        }
        self.set_containers(true, false);
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn set_state(&mut self, state: ViewState) {
        if self.state != state {
            self.state = state;
            self.emit(ScreenEvent::State(state));
        }
    }

    fn set_trigger(&mut self, enabled: bool) {
        if self.trigger_enabled != enabled {
            self.trigger_enabled = enabled;
            self.emit(ScreenEvent::Trigger { enabled });
        }
    }

    fn set_containers(&mut self, snapshot: bool, stream: bool) {
        debug_assert!(!(snapshot && stream), "both containers visible");
        if self.snapshot_visible != snapshot || self.stream_visible != stream {
            self.snapshot_visible = snapshot;
            self.stream_visible = stream;
            self.emit(ScreenEvent::Containers { snapshot, stream });
        }
    }

    fn emit(&self, event: ScreenEvent) {
        if let Some(events) = &self.events {
            // A dropped receiver only means nobody is watching.
            let _ = events.send(event);
        }
    }
}

// =============================================================================
// Streaming Guard
// =============================================================================

/// Borrow of the controller for the duration of one session.
///
/// [`Self::release`] performs the normal terminal cleanup. If the guard is
/// dropped without it (the session future was dropped mid-stream), `Drop`
/// restores `Idle`, re-enables the trigger, and reveals the snapshot, since
/// no reload will follow.
#[derive(Debug)]
pub struct StreamingGuard<'a> {
    view: &'a mut ViewStateController,
    released: bool,
}

impl<'a> StreamingGuard<'a> {
    /// Wrap a controller that has already entered `Streaming`.
    pub fn new(view: &'a mut ViewStateController) -> Self {
        Self {
            view,
            released: false,
        }
    }

    /// Terminal cleanup: back to `Idle` with the trigger enabled.
    pub fn release(mut self) {
        self.view.finish_streaming();
        self.released = true;
    }
}

impl Deref for StreamingGuard<'_> {
    type Target = ViewStateController;

    fn deref(&self) -> &Self::Target {
        self.view
    }
}

impl DerefMut for StreamingGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.view
    }
}

impl Drop for StreamingGuard<'_> {
    fn drop(&mut self) {
        if !self.released {
            tracing::warn!("Reasoning session abandoned before cleanup; restoring idle view");
            self.view.finish_streaming();
            self.view.reveal_snapshot();
        }
    }
}
