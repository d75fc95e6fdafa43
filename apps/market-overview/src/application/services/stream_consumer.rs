//! Stream Consumer
//!
//! Drives one reasoning stream: opens the call, reads chunks in arrival order,
//! decodes them incrementally, and appends each piece to the visible stream
//! container as it arrives. The terminal text replaces the container: the
//! trimmed accumulator on success, a localized message on failure or
//! cancellation.
//!
//! The consumer does not leave `Streaming`; that belongs to the caller's
//! cleanup path so it runs no matter how the session ends.

use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::application::ports::{ApiError, ChunkSource, OverviewApi};
use crate::domain::language::{Locale, Message};
use crate::domain::stream_session::{StreamSession, TextEncoding};
use crate::domain::view_state::ViewStateController;
use crate::infrastructure::metrics;

/// How a reasoning session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// End of stream reached.
    Completed {
        /// Trimmed accumulated text.
        text: String,
    },
    /// Opening or reading the stream failed.
    Failed {
        /// The failure.
        error: ApiError,
    },
    /// The cancellation token fired first.
    Cancelled,
}

impl SessionOutcome {
    /// Short label for metrics and logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Completed { .. } => "completed",
            Self::Failed { .. } => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Runs reasoning sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamConsumer;

impl StreamConsumer {
    /// Run one session against a controller that is already `Streaming`.
    pub async fn run<A>(
        api: &A,
        run_llm: bool,
        view: &mut ViewStateController,
        locale: &Locale,
        cancel: &CancellationToken,
    ) -> SessionOutcome
    where
        A: OverviewApi + ?Sized,
    {
        let started = Instant::now();
        let outcome = Self::consume(api, run_llm, view, cancel).await;

        match &outcome {
            SessionOutcome::Completed { text } => {
                view.replace_stream(text.clone());
            }
            SessionOutcome::Failed { error } => {
                tracing::warn!(error = %error, kind = error.kind(), "Reasoning stream failed");
                view.replace_stream(locale.text(Message::ReasoningFailed).to_string());
            }
            SessionOutcome::Cancelled => {
                tracing::info!("Reasoning stream cancelled");
                view.replace_stream(locale.text(Message::ReasoningCancelled).to_string());
            }
        }

        metrics::record_session(outcome.label(), started.elapsed().as_secs_f64());
        outcome
    }

    async fn consume<A>(
        api: &A,
        run_llm: bool,
        view: &mut ViewStateController,
        cancel: &CancellationToken,
    ) -> SessionOutcome
    where
        A: OverviewApi + ?Sized,
    {
        let opened = tokio::select! {
            biased;
            () = cancel.cancelled() => return SessionOutcome::Cancelled,
            opened = api.open_reasoning_stream(run_llm) => opened,
        };
        let mut source: Box<dyn ChunkSource> = match opened {
            Ok(source) => source,
            Err(error) => return SessionOutcome::Failed { error },
        };

        let mut session = StreamSession::new(source.charset());
        if session.encoding() == TextEncoding::Fallback {
            tracing::warn!(
                charset = source.charset().unwrap_or_default(),
                "Unsupported stream charset; decoding as lossy UTF-8"
            );
        }
        tracing::debug!(run_llm, "Reasoning stream opened");

        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => return SessionOutcome::Cancelled,
                next = source.next_chunk() => next,
            };

            match next {
                Ok(Some(chunk)) => {
                    metrics::record_stream_chunk(chunk.len());
                    let piece = session.push(&chunk);
                    view.append_stream(&piece);
                }
                Ok(None) => {
                    let text = session.close();
                    tracing::info!(
                        chunks = session.chunk_count(),
                        bytes = session.byte_count(),
                        chars = text.chars().count(),
                        "Reasoning stream completed"
                    );
                    return SessionOutcome::Completed { text };
                }
                Err(error) => return SessionOutcome::Failed { error },
            }
        }
    }
}
