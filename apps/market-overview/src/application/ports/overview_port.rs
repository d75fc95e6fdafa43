//! Overview Backend Port (Driven Port)
//!
//! Interface for the market overview backend: the one-shot aggregate fetch and
//! the streamed reasoning call.

#[cfg(any(test, feature = "test-util"))]
use std::collections::VecDeque;

use async_trait::async_trait;

use crate::domain::overview::AggregatePayload;

/// Backend call error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Connection, DNS, TLS, or body read failure.
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response.
    #[error("HTTP {status}: {body}")]
    Status {
        /// Status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// Response body was not the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),

    /// No response (or no chunk) within the configured time.
    #[error("Timed out after {after_secs}s")]
    Timeout {
        /// Elapsed limit in seconds.
        after_secs: u64,
    },

    /// Retries exhausted.
    #[error("Max retries exceeded after {attempts} attempts")]
    MaxRetriesExceeded {
        /// Attempts made.
        attempts: u32,
    },
}

impl ApiError {
    /// Short label for metrics and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Status { .. } => "status",
            Self::Decode(_) => "decode",
            Self::Timeout { .. } => "timeout",
            Self::MaxRetriesExceeded { .. } => "max_retries",
        }
    }
}

/// An open response body read chunk by chunk.
#[async_trait]
pub trait ChunkSource: Send {
    /// Charset label from the response's content type, if declared.
    fn charset(&self) -> Option<&str>;

    /// Next chunk of bytes, or `None` at end of stream.
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, ApiError>;
}

/// Port for the market overview backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OverviewApi: Send + Sync {
    /// Fetch the aggregate payload (`GET /market/overview`).
    async fn fetch_overview(&self) -> Result<AggregatePayload, ApiError>;

    /// Start a reasoning stream (`POST /market/overview/reason`).
    ///
    /// A non-2xx status is returned as [`ApiError::Status`] before any chunk
    /// is read.
    async fn open_reasoning_stream(&self, run_llm: bool)
    -> Result<Box<dyn ChunkSource>, ApiError>;
}

// =============================================================================
// Scripted Source
// =============================================================================

/// In-memory chunk source for testing.
#[cfg(any(test, feature = "test-util"))]
///
/// Yields each scripted step in order, then end of stream. With
/// [`Self::stall`], it never ends and waits forever after the last step.
#[derive(Debug, Default)]
pub struct ScriptedChunkSource {
    charset: Option<String>,
    steps: VecDeque<Result<Vec<u8>, ApiError>>,
    stall: bool,
}

#[cfg(any(test, feature = "test-util"))]
impl ScriptedChunkSource {
    /// Source that yields the given chunks.
    #[must_use]
    pub fn new<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Vec<u8>>,
    {
        Self {
            charset: None,
            steps: chunks.into_iter().map(|c| Ok(c.into())).collect(),
            stall: false,
        }
    }

    /// Declare a charset.
    #[must_use]
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    /// Fail with `error` after the scripted chunks.
    #[must_use]
    pub fn then_fail(mut self, error: ApiError) -> Self {
        self.steps.push_back(Err(error));
        self
    }

    /// Never reach end of stream.
    #[must_use]
    pub const fn stall(mut self) -> Self {
        self.stall = true;
        self
    }
}

#[cfg(any(test, feature = "test-util"))]
#[async_trait]
impl ChunkSource for ScriptedChunkSource {
    fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, ApiError> {
        match self.steps.pop_front() {
            Some(step) => step.map(Some),
            None if self.stall => std::future::pending().await,
            None => Ok(None),
        }
    }
}
