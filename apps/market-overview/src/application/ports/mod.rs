//! Application Ports (Driven)
//!
//! Interfaces the dashboard uses to reach external systems.
//! - **`OverviewApi`**: the market overview backend (aggregate fetch and the
//!   streamed reasoning call)
//! - **`LanguageStore`**: persisted display-language preference

mod language_port;
mod overview_port;

#[cfg(any(test, feature = "test-util"))]
pub use language_port::MemoryLanguageStore;
pub use language_port::{LanguageStore, PreferenceError};
#[cfg(test)]
pub use overview_port::MockOverviewApi;
#[cfg(any(test, feature = "test-util"))]
pub use overview_port::ScriptedChunkSource;
pub use overview_port::{ApiError, ChunkSource, OverviewApi};
