//! Language Preference Port (Driven Port)
//!
//! A single persisted key: the display language. Read once at startup and
//! written on every language switch.

use crate::domain::language::Language;

/// Preference persistence error.
#[derive(Debug, thiserror::Error)]
pub enum PreferenceError {
    /// Reading or writing the backing file failed.
    #[error("Preference I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored document could not be encoded.
    #[error("Preference encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Port for the language preference.
pub trait LanguageStore: Send {
    /// Saved language, if any. Unreadable or unknown values read as `None`.
    fn load(&self) -> Option<Language>;

    /// Persist the language.
    fn save(&mut self, language: Language) -> Result<(), PreferenceError>;
}

/// In-memory implementation for testing.
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Default, Clone)]
pub struct MemoryLanguageStore {
    language: Option<Language>,
    saves: usize,
}

#[cfg(any(test, feature = "test-util"))]
impl MemoryLanguageStore {
    /// Create a store, optionally pre-seeded.
    #[must_use]
    pub const fn new(language: Option<Language>) -> Self {
        Self { language, saves: 0 }
    }

    /// Number of successful saves.
    #[must_use]
    pub const fn saves(&self) -> usize {
        self.saves
    }
}

#[cfg(any(test, feature = "test-util"))]
impl LanguageStore for MemoryLanguageStore {
    fn load(&self) -> Option<Language> {
        self.language
    }

    fn save(&mut self, language: Language) -> Result<(), PreferenceError> {
        self.language = Some(language);
        self.saves += 1;
        Ok(())
    }
}
