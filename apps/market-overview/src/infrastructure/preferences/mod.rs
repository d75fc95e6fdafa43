//! File-Backed Language Preference
//!
//! Keeps the single `language` key in a small JSON document. Writes go to a
//! sibling temp file first and are renamed into place.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::application::ports::{LanguageStore, PreferenceError};
use crate::domain::language::Language;

#[derive(Debug, Serialize, Deserialize)]
struct PreferenceDocument {
    language: String,
}

/// Language preference stored in a JSON file.
#[derive(Debug, Clone)]
pub struct FileLanguageStore {
    path: PathBuf,
}

impl FileLanguageStore {
    /// Store at `path`; the file and its directory are created on first save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LanguageStore for FileLanguageStore {
    fn load(&self) -> Option<Language> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Cannot read language preference");
                return None;
            }
        };

        match serde_json::from_str::<PreferenceDocument>(&raw) {
            Ok(doc) => Language::parse(&doc.language),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Ignoring malformed language preference");
                None
            }
        }
    }

    fn save(&mut self, language: Language) -> Result<(), PreferenceError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let doc = PreferenceDocument {
            language: language.code().to_string(),
        };
        let body = serde_json::to_vec_pretty(&doc)?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &self.path)?;

        tracing::debug!(path = %self.path.display(), language = %language, "Saved language preference");
        Ok(())
    }
}
