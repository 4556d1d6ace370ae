//! Persistent preferences
//!
//! Only the user's choices survive a restart:
//!
//! <config dir>/
//! └── preferences.json   # { apiKeys, selectedModels, summarizationModelId }
//!
//! Responses, the message log, and summaries are session-only. Keys are
//! stored in plain text.

use crate::session::ApiKeys;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const PREFERENCES_FILE: &str = "preferences.json";

/// The persisted record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Preferences {
    pub api_keys: ApiKeys,
    /// Model ids in selection order
    pub selected_models: Vec<String>,
    pub summarization_model_id: Option<String>,
}

/// Reads and writes [`Preferences`] in one directory
pub struct PreferenceStore {
    root: PathBuf,
}

impl PreferenceStore {
    /// Store rooted at the config directory
    pub fn new() -> Result<Self> {
        Ok(Self::at(crate::config::config_dir()?))
    }

    /// Store rooted at an explicit directory
    pub fn at(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.root.join(PREFERENCES_FILE)
    }

    /// Load saved preferences, or defaults if nothing was saved yet
    pub fn load(&self) -> Result<Preferences> {
        let path = self.path();
        if !path.exists() {
            return Ok(Preferences::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn save(&self, prefs: &Preferences) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        let path = self.path();
        let content = serde_json::to_string_pretty(prefs)?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::debug!("Saved preferences to {}", path.display());
        Ok(())
    }
}
