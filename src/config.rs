//! Store configuration
//!
//! Controls where the database file lives and how the SQLite connection is
//! tuned. Loaded from JSON; any missing field falls back to its default.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database file name inside the data directory.
    #[serde(default = "default_file_name")]
    pub file_name: String,

    /// Overrides the per-user data directory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// SQLite `journal_mode` pragma.
    #[serde(default = "default_journal_mode")]
    pub journal_mode: String,

    /// SQLite `synchronous` pragma.
    #[serde(default = "default_synchronous")]
    pub synchronous: String,

    #[serde(default = "default_true")]
    pub foreign_keys: bool,

    /// How long a write waits on a locked database before failing.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Buffered change events per subscriber before it lags.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Hosts a block-list seed must insert before the table counts as populated.
    #[serde(default = "default_populated_threshold")]
    pub populated_threshold: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            file_name: default_file_name(),
            data_dir: None,
            journal_mode: default_journal_mode(),
            synchronous: default_synchronous(),
            foreign_keys: true,
            busy_timeout_ms: default_busy_timeout_ms(),
            event_capacity: default_event_capacity(),
            populated_threshold: default_populated_threshold(),
        }
    }
}

// Default value functions
fn default_file_name() -> String {
    "dl.db".to_string()
}

fn default_journal_mode() -> String {
    "WAL".to_string()
}

fn default_synchronous() -> String {
    "NORMAL".to_string()
}

fn default_true() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_event_capacity() -> usize {
    256
}

fn default_populated_threshold() -> usize {
    80_000
}

/// Resolves the per-user project directories.
///
/// macOS:  ~/Library/Application Support/vidbrowser
/// Windows: %APPDATA%\\vidbrowser
/// Linux:  ~/.local/share/vidbrowser (depending on XDG)
pub fn app_project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("com", "vidbrowser", "vidbrowser")
        .ok_or_else(|| anyhow!("failed to resolve per-user app data directory"))
}

impl StoreConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse store config")
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read store config: {}", path.display()))?;
        Self::from_json_str(&raw)
    }

    /// Directory holding the database file, created if missing.
    pub fn resolve_data_dir(&self) -> Result<PathBuf> {
        let dir = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => app_project_dirs()?.data_dir().to_path_buf(),
        };
        fs::create_dir_all(&dir).with_context(|| format!("create data dir: {}", dir.display()))?;
        Ok(dir)
    }

    pub fn resolve_db_path(&self) -> Result<PathBuf> {
        Ok(self.resolve_data_dir()?.join(&self.file_name))
    }
}
