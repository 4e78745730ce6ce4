//! # Session management for Guicraft
//!
//! This module persists user state between runs: the location the current
//! layout was last loaded from or saved to, and a list of recently used
//! layout files. It is stored separately from [`Config`](crate::Config) so
//! that settings and state do not mix.

use crate::bridge::default_file_name;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// User session data.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    /// Where the current layout was last loaded from or saved to.
    pub last_loaded_location: Option<PathBuf>,
    /// Recently used layout files, most recent first.
    pub recent_layouts: Vec<PathBuf>,
}

/// Where a save dialog should start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveSuggestion {
    /// Directory to open, if one is known.
    pub directory: Option<PathBuf>,
    /// Proposed file name.
    pub file_name: String,
}

impl Session {
    /// Load session data from the default location.
    ///
    /// If the file doesn't exist or cannot be loaded, a default session is returned.
    pub fn load() -> Self {
        match Self::session_file_path().and_then(|path| Self::load_from_file(&path)) {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!("Failed to load session: {}. Using default.", e);
                Self::default()
            }
        }
    }

    /// Load session data from a specific file; a missing file is an empty session.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read session file: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| Error::config(format!("Failed to parse session file: {}", e)))
    }

    /// Save session data to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to_file(&Self::session_file_path()?)
    }

    /// Save session data to a specific file.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::config(format!("Failed to create session directory: {}", e)))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| Error::config(format!("Failed to serialize session: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| Error::config(format!("Failed to write session file: {}", e)))?;

        Ok(())
    }

    /// Remember `path` as the current layout's location.
    ///
    /// This moves the path to the top of the recent list if it already exists,
    /// and trims the list to `max_count` entries.
    pub fn set_last_loaded_location(&mut self, path: PathBuf, max_count: usize) {
        self.recent_layouts.retain(|p| p != &path);
        self.recent_layouts.insert(0, path.clone());
        self.recent_layouts.truncate(max_count);
        self.last_loaded_location = Some(path);
    }

    /// Forget the current location, e.g. after starting a new layout.
    pub fn reset_last_loaded_location(&mut self) {
        self.last_loaded_location = None;
    }

    /// Where to offer saving the current layout.
    ///
    /// With a known last location its directory and file name are reused;
    /// otherwise the home directory and a name derived from the base element.
    ///
    /// # Example
    ///
    /// ```rust
    /// use guicraft_core::Session;
    ///
    /// let session = Session::default();
    /// let suggestion = session.suggest_save_location("Chest");
    /// assert_eq!(suggestion.file_name, "Chest.mcgf");
    /// ```
    pub fn suggest_save_location(&self, base_name: &str) -> SaveSuggestion {
        match &self.last_loaded_location {
            Some(location) => SaveSuggestion {
                directory: location.parent().map(Path::to_path_buf),
                file_name: location
                    .file_name()
                    .and_then(|name| name.to_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| default_file_name(base_name)),
            },
            None => SaveSuggestion {
                directory: dirs::home_dir(),
                file_name: default_file_name(base_name),
            },
        }
    }

    /// Get the path to the session file.
    pub fn session_file_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| Error::config("Could not determine data directory"))?
            .join("guicraft");

        Ok(data_dir.join("session.json"))
    }
}
