//! # Configuration management for Guicraft Core
//!
//! Settings are stored as TOML under the user's config directory
//! (`<config_dir>/guicraft/config.toml`). Every section has defaults, so a
//! partial file only needs to name the values it changes.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for Guicraft.
///
/// # Example
///
/// ```rust
/// use guicraft_core::Config;
///
/// let config = Config::default();
/// assert_eq!(config.editor.default_base_element, "normalInventoryElement");
/// assert!(config.plugins.enabled);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Plugin loading and sandbox limits
    pub plugins: PluginConfig,
    /// Editor defaults
    pub editor: EditorConfig,
    /// Resource limits for untrusted data
    pub limits: LimitsConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

/// Plugin loading configuration settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    /// Directory whose files are loaded as plugins
    pub directory: PathBuf,
    /// Whether script plugins are loaded at all
    pub enabled: bool,
    /// Operation budget per plugin execution (0 = unlimited)
    pub max_operations: u64,
    /// Wall-clock budget per plugin execution in milliseconds
    pub timeout_ms: u64,
    /// Maximum script call depth
    pub max_call_levels: usize,
    /// Maximum length of a script string (0 = unlimited)
    pub max_string_size: usize,
    /// Maximum length of a script array (0 = unlimited)
    pub max_array_size: usize,
    /// Maximum size of a script object map (0 = unlimited)
    pub max_map_size: usize,
}

/// Editor defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Element used as the base of a new layout
    pub default_base_element: String,
    /// Display name of a new layout's base element
    pub default_layout_name: String,
}

/// Limits applied to data coming from files and plugins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest pixel buffer accepted when loading a layout
    pub max_image_bytes: usize,
    /// Largest preview (width * height) rendered by the preview cache
    pub max_preview_pixels: u64,
    /// Largest layout (width * height) rendered to an image
    pub max_render_pixels: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level when `RUST_LOG` is not set
    pub level: String,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            directory: dirs::data_dir()
                .unwrap_or_default()
                .join("guicraft")
                .join("plugins"),
            enabled: true,
            max_operations: 5_000_000,
            timeout_ms: 5_000,
            max_call_levels: 64,
            max_string_size: 1 << 20,
            max_array_size: 1 << 16,
            max_map_size: 1 << 14,
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            default_base_element: "normalInventoryElement".to_string(),
            default_layout_name: "Inventory".to_string(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: 64 * 1024 * 1024,
            max_preview_pixels: 4096 * 4096,
            max_render_pixels: 8192 * 8192,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location or fall back to defaults.
    ///
    /// Unlike [`load`](Self::load) this never fails on a missing or broken
    /// file; the problem is logged and defaults are used.
    ///
    /// # Example
    ///
    /// ```rust
    /// use guicraft_core::Config;
    ///
    /// let config = Config::load_or_default().unwrap();
    /// ```
    pub fn load_or_default() -> Result<Self> {
        match Self::load() {
            Ok(config) => Ok(config),
            Err(err) => {
                tracing::debug!("Using default configuration: {}", err);
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from the default config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::load_from_file(&config_path)
    }

    /// Load configuration from a specific file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use guicraft_core::Config;
    /// use std::path::Path;
    ///
    /// let config = Config::load_from_file(Path::new("guicraft.toml"))?;
    /// # Ok::<(), guicraft_core::Error>(())
    /// ```
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::config(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be written.
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path()?;
        self.save_to_file(&config_path)
    }

    /// Save configuration to a specific file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path where to save the configuration file
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the file cannot be
    /// written.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.validate()?;

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::config(format!("Failed to create config directory: {}", e)))?;
        }

        std::fs::write(path, content)
            .map_err(|e| Error::config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the first invalid field.
    ///
    /// # Example
    ///
    /// ```rust
    /// use guicraft_core::Config;
    ///
    /// let mut config = Config::default();
    /// assert!(config.validate().is_ok());
    /// config.plugins.timeout_ms = 0;
    /// assert!(config.validate().unwrap_err().is_validation());
    /// ```
    pub fn validate(&self) -> Result<()> {
        if self.plugins.timeout_ms == 0 {
            return Err(Error::validation(
                "plugins.timeout_ms",
                "Plugin timeout must be greater than 0",
            ));
        }

        if self.plugins.max_call_levels == 0 {
            return Err(Error::validation(
                "plugins.max_call_levels",
                "Call depth limit must be greater than 0",
            ));
        }

        if self.editor.default_base_element.trim().is_empty() {
            return Err(Error::validation(
                "editor.default_base_element",
                "Default base element must not be empty",
            ));
        }

        if self.limits.max_image_bytes == 0 {
            return Err(Error::validation(
                "limits.max_image_bytes",
                "Image size limit must be greater than 0",
            ));
        }

        if self.limits.max_preview_pixels == 0 {
            return Err(Error::validation(
                "limits.max_preview_pixels",
                "Preview size limit must be greater than 0",
            ));
        }

        if self.limits.max_render_pixels == 0 {
            return Err(Error::validation(
                "limits.max_render_pixels",
                "Render size limit must be greater than 0",
            ));
        }

        if !["error", "warn", "info", "debug", "trace"].contains(&self.logging.level.as_str()) {
            return Err(Error::validation(
                "logging.level",
                "Log level must be one of: error, warn, info, debug, trace",
            ));
        }

        Ok(())
    }

    /// Get the default configuration file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Get the configuration directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("guicraft"))
            .ok_or_else(|| Error::config("Could not determine config directory"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.editor.default_layout_name, "Inventory");
        assert_eq!(config.plugins.timeout_ms, 5_000);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_errors() {
        let mut config = Config::default();
        config.plugins.max_call_levels = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.limits.max_image_bytes = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.limits.max_render_pixels = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        config = Config::default();
        config.editor.default_base_element = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("[plugins]\ntimeout_ms = 250\n").unwrap();
        assert_eq!(config.plugins.timeout_ms, 250);
        assert_eq!(config.plugins.max_call_levels, 64);
        assert_eq!(config.editor, EditorConfig::default());
    }

    #[test]
    fn test_config_file_operations() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.plugins.directory = temp_dir.path().join("plugins");
        config.limits.max_preview_pixels = 1024;

        config.save_to_file(&config_path).unwrap();
        assert!(config_path.exists());

        let loaded = Config::load_from_file(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        std::fs::write(&config_path, "plugins = 3").unwrap();
        assert!(Config::load_from_file(&config_path).unwrap_err().is_config());
    }
}
