//! # Error handling for Guicraft Core
//!
//! This module provides the error type shared by the registry, the plugin
//! sandbox, the layout engine and the persistence layer.
//!
//! Element callbacks themselves return [`anyhow::Error`] (see
//! `guicraft_plugin_api::Result`) because they may carry arbitrary foreign
//! failures; the conversion below folds those into [`Error::Generic`].

use thiserror::Error;

/// Result type used throughout Guicraft Core.
///
/// # Example
///
/// ```rust
/// use guicraft_core::{Result, Error};
///
/// fn example_function() -> Result<String> {
///     Ok("Success".to_string())
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// Prefix of the aggregated message produced when a layout references
/// element ids that are not registered.
pub const MISSING_ELEMENTS_HEADER: &str = "Missing Elements (Are all required plugins loaded?):";

/// Main error type for Guicraft Core.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Plugin system errors
    #[error("Plugin error: {message}")]
    Plugin { message: String },

    /// An element id was registered twice
    #[error("Double registration of element with id {id}")]
    DuplicateRegistration { id: String },

    /// A plugin was rejected before it ran
    #[error("{message}")]
    PluginValidation { name: String, message: String },

    /// Fetching plugin sources failed or returned a malformed payload
    #[error("{message}")]
    PluginTransport { message: String },

    /// Layout management errors
    #[error("Layout error: {message}")]
    Layout { message: String },

    /// A loaded layout references unregistered element ids
    #[error("{}\n{}", MISSING_ELEMENTS_HEADER, .missing.join("\n"))]
    MissingElements { missing: Vec<String> },

    /// Wire data could not be turned into a layout
    #[error("Deserialization error: {message}")]
    Deserialization { message: String },

    /// Rendering errors
    #[error("Render error: {message}")]
    Render { message: String },

    /// File I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Image decoding/encoding errors
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Generic error with custom message
    #[error("Error: {message}")]
    Generic { message: String },

    /// Validation errors
    #[error("Validation error: {field}: {message}")]
    Validation { field: String, message: String },

    /// Not found errors
    #[error("Not found: {resource}")]
    NotFound { resource: String },
}

impl Error {
    /// Create a new configuration error.
    ///
    /// # Example
    ///
    /// ```rust
    /// use guicraft_core::Error;
    ///
    /// let error = Error::config("Invalid configuration file format");
    /// ```
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new plugin error.
    ///
    /// # Example
    ///
    /// ```rust
    /// use guicraft_core::Error;
    ///
    /// let error = Error::plugin("Plugin engine could not be created");
    /// ```
    pub fn plugin<S: Into<String>>(message: S) -> Self {
        Self::Plugin {
            message: message.into(),
        }
    }

    /// Create a duplicate registration error for `id`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use guicraft_core::Error;
    ///
    /// let error = Error::duplicate_registration("slotElement");
    /// assert_eq!(error.to_string(), "Double registration of element with id slotElement");
    /// ```
    pub fn duplicate_registration<S: Into<String>>(id: S) -> Self {
        Self::DuplicateRegistration { id: id.into() }
    }

    /// Create a plugin validation error.
    pub fn plugin_validation<N: Into<String>, M: Into<String>>(name: N, message: M) -> Self {
        Self::PluginValidation {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a plugin transport error.
    pub fn plugin_transport<S: Into<String>>(message: S) -> Self {
        Self::PluginTransport {
            message: message.into(),
        }
    }

    /// Create a new layout error.
    ///
    /// # Example
    ///
    /// ```rust
    /// use guicraft_core::Error;
    ///
    /// let error = Error::layout("Element index 4 is out of range");
    /// ```
    pub fn layout<S: Into<String>>(message: S) -> Self {
        Self::Layout {
            message: message.into(),
        }
    }

    /// Create a missing elements error from the already formatted lines.
    ///
    /// # Example
    ///
    /// ```rust
    /// use guicraft_core::Error;
    ///
    /// let error = Error::missing_elements(vec!["Unknown Element for the Base Element: chest".into()]);
    /// assert!(error.to_string().starts_with("Missing Elements"));
    /// ```
    pub fn missing_elements(missing: Vec<String>) -> Self {
        Self::MissingElements { missing }
    }

    /// Create a new deserialization error.
    pub fn deserialization<S: Into<String>>(message: S) -> Self {
        Self::Deserialization {
            message: message.into(),
        }
    }

    /// Create a new render error.
    pub fn render<S: Into<String>>(message: S) -> Self {
        Self::Render {
            message: message.into(),
        }
    }

    /// Create a new generic error.
    ///
    /// # Example
    ///
    /// ```rust
    /// use guicraft_core::Error;
    ///
    /// let error = Error::generic("Something went wrong");
    /// ```
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Create a new validation error.
    ///
    /// # Example
    ///
    /// ```rust
    /// use guicraft_core::Error;
    ///
    /// let error = Error::validation("plugins.timeout_ms", "must be greater than 0");
    /// ```
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new not found error.
    ///
    /// # Example
    ///
    /// ```rust
    /// use guicraft_core::Error;
    ///
    /// let error = Error::not_found("Element 'slotElement'");
    /// ```
    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Check if this error is a configuration error.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }

    /// Check if this error is a plugin error.
    ///
    /// # Example
    ///
    /// ```rust
    /// use guicraft_core::Error;
    ///
    /// let error = Error::plugin("Load failed");
    /// assert!(error.is_plugin());
    /// ```
    pub fn is_plugin(&self) -> bool {
        matches!(self, Self::Plugin { .. })
    }

    /// Check if this error is a duplicate registration.
    pub fn is_duplicate_registration(&self) -> bool {
        matches!(self, Self::DuplicateRegistration { .. })
    }

    /// Check if this error lists missing elements.
    pub fn is_missing_elements(&self) -> bool {
        matches!(self, Self::MissingElements { .. })
    }

    /// Check if this error is an I/O error.
    ///
    /// # Example
    ///
    /// ```rust
    /// use guicraft_core::Error;
    /// use std::io;
    ///
    /// let error = Error::Io(io::Error::new(io::ErrorKind::NotFound, "File not found"));
    /// assert!(error.is_io());
    /// ```
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }

    /// Check if this error is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Get the error category as a string.
    ///
    /// # Example
    ///
    /// ```rust
    /// use guicraft_core::Error;
    ///
    /// let error = Error::config("Invalid format");
    /// assert_eq!(error.category(), "Config");
    /// ```
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config { .. } => "Config",
            Self::Plugin { .. } => "Plugin",
            Self::DuplicateRegistration { .. } => "DuplicateRegistrationError",
            Self::PluginValidation { .. } => "PluginValidation",
            Self::PluginTransport { .. } => "PluginTransport",
            Self::Layout { .. } => "Layout",
            Self::MissingElements { .. } => "MissingElements",
            Self::Deserialization { .. } => "Deserialization",
            Self::Render { .. } => "Render",
            Self::Io(_) => "IO",
            Self::Json(_) => "JSON",
            Self::Toml(_) => "TOML",
            Self::Image(_) => "Image",
            Self::Generic { .. } => "Generic",
            Self::Validation { .. } => "Validation",
            Self::NotFound { .. } => "NotFound",
        }
    }
}

/// Convenience macro for creating plugin errors.
///
/// # Example
///
/// ```rust
/// use guicraft_core::{plugin_error, Error};
///
/// let err = plugin_error!("Plugin '{}' did not finish", "chest.rhai");
/// ```
#[macro_export]
macro_rules! plugin_error {
    ($($arg:tt)*) => {
        $crate::Error::plugin(format!($($arg)*))
    };
}

/// Convenience macro for creating layout errors.
///
/// # Example
///
/// ```rust
/// use guicraft_core::{layout_error, Error};
///
/// let err = layout_error!("No element at index {}", 3);
/// ```
#[macro_export]
macro_rules! layout_error {
    ($($arg:tt)*) => {
        $crate::Error::layout(format!($($arg)*))
    };
}

/// Convert from `anyhow::Error` to our custom error type.
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::generic(format!("{err:#}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_creation() {
        let error = Error::config("Test message");
        assert!(error.is_config());
        assert_eq!(error.category(), "Config");
        assert!(error.to_string().contains("Test message"));
    }

    #[test]
    fn test_duplicate_registration_names_id() {
        let error = Error::duplicate_registration("chest");
        assert!(error.is_duplicate_registration());
        assert_eq!(error.category(), "DuplicateRegistrationError");
        assert!(error.to_string().ends_with("chest"));
    }

    #[test]
    fn test_missing_elements_message() {
        let error = Error::missing_elements(vec![
            "Unknown Element for the Base Element: a".to_string(),
            "Unknown Element for Element #0 (Slot): b".to_string(),
        ]);
        assert!(error.is_missing_elements());
        assert_eq!(
            error.to_string(),
            "Missing Elements (Are all required plugins loaded?):\n\
             Unknown Element for the Base Element: a\n\
             Unknown Element for Element #0 (Slot): b"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error = Error::from(io_error);
        assert!(error.is_io());
        assert_eq!(error.category(), "IO");
    }

    #[test]
    fn test_validation_error() {
        let error = Error::validation("limits.max_image_bytes", "must be greater than 0");
        assert!(error.is_validation());
        assert_eq!(error.category(), "Validation");
    }

    #[test]
    fn test_error_macros() {
        let plugin_err = plugin_error!("Plugin {}", "error");
        assert!(plugin_err.is_plugin());

        let layout_err = layout_error!("Layout {}", 1);
        assert_eq!(layout_err.category(), "Layout");
    }

    #[test]
    fn test_anyhow_conversion() {
        let anyhow_err = anyhow::anyhow!("Test error");
        let error = Error::from(anyhow_err);
        assert_eq!(error.category(), "Generic");
        assert!(error.to_string().contains("Test error"));
    }
}
