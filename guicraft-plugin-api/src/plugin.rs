//! Native plugin trait.
//!
//! Script plugins are loaded by the host's sandbox. Native element packs
//! compiled into the host (such as the built-in inventory elements) implement
//! [`Plugin`] instead and register their definitions through an
//! [`ElementRegistrar`].

use crate::{Result, SharedDefinition};
use serde::{Deserialize, Serialize};

/// Plugin metadata information
///
/// Shown by the CLI and used as the registerer tag in registry log lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    /// Plugin name (must be unique)
    pub name: String,
    /// Plugin version (semantic versioning)
    pub version: String,
    /// Brief description of the elements this plugin provides
    pub description: String,
    /// Plugin author(s)
    pub author: String,
}

impl PluginInfo {
    /// Create a new PluginInfo
    ///
    /// # Example
    ///
    /// ```rust
    /// use guicraft_plugin_api::PluginInfo;
    ///
    /// let info = PluginInfo::new("inventory", "0.1.0", "Inventory widgets", "Guicraft Team");
    /// assert_eq!(info.name, "inventory");
    /// ```
    pub fn new(name: &str, version: &str, description: &str, author: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            description: description.to_string(),
            author: author.to_string(),
        }
    }
}

/// Write access to the element registry.
///
/// Registration is append-only: registering an id that already exists fails
/// and leaves the existing definition in place.
pub trait ElementRegistrar {
    /// Register `definition` under `id`, tagged with `registerer` for logging.
    ///
    /// # Errors
    ///
    /// Fails if `id` is already registered.
    fn register_element(
        &self,
        id: &str,
        definition: SharedDefinition,
        registerer: &str,
    ) -> Result<()>;
}

/// A native pack of element definitions.
///
/// # Example
///
/// ```rust
/// use guicraft_plugin_api::{ElementRegistrar, Plugin, PluginInfo};
///
/// struct Empty;
///
/// impl Plugin for Empty {
///     fn info(&self) -> PluginInfo {
///         PluginInfo::new("empty", "1.0.0", "Registers nothing", "Author")
///     }
///
///     fn register_elements(&self, _registrar: &dyn ElementRegistrar) -> anyhow::Result<()> {
///         Ok(())
///     }
/// }
/// ```
pub trait Plugin: Send + Sync {
    /// Returns metadata information about this plugin.
    fn info(&self) -> PluginInfo;

    /// Register every definition this plugin provides.
    ///
    /// # Errors
    ///
    /// Return an error if any registration fails; the host reports it and
    /// continues with the next plugin.
    fn register_elements(&self, registrar: &dyn ElementRegistrar) -> Result<()>;
}
