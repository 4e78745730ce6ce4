//! # Element registry
//!
//! The [`ElementRegistry`] maps element ids to their definitions. It is
//! append-only: ids are registered once, never overwritten and never removed.
//! One registry is created at startup, wrapped in an `Arc` and shared by the
//! plugin sandbox, the preview cache and the editor session.

use crate::{Error, Result};
use guicraft_plugin_api::{ElementRegistrar, Plugin, SharedDefinition};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info};

/// Registerer tag used when the host registers an element itself.
pub const DEFAULT_REGISTERER: &str = "creator";

/// A registered definition together with the id it was registered under.
#[derive(Clone)]
pub struct RegisteredElement {
    pub id: String,
    pub definition: SharedDefinition,
    /// Who registered the element (a plugin name or [`DEFAULT_REGISTERER`])
    pub registerer: String,
}

impl std::fmt::Debug for RegisteredElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredElement")
            .field("id", &self.id)
            .field("registerer", &self.registerer)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct Entries {
    ordered: Vec<RegisteredElement>,
    index: HashMap<String, usize>,
}

/// Registry of element definitions keyed by id.
///
/// # Example
///
/// ```rust
/// use guicraft_core::ElementRegistry;
/// use guicraft_plugin_api::ElementDefinitionBuilder;
/// use std::sync::Arc;
///
/// let registry = ElementRegistry::new();
/// let definition = Arc::new(
///     ElementDefinitionBuilder::new(|_, _, _| Ok(())).default_size(4, 4).build().unwrap(),
/// );
///
/// registry.register("box", definition.clone(), None).unwrap();
/// assert!(registry.get("box").is_some());
/// assert!(registry.register("box", definition, None).unwrap_err().is_duplicate_registration());
/// ```
#[derive(Default)]
pub struct ElementRegistry {
    entries: RwLock<Entries>,
}

impl ElementRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `definition` under `id`.
    ///
    /// The check and the insert happen under one write lock, so concurrent
    /// plugins can never both claim an id.
    ///
    /// # Arguments
    ///
    /// * `id` - Element id, unique across the process
    /// * `definition` - The element definition
    /// * `registerer` - Who is registering; defaults to [`DEFAULT_REGISTERER`]
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateRegistration`] if `id` is already taken. The
    /// existing definition is left unchanged.
    pub fn register(
        &self,
        id: &str,
        definition: SharedDefinition,
        registerer: Option<&str>,
    ) -> Result<()> {
        let registerer = registerer.unwrap_or(DEFAULT_REGISTERER);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        if entries.index.contains_key(id) {
            debug!("[{}]: Rejected duplicate element {}", registerer, id);
            return Err(Error::duplicate_registration(id));
        }

        info!("[{}]: Registering element {}!", registerer, id);
        let position = entries.ordered.len();
        entries.ordered.push(RegisteredElement {
            id: id.to_string(),
            definition,
            registerer: registerer.to_string(),
        });
        entries.index.insert(id.to_string(), position);
        Ok(())
    }

    /// Look up a definition. Unknown ids yield `None`.
    pub fn get(&self, id: &str) -> Option<SharedDefinition> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .index
            .get(id)
            .map(|&position| entries.ordered[position].definition.clone())
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .index
            .contains_key(id)
    }

    /// Snapshot of every registered element in registration order.
    pub fn list_all(&self) -> Vec<RegisteredElement> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .ordered
            .clone()
    }

    /// Registered ids in registration order.
    pub fn ids(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .ordered
            .iter()
            .map(|entry| entry.id.clone())
            .collect()
    }

    /// Number of registered elements.
    pub fn count(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .ordered
            .len()
    }

    /// Let a native plugin register its elements.
    ///
    /// # Errors
    ///
    /// Returns a plugin error wrapping whatever the plugin reported.
    pub fn register_plugin(&self, plugin: &dyn Plugin) -> Result<()> {
        let info = plugin.info();
        debug!("Registering elements of native plugin '{}'", info.name);
        plugin
            .register_elements(self)
            .map_err(|e| crate::plugin_error!("Plugin '{}' failed: {:#}", info.name, e))
    }
}

impl ElementRegistrar for ElementRegistry {
    fn register_element(
        &self,
        id: &str,
        definition: SharedDefinition,
        registerer: &str,
    ) -> guicraft_plugin_api::Result<()> {
        self.register(id, definition, Some(registerer))
            .map_err(anyhow::Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guicraft_plugin_api::{ElementDefinitionBuilder, PluginInfo};
    use std::sync::Arc;

    fn definition(size: i64) -> SharedDefinition {
        Arc::new(
            ElementDefinitionBuilder::new(|_, _, _| Ok(()))
                .default_size(size, size)
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_duplicate_keeps_first_definition() {
        let registry = ElementRegistry::new();
        registry.register("a", definition(3), None).unwrap();

        let err = registry.register("a", definition(9), Some("b.rhai")).unwrap_err();
        assert!(err.to_string().contains("a"));
        assert!(err.is_duplicate_registration());

        let kept = registry.get("a").unwrap();
        assert_eq!(kept.default_value().unwrap().width, 3);
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_list_all_is_insertion_ordered() {
        let registry = ElementRegistry::new();
        for id in ["zeta", "alpha", "mid"] {
            registry.register(id, definition(1), Some("test")).unwrap();
        }
        assert_eq!(registry.ids(), vec!["zeta", "alpha", "mid"]);
        let listed = registry.list_all();
        assert_eq!(listed[1].id, "alpha");
        assert_eq!(listed[1].registerer, "test");
    }

    #[test]
    fn test_unknown_id_is_none() {
        let registry = ElementRegistry::new();
        assert!(registry.get("missing").is_none());
        assert!(!registry.contains("missing"));
    }

    #[test]
    fn test_default_registerer() {
        let registry = ElementRegistry::new();
        registry.register("x", definition(1), None).unwrap();
        assert_eq!(registry.list_all()[0].registerer, DEFAULT_REGISTERER);
    }

    #[test]
    fn test_concurrent_registration_has_one_winner() {
        let registry = Arc::new(ElementRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.register("same", definition(1), None).is_ok())
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(winners, 1);
    }

    struct TwoElements;

    impl Plugin for TwoElements {
        fn info(&self) -> PluginInfo {
            PluginInfo::new("two", "1.0.0", "Two elements", "Tests")
        }

        fn register_elements(
            &self,
            registrar: &dyn ElementRegistrar,
        ) -> guicraft_plugin_api::Result<()> {
            registrar.register_element("one", definition(1), "two")?;
            registrar.register_element("one", definition(2), "two")
        }
    }

    #[test]
    fn test_native_plugin_failure_is_plugin_error() {
        let registry = ElementRegistry::new();
        let err = registry.register_plugin(&TwoElements).unwrap_err();
        assert!(err.is_plugin());
        assert!(registry.contains("one"));
    }
}
