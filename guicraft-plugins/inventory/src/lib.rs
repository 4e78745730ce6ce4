//! # Guicraft Inventory
//!
//! The built-in elements every layout can use: an item slot, a bare inventory
//! panel and the player inventory composed from the two.
//!
//! ```rust
//! use guicraft_inventory::{InventoryPlugin, EMPTY_INVENTORY_ID};
//! use guicraft_core::ElementRegistry;
//!
//! let registry = ElementRegistry::new();
//! registry.register_plugin(&InventoryPlugin::new().unwrap()).unwrap();
//! assert!(registry.contains(EMPTY_INVENTORY_ID));
//! ```

pub mod empty_inventory;
pub mod normal_inventory;
pub mod pixel_art;
pub mod slot;

pub use empty_inventory::empty_inventory_element;
pub use normal_inventory::normal_inventory_element;
pub use slot::slot_element;

use guicraft_plugin_api::{ElementRegistrar, Plugin, PluginInfo, Result, SharedDefinition};
use std::sync::Arc;
use tracing::debug;

pub const SLOT_ID: &str = "slotElement";
pub const EMPTY_INVENTORY_ID: &str = "emptyInventoryElement";
pub const NORMAL_INVENTORY_ID: &str = "normalInventoryElement";

/// Registers the built-in elements.
pub struct InventoryPlugin {
    elements: Vec<(String, SharedDefinition)>,
}

impl InventoryPlugin {
    /// Build all definitions.
    ///
    /// # Errors
    ///
    /// Fails only if a built-in sprite is malformed.
    pub fn new() -> Result<Self> {
        let slot: SharedDefinition = Arc::new(slot_element()?);
        let panel: SharedDefinition = Arc::new(empty_inventory_element()?);
        let inventory: SharedDefinition =
            Arc::new(normal_inventory_element(panel.clone(), slot.clone())?);
        Ok(Self {
            elements: vec![
                (SLOT_ID.to_string(), slot),
                (EMPTY_INVENTORY_ID.to_string(), panel),
                (NORMAL_INVENTORY_ID.to_string(), inventory),
            ],
        })
    }

    /// The definitions by id, in registration order.
    pub fn elements(&self) -> &[(String, SharedDefinition)] {
        &self.elements
    }
}

impl Plugin for InventoryPlugin {
    fn info(&self) -> PluginInfo {
        PluginInfo::new(
            "inventory",
            env!("CARGO_PKG_VERSION"),
            "Inventory panels and item slots",
            "Guicraft Team",
        )
    }

    fn register_elements(&self, registrar: &dyn ElementRegistrar) -> Result<()> {
        for (id, definition) in &self.elements {
            registrar.register_element(id, definition.clone(), "inventory")?;
        }
        debug!("Registered {} inventory elements", self.elements.len());
        Ok(())
    }
}

/// The built-in definitions, for exposing to script plugins.
///
/// # Errors
///
/// See [`InventoryPlugin::new`].
pub fn builtins() -> Result<Vec<(String, SharedDefinition)>> {
    Ok(InventoryPlugin::new()?.elements)
}
