//! # Serialization bridge
//!
//! Converts between the in-memory [`LayoutTree`] and the persisted wire
//! format. Configuration values use an externally tagged union:
//!
//! ```json
//! {"StringValue": "Chest"}
//! {"NumberValue": 3}
//! {"PathValue": {"path": "bg.png", "data": {"width": 1, "height": 1, "data": [0, 0, 0, 255]}}}
//! ```
//!
//! Unset file values are not written at all.

use crate::layout::{CanvasElement, LayoutTree};
use crate::{Error, Result};
use guicraft_plugin_api::{ConfigValue, ConfigValues, DiskFile, ImageData, Rect};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// File extension of persisted layouts.
pub const LAYOUT_EXTENSION: &str = "mcgf";

/// File name used when the base element has no name.
pub const UNNAMED_FILE_NAME: &str = "unnamed.mcgf";

/// A whole layout as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireLayout {
    #[serde(alias = "baseElement")]
    pub base_element: WireElement,
    #[serde(default)]
    pub elements: Vec<WireElement>,
}

impl WireLayout {
    fn all_elements(&self) -> impl Iterator<Item = &WireElement> {
        std::iter::once(&self.base_element).chain(&self.elements)
    }

    /// Refuse numbers JSON cannot represent; they would be written as `null`.
    fn check_finite(&self) -> Result<()> {
        for element in self.all_elements() {
            for (key, value) in &element.data {
                if let WireConfigValue::NumberValue(n) = value {
                    if !n.is_finite() {
                        return Err(Error::validation(
                            key.clone(),
                            format!("{} of {} is not a finite number", n, element.id),
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

/// One element as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireElement {
    pub dimensions: Rect,
    pub id: String,
    #[serde(default)]
    pub data: BTreeMap<String, WireConfigValue>,
    #[serde(default)]
    pub name: String,
}

/// Tagged configuration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WireConfigValue {
    StringValue(String),
    NumberValue(f64),
    PathValue { path: String, data: WireImage },
}

/// Raw RGBA pixels of a file value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Convert a layout to its wire form. Never fails.
pub fn to_wire(tree: &LayoutTree) -> WireLayout {
    WireLayout {
        base_element: element_to_wire(&tree.base),
        elements: tree.elements.iter().map(element_to_wire).collect(),
    }
}

/// Rebuild a layout from its wire form.
///
/// Each file value gets a freshly allocated `width * height * 4` buffer into
/// which as many supplied bytes as fit are copied; a short buffer is padded
/// with zeros, a long one truncated.
///
/// # Errors
///
/// Fails if a number is NaN or infinite, or if a file value would need more
/// than `max_image_bytes`.
///
/// # Example
///
/// ```rust
/// use guicraft_core::bridge::{from_wire, to_wire};
/// use guicraft_core::layout::{CanvasElement, LayoutTree};
/// use guicraft_plugin_api::{ConfigValues, Rect};
///
/// let mut tree = LayoutTree::new(CanvasElement::new("panel", "Chest", Rect::sized(176, 166)));
/// tree.base.config_values = ConfigValues::new().with("rows", 3.0);
///
/// let restored = from_wire(to_wire(&tree), usize::MAX).unwrap();
/// assert_eq!(restored, tree);
/// ```
pub fn from_wire(wire: WireLayout, max_image_bytes: usize) -> Result<LayoutTree> {
    let base = element_from_wire(wire.base_element, max_image_bytes)?;
    let elements = wire
        .elements
        .into_iter()
        .map(|element| element_from_wire(element, max_image_bytes))
        .collect::<Result<Vec<_>>>()?;
    Ok(LayoutTree { base, elements })
}

fn element_to_wire(element: &CanvasElement) -> WireElement {
    WireElement {
        dimensions: element.rect,
        id: element.id.clone(),
        data: element
            .config_values
            .iter()
            .map(|(key, value)| (key.to_string(), value_to_wire(value)))
            .collect(),
        name: element.name.clone(),
    }
}

fn value_to_wire(value: &ConfigValue) -> WireConfigValue {
    match value {
        ConfigValue::String(s) => WireConfigValue::StringValue(s.clone()),
        ConfigValue::Number(n) => WireConfigValue::NumberValue(*n),
        ConfigValue::File(file) => WireConfigValue::PathValue {
            path: file.path.clone(),
            data: WireImage {
                width: file.image.width(),
                height: file.image.height(),
                data: file.image.pixels().to_vec(),
            },
        },
    }
}

fn element_from_wire(element: WireElement, max_image_bytes: usize) -> Result<CanvasElement> {
    let mut config_values = ConfigValues::new();
    for (key, value) in element.data {
        let value = value_from_wire(value, max_image_bytes)
            .map_err(|e| Error::deserialization(format!("{} of {}: {}", key, element.id, e)))?;
        config_values.insert(key, value);
    }
    Ok(CanvasElement {
        id: element.id,
        name: element.name,
        rect: element.dimensions,
        config_values,
    })
}

fn value_from_wire(value: WireConfigValue, max_image_bytes: usize) -> Result<ConfigValue> {
    match value {
        WireConfigValue::StringValue(s) => Ok(ConfigValue::String(s)),
        WireConfigValue::NumberValue(n) if !n.is_finite() => Err(Error::deserialization(format!(
            "{} is not a finite number",
            n
        ))),
        WireConfigValue::NumberValue(n) => Ok(ConfigValue::Number(n)),
        WireConfigValue::PathValue { path, data } => {
            let expected = ImageData::byte_len(data.width, data.height)
                .filter(|len| *len <= max_image_bytes)
                .ok_or_else(|| {
                    Error::deserialization(format!(
                        "image {}x{} exceeds the {} byte limit",
                        data.width, data.height, max_image_bytes
                    ))
                })?;
            if data.data.len() != expected {
                debug!(
                    "Resizing pixel data of {} from {} to {} bytes",
                    path,
                    data.data.len(),
                    expected
                );
            }
            let mut pixels = data.data;
            pixels.resize(expected, 0);
            let image = ImageData::new(data.width, data.height, pixels)?;
            Ok(ConfigValue::File(DiskFile::new(path, image)))
        }
    }
}

/// Default save file name for a layout whose base element is called `base_name`.
///
/// # Example
///
/// ```rust
/// use guicraft_core::bridge::default_file_name;
///
/// assert_eq!(default_file_name("Chest"), "Chest.mcgf");
/// assert_eq!(default_file_name(""), "unnamed.mcgf");
/// ```
pub fn default_file_name(base_name: &str) -> String {
    if base_name.is_empty() {
        UNNAMED_FILE_NAME.to_string()
    } else {
        format!("{}.{}", base_name, LAYOUT_EXTENSION)
    }
}

/// Reads and writes layout files.
pub struct LayoutFile;

impl LayoutFile {
    /// Read a layout file.
    ///
    /// # Errors
    ///
    /// Returns I/O or JSON errors verbatim.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<WireLayout> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let wire = serde_json::from_str(&content)?;
        info!("Read layout from {}", path.display());
        Ok(wire)
    }

    /// Write a layout file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Fails without touching the file if a number is NaN or infinite.
    /// Otherwise returns I/O or JSON errors verbatim.
    pub fn write<P: AsRef<Path>>(path: P, wire: &WireLayout) -> Result<()> {
        let path = path.as_ref();
        wire.check_finite()?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string(wire)?;
        std::fs::write(path, content)?;
        info!("Wrote layout to {}", path.display());
        Ok(())
    }
}
