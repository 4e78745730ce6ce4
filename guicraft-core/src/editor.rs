//! # Editing session
//!
//! [`EditorSession`] owns the live [`LayoutTree`] and the current selection
//! and offers the editing operations of the canvas UI as plain methods.
//! Every mutation re-validates the part of the tree it touched.

use crate::bridge::{from_wire, to_wire, WireLayout};
use crate::layout::{CanvasElement, LayoutTree, Selection};
use crate::registry::ElementRegistry;
use crate::{Error, Result};
use guicraft_plugin_api::{
    ConfigFieldKind, ConfigValue, ElementDefinition, PixelBuffer, Rect, SharedDefinition, Surface,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Step of a plain arrow-key move or resize.
pub const SMALL_STEP: i64 = 1;

/// Step of a move or resize with shift held.
pub const LARGE_STEP: i64 = 10;

/// Largest image (width * height) a session renders unless told otherwise.
pub const DEFAULT_MAX_RENDER_PIXELS: u64 = 8192 * 8192;

/// Keyboard-level editing commands applied to the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditCommand {
    /// Remove the selected child. The base cannot be deleted.
    Delete,
    /// Move the selected child. The base cannot be moved.
    Move { dx: i64, dy: i64 },
    /// Grow or shrink the selected element.
    Resize { dw: i64, dh: i64 },
}

/// A live editing session over one layout.
///
/// # Example
///
/// ```rust
/// use guicraft_core::editor::EditorSession;
/// use guicraft_core::layout::Selection;
/// use guicraft_core::ElementRegistry;
/// use guicraft_plugin_api::{ElementDefinitionBuilder, Rect};
/// use std::sync::Arc;
///
/// let registry = Arc::new(ElementRegistry::new());
/// let panel = ElementDefinitionBuilder::new(|_, _, _| Ok(())).default_size(40, 30).build().unwrap();
/// let slot = ElementDefinitionBuilder::new(|_, _, _| Ok(())).default_size(18, 18).build().unwrap();
/// registry.register("panel", Arc::new(panel), None).unwrap();
/// registry.register("slot", Arc::new(slot), None).unwrap();
///
/// let mut session = EditorSession::new(registry, "panel").unwrap();
/// let index = session.add_element("slot", "", 30, 0).unwrap();
///
/// // pushed back inside the 40x30 base
/// assert_eq!(session.layout().elements[index].rect, Rect::new(22, 0, 18, 18));
/// assert_eq!(session.hit_test(25, 5), Some(Selection::Element(index)));
/// ```
pub struct EditorSession {
    registry: Arc<ElementRegistry>,
    layout: LayoutTree,
    selection: Option<Selection>,
    max_render_pixels: u64,
}

impl EditorSession {
    /// Start with a fresh layout whose base is `base_id` at its default size
    /// and with no name.
    ///
    /// # Errors
    ///
    /// Fails if `base_id` is not registered or has no default value.
    pub fn new(registry: Arc<ElementRegistry>, base_id: &str) -> Result<Self> {
        let definition = lookup(&registry, base_id)?;
        let base = CanvasElement::from_definition(base_id, "", 0, 0, definition.as_ref())?;
        Ok(Self::with_layout(registry, LayoutTree::new(base)))
    }

    /// Wrap an existing layout. The layout is validated first.
    pub fn with_layout(registry: Arc<ElementRegistry>, layout: LayoutTree) -> Self {
        let mut layout = layout;
        layout.validate(&registry);
        Self {
            registry,
            layout,
            selection: None,
            max_render_pixels: DEFAULT_MAX_RENDER_PIXELS,
        }
    }

    /// Refuse to render images with more than `max_pixels` pixels.
    pub fn with_render_limit(mut self, max_pixels: u64) -> Self {
        self.max_render_pixels = max_pixels;
        self
    }

    pub fn registry(&self) -> &Arc<ElementRegistry> {
        &self.registry
    }

    pub fn layout(&self) -> &LayoutTree {
        &self.layout
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    /// Change the selection. Selecting a child that does not exist clears it.
    pub fn select(&mut self, selection: Option<Selection>) {
        self.selection = selection.filter(|s| self.layout.get(*s).is_some());
    }

    /// Replace the layout with an empty one based on `base_id`.
    ///
    /// The base gets the requested size, run through the definition's
    /// `validate_dimensions`.
    ///
    /// # Errors
    ///
    /// Fails (leaving the session unchanged) if the id is unknown, the
    /// definition has no default or its validator rejects the size.
    pub fn new_layout(&mut self, base_id: &str, name: &str, width: i64, height: i64) -> Result<()> {
        let definition = lookup(&self.registry, base_id)?;
        let mut base = CanvasElement::from_definition(base_id, name, 0, 0, definition.as_ref())?;
        base.rect = definition
            .validate_dimensions(base.rect.with_size(width, height))
            .map_err(|e| crate::layout_error!("{} rejected {}x{}: {:#}", base_id, width, height, e))?;

        let mut layout = LayoutTree::new(base);
        layout.validate(&self.registry);
        info!(
            "Created new layout based on {} ({}x{})",
            base_id, layout.base.rect.width, layout.base.rect.height
        );
        self.layout = layout;
        self.selection = None;
        Ok(())
    }

    /// Place a new `id` element at `(x, y)` with its default size and
    /// configuration, select it and return its index.
    ///
    /// # Errors
    ///
    /// Fails if the id is unknown or has no default value.
    pub fn add_element(&mut self, id: &str, name: &str, x: i64, y: i64) -> Result<usize> {
        let definition = lookup(&self.registry, id)?;
        let element = CanvasElement::from_definition(id, name, x, y, definition.as_ref())?;
        self.layout.elements.push(element);
        let index = self.layout.elements.len() - 1;
        self.layout.validate_element(index, &self.registry);
        self.selection = Some(Selection::Element(index));
        debug!("Added {} as element #{}", id, index);
        Ok(index)
    }

    /// Remove child `index`. The selection follows the remaining elements.
    ///
    /// # Errors
    ///
    /// Fails if there is no such child.
    pub fn remove_element(&mut self, index: usize) -> Result<CanvasElement> {
        if index >= self.layout.elements.len() {
            return Err(Error::not_found(format!("element #{}", index)));
        }
        let removed = self.layout.elements.remove(index);
        self.selection = match self.selection {
            Some(Selection::Element(selected)) if selected == index => None,
            Some(Selection::Element(selected)) if selected > index => {
                Some(Selection::Element(selected - 1))
            }
            other => other,
        };
        Ok(removed)
    }

    /// Move child `index` by `(dx, dy)`.
    ///
    /// # Errors
    ///
    /// Fails if there is no such child.
    pub fn nudge(&mut self, index: usize, dx: i64, dy: i64) -> Result<()> {
        let element = self
            .layout
            .elements
            .get_mut(index)
            .ok_or_else(|| Error::not_found(format!("element #{}", index)))?;
        element.rect.x = element.rect.x.saturating_add(dx);
        element.rect.y = element.rect.y.saturating_add(dy);
        self.layout.validate_element(index, &self.registry);
        Ok(())
    }

    /// Grow or shrink `target` by `(dw, dh)`.
    ///
    /// # Errors
    ///
    /// Fails if `target` does not exist.
    pub fn resize(&mut self, target: Selection, dw: i64, dh: i64) -> Result<()> {
        let element = self.element_mut(target)?;
        element.rect.width = element.rect.width.saturating_add(dw);
        element.rect.height = element.rect.height.saturating_add(dh);
        self.layout.validate_selection(target, &self.registry);
        Ok(())
    }

    /// Set the rectangle of `target` directly, as typed into the inspector.
    /// The base stays pinned to the origin.
    ///
    /// # Errors
    ///
    /// Fails if `target` does not exist.
    pub fn set_rect(&mut self, target: Selection, rect: Rect) -> Result<()> {
        self.element_mut(target)?.rect = rect;
        self.layout.validate_selection(target, &self.registry);
        Ok(())
    }

    /// Change the display name of `target`.
    ///
    /// # Errors
    ///
    /// Fails if `target` does not exist.
    pub fn rename(&mut self, target: Selection, name: &str) -> Result<()> {
        self.element_mut(target)?.name = name.to_string();
        Ok(())
    }

    /// Swap the base element's definition, keeping its name and size.
    ///
    /// The configuration starts over from the new definition's defaults and
    /// the whole tree is re-validated.
    ///
    /// # Errors
    ///
    /// Fails (leaving the layout unchanged) if the id is unknown or has no
    /// default value.
    pub fn set_base_element(&mut self, id: &str) -> Result<()> {
        let definition = lookup(&self.registry, id)?;
        let mut base = CanvasElement::from_definition(id, &self.layout.base.name, 0, 0, definition.as_ref())?;
        base.rect = base
            .rect
            .with_size(self.layout.base.rect.width, self.layout.base.rect.height);
        self.layout.base = base;
        self.layout.validate(&self.registry);
        info!("Base element is now {}", id);
        Ok(())
    }

    /// Set or unset one configuration value of `target`.
    ///
    /// The value must match the schema entry for `key`: bounded numbers are
    /// clamped and choices must name an option. Only file values can be
    /// unset (`None`).
    ///
    /// # Errors
    ///
    /// Fails if `target` or its definition is missing, `key` is not in the
    /// schema or the value does not fit the field.
    pub fn set_config_value(
        &mut self,
        target: Selection,
        key: &str,
        value: Option<ConfigValue>,
    ) -> Result<()> {
        let id = self
            .layout
            .get(target)
            .map(|element| element.id.clone())
            .ok_or_else(|| Error::not_found(format!("{:?}", target)))?;
        let definition = lookup(&self.registry, &id)?;
        let schema = definition.config_schema();
        let spec = schema
            .get(key)
            .ok_or_else(|| Error::validation(key.to_string(), format!("{} has no such setting", id)))?;

        let element = self.element_mut(target)?;
        match value {
            None if spec.kind == ConfigFieldKind::FileInput => {
                element.config_values.set_file(key, None);
            }
            None => {
                return Err(Error::validation(
                    key.to_string(),
                    "only file settings can be unset".to_string(),
                ))
            }
            Some(value) => {
                let value = spec
                    .coerce(value)
                    .map_err(|e| Error::validation(key.to_string(), format!("{:#}", e)))?;
                element.config_values.insert(key, value);
            }
        }
        Ok(())
    }

    /// Apply a keyboard command to the current selection. Returns whether
    /// anything changed.
    pub fn apply(&mut self, command: EditCommand) -> bool {
        let Some(selection) = self.selection else {
            return false;
        };
        let result = match (command, selection) {
            (EditCommand::Delete, Selection::Element(index)) => self.remove_element(index).map(|_| ()),
            (EditCommand::Move { dx, dy }, Selection::Element(index)) => self.nudge(index, dx, dy),
            (EditCommand::Resize { dw, dh }, target) => self.resize(target, dw, dh),
            (_, Selection::Base) => return false,
        };
        result.is_ok()
    }

    /// The element under `(x, y)` in layout coordinates.
    pub fn hit_test(&self, x: i64, y: i64) -> Option<Selection> {
        self.layout.hit_test(x, y)
    }

    /// Draw the layout onto `surface` at the origin.
    pub fn render(&self, surface: &mut dyn Surface) {
        self.layout.render(surface, &self.registry, (0, 0));
    }

    /// Render the layout into an image the size of its base.
    ///
    /// # Errors
    ///
    /// Fails before allocating anything if the image would exceed the
    /// session's render limit.
    pub fn render_image(&self) -> Result<PixelBuffer> {
        let base = self.layout.base.rect;
        let mut buffer = self.buffer(base.width, base.height)?;
        self.render(&mut buffer);
        Ok(buffer)
    }

    /// Draw the layout the way the editor canvas shows it: a one pixel margin
    /// around the base and a red outline around the selection.
    ///
    /// # Errors
    ///
    /// Same limit as [`render_image`](Self::render_image).
    pub fn render_canvas(&self) -> Result<PixelBuffer> {
        let base = self.layout.base.rect;
        let mut buffer = self.buffer(base.width.saturating_add(2), base.height.saturating_add(2))?;
        self.layout.render(&mut buffer, &self.registry, (1, 1));
        if let Some(selection) = self.selection {
            self.layout.render_selection(&mut buffer, selection, (1, 1));
        }
        Ok(buffer)
    }

    fn buffer(&self, width: i64, height: i64) -> Result<PixelBuffer> {
        let too_large = || {
            Error::render(format!(
                "{}x{} exceeds the {} pixel render limit",
                width, height, self.max_render_pixels
            ))
        };
        let w = u32::try_from(width).map_err(|_| too_large())?;
        let h = u32::try_from(height).map_err(|_| too_large())?;
        if u64::from(w) * u64::from(h) > self.max_render_pixels {
            return Err(too_large());
        }
        Ok(PixelBuffer::new(w, h))
    }

    /// Detached wire copy of the layout.
    pub fn to_wire(&self) -> WireLayout {
        to_wire(&self.layout)
    }

    /// Replace the layout with a loaded one.
    ///
    /// # Errors
    ///
    /// Fails without touching the live layout if the wire data cannot be
    /// decoded or references element ids that are not registered; in the
    /// latter case every unresolved reference is listed.
    pub fn apply_loaded(&mut self, wire: WireLayout, max_image_bytes: usize) -> Result<()> {
        let layout = decode(&self.registry, wire, max_image_bytes)?;
        info!("Loaded layout with {} elements", layout.elements.len());
        self.layout = layout;
        self.selection = None;
        Ok(())
    }

    /// Open a session directly on loaded wire data.
    ///
    /// # Errors
    ///
    /// Same as [`apply_loaded`](Self::apply_loaded).
    pub fn open(registry: Arc<ElementRegistry>, wire: WireLayout, max_image_bytes: usize) -> Result<Self> {
        let layout = decode(&registry, wire, max_image_bytes)?;
        Ok(Self {
            registry,
            layout,
            selection: None,
            max_render_pixels: DEFAULT_MAX_RENDER_PIXELS,
        })
    }

    fn element_mut(&mut self, target: Selection) -> Result<&mut CanvasElement> {
        self.layout
            .get_mut(target)
            .ok_or_else(|| Error::not_found(format!("{:?}", target)))
    }
}

fn decode(registry: &ElementRegistry, wire: WireLayout, max_image_bytes: usize) -> Result<LayoutTree> {
    let mut layout = from_wire(wire, max_image_bytes)?;
    let missing = layout.missing_elements(registry);
    if !missing.is_empty() {
        return Err(Error::missing_elements(missing));
    }
    layout.validate(registry);
    Ok(layout)
}

fn lookup(registry: &ElementRegistry, id: &str) -> Result<SharedDefinition> {
    registry
        .get(id)
        .ok_or_else(|| Error::not_found(format!("element {}", id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::WireConfigValue;
    use guicraft_plugin_api::{
        ChoiceOption, Color, ConfigFieldSpec, ConfigSchema, ConfigValues, DiskFile,
        ElementDefinitionBuilder, ImageData,
    };

    fn registry() -> Arc<ElementRegistry> {
        let registry = Arc::new(ElementRegistry::new());
        let panel = ElementDefinitionBuilder::new(|surface, rect, _| {
            surface.fill_rect(rect, Color::rgb(0xc6, 0xc6, 0xc6));
            Ok(())
        })
        .default_size(50, 40)
        .minimum_size(8, 8)
        .build()
        .unwrap();
        let slot = ElementDefinitionBuilder::new(|surface, rect, _| {
            surface.fill_rect(rect, Color::rgb(0x8b, 0x8b, 0x8b));
            Ok(())
        })
        .default_size(18, 18)
        .minimum_size(2, 2)
        .config(
            ConfigSchema::new()
                .with_field("background_file", ConfigFieldSpec::file())
                .with_field("count", ConfigFieldSpec::bounded(1.0, 64.0).unwrap())
                .with_field(
                    "style",
                    ConfigFieldSpec::dropdown(vec![ChoiceOption::new("dark"), ChoiceOption::new("light")]),
                ),
        )
        .default_value(ConfigValues::new().with("count", 1.0).with("style", "dark"))
        .build()
        .unwrap();
        registry.register("panel", Arc::new(panel), None).unwrap();
        registry.register("slot", Arc::new(slot), None).unwrap();
        registry
    }

    fn session() -> EditorSession {
        EditorSession::new(registry(), "panel").unwrap()
    }

    #[test]
    fn test_new_session_uses_default_size() {
        let session = session();
        assert_eq!(session.layout().base.rect, Rect::sized(50, 40));
        assert!(session.layout().elements.is_empty());
        assert!(session.selection().is_none());
    }

    #[test]
    fn test_unknown_base_rejected() {
        assert!(EditorSession::new(registry(), "missing").is_err());
    }

    #[test]
    fn test_new_layout_applies_minimum() {
        let mut session = session();
        session.add_element("slot", "", 0, 0).unwrap();
        session.new_layout("panel", "Furnace", 4, 100).unwrap();

        assert_eq!(session.layout().base.rect, Rect::sized(8, 100));
        assert_eq!(session.layout().base.name, "Furnace");
        assert!(session.layout().elements.is_empty());
        assert!(session.selection().is_none());
    }

    #[test]
    fn test_add_element_selects_and_clamps() {
        let mut session = session();
        let index = session.add_element("slot", "Fuel", 45, 39).unwrap();

        assert_eq!(session.selection(), Some(Selection::Element(index)));
        assert_eq!(session.layout().elements[index].rect, Rect::new(32, 22, 18, 18));
        assert_eq!(
            session.layout().elements[index].config_values.get_number("count"),
            Some(1.0)
        );
    }

    #[test]
    fn test_remove_element_shifts_selection() {
        let mut session = session();
        session.add_element("slot", "a", 0, 0).unwrap();
        session.add_element("slot", "b", 20, 0).unwrap();
        session.select(Some(Selection::Element(1)));

        let removed = session.remove_element(0).unwrap();
        assert_eq!(removed.name, "a");
        assert_eq!(session.selection(), Some(Selection::Element(0)));

        session.remove_element(0).unwrap();
        assert_eq!(session.selection(), None);
        assert!(session.remove_element(0).is_err());
    }

    #[test]
    fn test_nudge_stays_inside_base() {
        let mut session = session();
        let index = session.add_element("slot", "", 0, 0).unwrap();
        session.nudge(index, -10, 5).unwrap();
        assert_eq!(session.layout().elements[index].rect, Rect::new(0, 5, 18, 18));
        session.nudge(index, 100, 100).unwrap();
        assert_eq!(session.layout().elements[index].rect, Rect::new(32, 22, 18, 18));
    }

    #[test]
    fn test_commands_leave_base_in_place() {
        let mut session = session();
        session.select(Some(Selection::Base));
        assert!(!session.apply(EditCommand::Move { dx: 5, dy: 5 }));
        assert!(!session.apply(EditCommand::Delete));
        assert!(session.apply(EditCommand::Resize { dw: LARGE_STEP, dh: -SMALL_STEP }));
        assert_eq!(session.layout().base.rect, Rect::sized(60, 39));
    }

    #[test]
    fn test_shrinking_base_revalidates_children() {
        let mut session = session();
        let index = session.add_element("slot", "", 30, 20).unwrap();
        session.resize(Selection::Base, -30, -20).unwrap();
        assert_eq!(session.layout().base.rect, Rect::sized(20, 20));
        assert_eq!(session.layout().elements[index].rect, Rect::new(2, 2, 18, 18));
    }

    #[test]
    fn test_set_base_element_keeps_size_and_name() {
        let mut session = session();
        session.rename(Selection::Base, "Chest").unwrap();
        session.set_base_element("slot").unwrap();

        let base = &session.layout().base;
        assert_eq!(base.id, "slot");
        assert_eq!(base.name, "Chest");
        assert_eq!(base.rect, Rect::sized(50, 40));
        assert_eq!(base.config_values.get_str("style"), Some("dark"));
        assert!(session.set_base_element("missing").is_err());
    }

    #[test]
    fn test_config_values_are_checked() {
        let mut session = session();
        let target = Selection::Element(session.add_element("slot", "", 0, 0).unwrap());

        session
            .set_config_value(target, "count", Some(ConfigValue::Number(500.0)))
            .unwrap();
        assert_eq!(
            session.layout().elements[0].config_values.get_number("count"),
            Some(64.0)
        );

        let err = session
            .set_config_value(target, "style", Some(ConfigValue::from("neon")))
            .unwrap_err();
        assert!(err.is_validation());
        assert!(session
            .set_config_value(target, "count", Some(ConfigValue::from("ten")))
            .is_err());
        assert!(session.set_config_value(target, "count", None).is_err());
        assert!(session
            .set_config_value(target, "unknown", Some(ConfigValue::Number(1.0)))
            .is_err());

        let file = DiskFile::new("bg.png", ImageData::blank(1, 1));
        session
            .set_config_value(target, "background_file", Some(ConfigValue::File(file)))
            .unwrap();
        session.set_config_value(target, "background_file", None).unwrap();
        assert!(!session.layout().elements[0]
            .config_values
            .contains_key("background_file"));
    }

    #[test]
    fn test_render_canvas_outlines_selection() {
        let mut session = session();
        session.new_layout("panel", "", 10, 10).unwrap();
        session.select(Some(Selection::Base));

        let canvas = session.render_canvas().unwrap();
        assert_eq!((canvas.width(), canvas.height()), (12, 12));
        assert_eq!(canvas.pixel(0, 0), Some([255, 0, 0, 255]));
        assert_eq!(canvas.pixel(1, 1), Some([0xc6, 0xc6, 0xc6, 255]));
        assert_eq!(canvas.pixel(11, 11), Some([255, 0, 0, 255]));
    }

    #[test]
    fn test_render_limit() {
        let mut session = session();
        session.new_layout("panel", "", 100_000, 100_000).unwrap();
        assert_eq!(session.render_image().unwrap_err().category(), "Render");
        assert_eq!(session.render_canvas().unwrap_err().category(), "Render");

        let session = session.with_render_limit(144);
        assert!(session.render_image().is_err());
        let mut small = EditorSession::new(registry(), "panel").unwrap().with_render_limit(144);
        small.new_layout("panel", "", 12, 12).unwrap();
        let image = small.render_image().unwrap();
        assert_eq!((image.width(), image.height()), (12, 12));
        assert_eq!(image.pixel(11, 11), Some([0xc6, 0xc6, 0xc6, 255]));
        assert!(small.render_canvas().is_err());
    }

    #[test]
    fn test_apply_loaded_is_all_or_nothing() {
        let mut session = session();
        session.add_element("slot", "", 0, 0).unwrap();
        let before = session.layout().clone();

        let mut wire = session.to_wire();
        wire.elements[0].id = "ghost".to_string();
        wire.elements.push(wire.elements[0].clone());
        wire.elements[1].name = "Named".to_string();

        let err = session.apply_loaded(wire, usize::MAX).unwrap_err();
        assert!(err.is_missing_elements());
        assert_eq!(
            err.to_string(),
            "Missing Elements (Are all required plugins loaded?):\n\
             Unknown Element for Element #0: ghost\n\
             Unknown Element for Element #1 (Named): ghost"
        );
        assert_eq!(session.layout(), &before);
    }

    #[test]
    fn test_apply_loaded_validates() {
        let mut session = session();
        session.add_element("slot", "", 0, 0).unwrap();
        let mut wire = session.to_wire();
        wire.elements[0].dimensions = Rect::new(45, 0, 1, 1);
        wire.elements[0]
            .data
            .insert("count".to_string(), WireConfigValue::NumberValue(3.0));

        session.apply_loaded(wire, usize::MAX).unwrap();
        assert_eq!(session.layout().elements[0].rect, Rect::new(45, 0, 2, 2));
        assert_eq!(
            session.layout().elements[0].config_values.get_number("count"),
            Some(3.0)
        );
    }
}
