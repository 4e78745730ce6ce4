//! # Layout tree and dimension validation
//!
//! A [`LayoutTree`] is one base element, pinned to the origin, plus an ordered
//! list of child elements placed on top of it. Later children render and
//! hit-test above earlier ones.
//!
//! Element definitions constrain their own size through
//! `validate_dimensions`. The functions in this module run those constraints
//! and then keep every child inside the base bounds. Validators are foreign
//! code: when one fails, the rectangle it was given is kept and the failure is
//! logged.

use crate::registry::ElementRegistry;
use crate::Result;
use guicraft_plugin_api::{
    try_call, Color, ConfigValues, ElementDefinition, Rect, SharedDefinition, Surface,
};
use tracing::{debug, error, warn};

/// Outline color of the selected element on the editor canvas.
pub const SELECTION_COLOR: Color = Color::rgb(0xff, 0, 0);

/// Which element of a layout an operation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selection {
    /// The base element.
    Base,
    /// The child at this index.
    Element(usize),
}

/// A placed, user-configured element.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasElement {
    /// Registry id of the definition. May not resolve.
    pub id: String,
    /// Display label; empty means none.
    pub name: String,
    pub rect: Rect,
    pub config_values: ConfigValues,
}

impl CanvasElement {
    pub fn new<I: Into<String>, N: Into<String>>(id: I, name: N, rect: Rect) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            rect,
            config_values: ConfigValues::new(),
        }
    }

    /// Instantiate `definition` at `(x, y)` with its default size and
    /// configuration. File inputs always start unset.
    ///
    /// # Errors
    ///
    /// Fails if the definition cannot produce a default value.
    pub fn from_definition(
        id: &str,
        name: &str,
        x: i64,
        y: i64,
        definition: &dyn ElementDefinition,
    ) -> Result<Self> {
        let default = definition
            .default_value()
            .map_err(|e| crate::layout_error!("Element {} has no default value: {:#}", id, e))?;

        let mut config_values = default.config_values;
        let schema = definition.config_schema();
        for key in schema.file_keys() {
            config_values.set_file(key, None);
        }

        Ok(Self {
            id: id.to_string(),
            name: name.to_string(),
            rect: Rect::new(x, y, default.width, default.height),
            config_values,
        })
    }

    /// The display label, if there is one.
    pub fn display_name(&self) -> Option<&str> {
        if self.name.is_empty() {
            None
        } else {
            Some(&self.name)
        }
    }
}

/// One base surface plus an ordered list of children.
///
/// # Example
///
/// ```rust
/// use guicraft_core::layout::{CanvasElement, LayoutTree, Selection};
/// use guicraft_plugin_api::Rect;
///
/// let mut tree = LayoutTree::new(CanvasElement::new("panel", "", Rect::sized(100, 50)));
/// tree.elements.push(CanvasElement::new("slot", "", Rect::new(10, 10, 18, 18)));
///
/// assert_eq!(tree.hit_test(12, 12), Some(Selection::Element(0)));
/// assert_eq!(tree.hit_test(90, 40), Some(Selection::Base));
/// assert_eq!(tree.hit_test(100, 0), None);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutTree {
    pub base: CanvasElement,
    pub elements: Vec<CanvasElement>,
}

impl LayoutTree {
    pub fn new(base: CanvasElement) -> Self {
        Self {
            base,
            elements: Vec::new(),
        }
    }

    pub fn get(&self, selection: Selection) -> Option<&CanvasElement> {
        match selection {
            Selection::Base => Some(&self.base),
            Selection::Element(index) => self.elements.get(index),
        }
    }

    pub fn get_mut(&mut self, selection: Selection) -> Option<&mut CanvasElement> {
        match selection {
            Selection::Base => Some(&mut self.base),
            Selection::Element(index) => self.elements.get_mut(index),
        }
    }

    /// Re-validate the base and then every child in index order.
    pub fn validate(&mut self, registry: &ElementRegistry) {
        let definition = registry.get(&self.base.id);
        let mut rect = self.base.rect;
        rect.width = rect.width.max(1);
        rect.height = rect.height.max(1);
        rect = rect.with_position(0, 0);

        match &definition {
            Some(definition) => rect = run_validator(definition.as_ref(), &self.base.id, rect),
            None => debug!("Base element {} is not registered", self.base.id),
        }

        rect = rect.with_position(0, 0);
        rect.width = rect.width.max(1);
        rect.height = rect.height.max(1);
        self.base.rect = rect;

        for index in 0..self.elements.len() {
            self.validate_element(index, registry);
        }
    }

    /// Re-validate one child against the base bounds.
    ///
    /// The child's validator runs exactly twice: once on the raw rectangle and
    /// once after it was slid back inside the base. The validator never moves
    /// the element. If the validated size does not fit into the base at all,
    /// the size is cut down to the base size.
    pub fn validate_element(&mut self, index: usize, registry: &ElementRegistry) {
        let Some(element) = self.elements.get(index) else {
            return;
        };
        let definition = registry.get(&element.id);
        if definition.is_none() {
            debug!("Element #{} ({}) is not registered", index, element.id);
        }
        let bounds = self.base.rect;
        let rect = constrain_child(definition.as_ref(), &element.id, element.rect, bounds);
        self.elements[index].rect = rect;
    }

    /// Re-validate whatever `selection` points at. Validating the base
    /// re-validates every child as well.
    pub fn validate_selection(&mut self, selection: Selection, registry: &ElementRegistry) {
        match selection {
            Selection::Base => self.validate(registry),
            Selection::Element(index) => self.validate_element(index, registry),
        }
    }

    /// Lines describing every element id that does not resolve.
    pub fn missing_elements(&self, registry: &ElementRegistry) -> Vec<String> {
        let mut missing = Vec::new();
        if !registry.contains(&self.base.id) {
            missing.push(format!(
                "Unknown Element for the Base Element: {}",
                self.base.id
            ));
        }
        for (index, element) in self.elements.iter().enumerate() {
            if registry.contains(&element.id) {
                continue;
            }
            let label = element
                .display_name()
                .map(|name| format!(" ({})", name))
                .unwrap_or_default();
            missing.push(format!(
                "Unknown Element for Element #{}{}: {}",
                index, label, element.id
            ));
        }
        missing
    }

    /// The element under `(x, y)`.
    ///
    /// Children are searched from the top-most down. A point inside the base
    /// but outside every child selects the base; a point outside the base
    /// selects nothing.
    pub fn hit_test(&self, x: i64, y: i64) -> Option<Selection> {
        if !self.base.rect.contains(x, y) {
            return None;
        }
        let hit = self
            .elements
            .iter()
            .rposition(|element| element.rect.contains(x, y))
            .map(Selection::Element);
        Some(hit.unwrap_or(Selection::Base))
    }

    /// Draw the base and then every child, offset by `origin`.
    ///
    /// An element whose id does not resolve or whose render fails is skipped;
    /// the rest of the layout is still drawn.
    pub fn render(&self, surface: &mut dyn Surface, registry: &ElementRegistry, origin: (i64, i64)) {
        for element in std::iter::once(&self.base).chain(self.elements.iter()) {
            render_element(surface, registry.get(&element.id), element, origin);
        }
    }

    /// Draw a 1px outline just outside `selection`, offset by `origin`.
    pub fn render_selection(&self, surface: &mut dyn Surface, selection: Selection, origin: (i64, i64)) {
        let Some(element) = self.get(selection) else {
            return;
        };
        let rect = element.rect;
        let x = rect.x + origin.0 - 1;
        let y = rect.y + origin.1 - 1;
        let width = rect.width + 2;
        let height = rect.height + 2;

        surface.fill_rect(Rect::new(x, y, width, 1), SELECTION_COLOR);
        surface.fill_rect(Rect::new(x, y + height - 1, width, 1), SELECTION_COLOR);
        surface.fill_rect(Rect::new(x, y, 1, height), SELECTION_COLOR);
        surface.fill_rect(Rect::new(x + width - 1, y, 1, height), SELECTION_COLOR);
    }
}

/// Run the single-child validation against `bounds`.
///
/// `definition` is `None` for a dangling id; the geometric clamps still apply.
pub fn constrain_child(
    definition: Option<&SharedDefinition>,
    id: &str,
    rect: Rect,
    bounds: Rect,
) -> Rect {
    let mut rect = rect;
    rect.width = rect.width.max(1);
    rect.height = rect.height.max(1);
    rect.x = rect.x.max(0);
    rect.y = rect.y.max(0);

    let (x, y) = (rect.x, rect.y);
    if let Some(definition) = definition {
        rect = run_validator(definition.as_ref(), id, rect).with_position(x, y);
    }

    if rect.right() > bounds.width {
        rect.x = bounds.width - rect.width;
    }
    if rect.bottom() > bounds.height {
        rect.y = bounds.height - rect.height;
    }
    rect.x = rect.x.max(0);
    rect.y = rect.y.max(0);

    let (x, y) = (rect.x, rect.y);
    if let Some(definition) = definition {
        rect = run_validator(definition.as_ref(), id, rect).with_position(x, y);
    }

    // containment wins over the element's own minimum size
    rect.width = rect.width.clamp(1, bounds.width.max(1));
    rect.height = rect.height.clamp(1, bounds.height.max(1));
    rect.x = rect.x.clamp(0, (bounds.width - rect.width).max(0));
    rect.y = rect.y.clamp(0, (bounds.height - rect.height).max(0));
    rect
}

fn run_validator(definition: &dyn ElementDefinition, id: &str, rect: Rect) -> Rect {
    match try_call(Some(|| definition.validate_dimensions(rect))) {
        Some(validated) => validated,
        None => {
            warn!("validate_dimensions of {} failed; keeping {:?}", id, rect);
            rect
        }
    }
}

fn render_element(
    surface: &mut dyn Surface,
    definition: Option<SharedDefinition>,
    element: &CanvasElement,
    origin: (i64, i64),
) {
    let Some(definition) = definition else {
        debug!("Skipping unregistered element {}", element.id);
        return;
    };
    let rect = element
        .rect
        .with_position(element.rect.x + origin.0, element.rect.y + origin.1);
    if let Err(e) = definition.render(surface, rect, &element.config_values) {
        error!("Failed to render element {}: {:#}", element.id, e);
    }
}
