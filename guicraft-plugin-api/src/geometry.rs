//! Rectangle type and the minimum-size helpers shared by the host and plugins.
//!
//! Every element in a layout occupies a [`Rect`]. Elements constrain their own
//! size through a validation function; the helpers in this module cover the
//! common case of "at least this big" without requiring a custom function.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A placement on a drawing surface, in whole pixels.
///
/// Coordinates are signed so that intermediate editing states (for example an
/// element dragged past the left edge) can be represented before the layout
/// validator clamps them back into range.
///
/// # Example
///
/// ```rust
/// use guicraft_plugin_api::Rect;
///
/// let rect = Rect::new(2, 3, 18, 18);
/// assert_eq!(rect.right(), 20);
/// assert!(rect.contains(2, 3));
/// assert!(!rect.contains(20, 3));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl Rect {
    /// Create a new rectangle.
    pub const fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle of the given size at the origin.
    pub const fn sized(width: i64, height: i64) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Exclusive right edge (`x + width`).
    pub fn right(&self) -> i64 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge (`y + height`).
    pub fn bottom(&self) -> i64 {
        self.y.saturating_add(self.height)
    }

    /// Whether the point lies inside this rectangle (right/bottom exclusive).
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= self.x && y >= self.y && x < self.right() && y < self.bottom()
    }

    /// Copy of this rectangle with the position replaced.
    pub fn with_position(self, x: i64, y: i64) -> Self {
        Self { x, y, ..self }
    }

    /// Copy of this rectangle with the size replaced.
    pub fn with_size(self, width: i64, height: i64) -> Self {
        Self {
            width,
            height,
            ..self
        }
    }
}

/// Raise the rectangle's width and height to at least the given minimum.
///
/// Dimensions already at or above the minimum are left untouched, and the
/// position is never changed.
///
/// # Example
///
/// ```rust
/// use guicraft_plugin_api::{clamp_minimum, Rect};
///
/// let rect = clamp_minimum(8, 8, Rect::new(4, 4, 2, 20));
/// assert_eq!(rect, Rect::new(4, 4, 8, 20));
/// ```
pub fn clamp_minimum(min_width: i64, min_height: i64, rect: Rect) -> Rect {
    let mut rect = rect;
    if rect.width < min_width {
        rect.width = min_width;
    }
    if rect.height < min_height {
        rect.height = min_height;
    }
    rect
}

/// A shareable dimension validation function.
pub type DimensionValidator = Arc<dyn Fn(Rect) -> crate::Result<Rect> + Send + Sync>;

/// Curried form of [`clamp_minimum`], suitable as an element's sizing rule.
///
/// # Example
///
/// ```rust
/// use guicraft_plugin_api::{minimum_size_validator, Rect};
///
/// let validate = minimum_size_validator(2, 2);
/// assert_eq!(validate(Rect::sized(1, 5)).unwrap(), Rect::sized(2, 5));
/// ```
pub fn minimum_size_validator(min_width: i64, min_height: i64) -> DimensionValidator {
    Arc::new(move |rect| Ok(clamp_minimum(min_width, min_height, rect)))
}

/// How a declaratively built element constrains its size.
#[derive(Clone)]
pub enum SizeRule {
    /// Clamp width and height up to at least this minimum.
    Minimum { width: i64, height: i64 },
    /// Arbitrary element-supplied logic.
    Custom(DimensionValidator),
}

impl SizeRule {
    /// Apply the rule to a rectangle.
    pub fn apply(&self, rect: Rect) -> crate::Result<Rect> {
        match self {
            SizeRule::Minimum { width, height } => Ok(clamp_minimum(*width, *height, rect)),
            SizeRule::Custom(validate) => validate(rect),
        }
    }
}

impl std::fmt::Debug for SizeRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SizeRule::Minimum { width, height } => f
                .debug_struct("Minimum")
                .field("width", width)
                .field("height", height)
                .finish(),
            SizeRule::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl From<(i64, i64)> for SizeRule {
    fn from((width, height): (i64, i64)) -> Self {
        SizeRule::Minimum { width, height }
    }
}
