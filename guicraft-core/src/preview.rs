//! # Preview cache
//!
//! Renders each element at its default size and configuration once and keeps
//! the pixels around for element pickers. Entries are keyed by id and never
//! invalidated; the registry is append-only, so an id always refers to the
//! same definition.

use crate::registry::ElementRegistry;
use guicraft_plugin_api::{try_call, ImageData, PixelBuffer};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// Lazily rendered element previews.
///
/// # Example
///
/// ```rust
/// use guicraft_core::{ElementRegistry, PreviewCache};
/// use guicraft_plugin_api::{Color, ElementDefinitionBuilder, Surface};
/// use std::sync::Arc;
///
/// let registry = Arc::new(ElementRegistry::new());
/// let definition = ElementDefinitionBuilder::new(|surface, rect, _| {
///         surface.fill_rect(rect, Color::WHITE);
///         Ok(())
///     })
///     .default_size(2, 3)
///     .build()
///     .unwrap();
/// registry.register("box", Arc::new(definition), None).unwrap();
///
/// let cache = PreviewCache::new(registry, 1024);
/// let preview = cache.get_preview("box").unwrap();
/// assert_eq!((preview.width(), preview.height()), (2, 3));
/// assert!(cache.get_preview("unknown").is_none());
/// ```
pub struct PreviewCache {
    registry: Arc<ElementRegistry>,
    max_pixels: u64,
    rendered: Mutex<HashMap<String, Arc<ImageData>>>,
}

impl PreviewCache {
    /// Create a cache over `registry`. Previews larger than `max_pixels`
    /// (width * height) are not rendered.
    pub fn new(registry: Arc<ElementRegistry>, max_pixels: u64) -> Self {
        Self {
            registry,
            max_pixels,
            rendered: Mutex::new(HashMap::new()),
        }
    }

    /// The preview of element `id`.
    ///
    /// Returns `None` if the id is unknown, the element has no usable default
    /// value or its default size is empty or too large. A render failure still
    /// produces (and caches) whatever was drawn before the failure.
    pub fn get_preview(&self, id: &str) -> Option<Arc<ImageData>> {
        if let Some(cached) = self.lock().get(id) {
            return Some(cached.clone());
        }

        let definition = self.registry.get(id)?;
        let default = try_call(Some(|| definition.default_value()))?;

        let width = u32::try_from(default.width).ok().filter(|w| *w > 0)?;
        let height = u32::try_from(default.height).ok().filter(|h| *h > 0)?;
        if u64::from(width) * u64::from(height) > self.max_pixels {
            warn!("Preview of {} ({}x{}) is too large", id, width, height);
            return None;
        }

        let mut buffer = PixelBuffer::new(width, height);
        let rect = guicraft_plugin_api::Rect::sized(default.width, default.height);
        if let Err(e) = definition.render(&mut buffer, rect, &default.config_values) {
            warn!("Rendering preview of {} failed: {:#}", id, e);
        }

        debug!("Cached preview of {}", id);
        let image = Arc::new(buffer.into_image());
        Some(
            self.lock()
                .entry(id.to_string())
                .or_insert(image)
                .clone(),
        )
    }

    /// Number of cached previews.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<ImageData>>> {
        self.rendered.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
