//! # Guicraft Core
//!
//! Core of the guicraft layout editor: the element registry, the sandboxed
//! plugin loader, layout validation, file conversion and the editing session.
//!
//! ## Architecture
//!
//! Every element that can appear on a layout comes from a definition in the
//! shared [`ElementRegistry`]:
//! - Built-in definitions are registered by native [`Plugin`](guicraft_plugin_api::Plugin)s
//! - Script plugins run in the [`sandbox`] and register their own definitions
//! - The [`EditorSession`] edits a [`LayoutTree`] whose elements refer to
//!   definitions by id
//!
//! ## Example
//!
//! ```rust
//! use guicraft_core::sandbox::{PluginSandbox, PluginScript, SandboxLimits};
//! use guicraft_core::{EditorSession, ElementRegistry, PreviewCache};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let registry = Arc::new(ElementRegistry::new());
//! let previews = Arc::new(PreviewCache::new(registry.clone(), 1 << 20));
//! let sandbox = PluginSandbox::new(registry.clone(), previews, SandboxLimits::default());
//!
//! sandbox
//!     .load_batch(vec![PluginScript::new(
//!         r##"
//!         register_element("panel", create_element_definition(#{
//!             render: |canvas, rect, values| canvas.fill_rect(rect, "#c6c6c6"),
//!             default_size: [32, 32],
//!         }));
//!         "##,
//!         "panel.rhai",
//!     )])
//!     .await;
//!
//! let session = EditorSession::new(registry, "panel")?;
//! assert_eq!(session.layout().base.rect.width, 32);
//! # Ok::<(), guicraft_core::Error>(())
//! # });
//! ```

pub mod bridge;
pub mod config;
pub mod editor;
pub mod error;
pub mod imaging;
pub mod layout;
pub mod preview;
pub mod registry;
pub mod sandbox;
pub mod session;

pub use bridge::{LayoutFile, WireLayout};
pub use config::Config;
pub use editor::{EditCommand, EditorSession};
pub use error::{Error, Result};
pub use imaging::DiskFileExt;
pub use layout::{CanvasElement, LayoutTree, Selection};
pub use preview::PreviewCache;
pub use registry::ElementRegistry;
pub use sandbox::{PluginLoadReport, PluginLoadStatus, PluginSandbox};
pub use session::Session;

use tracing_subscriber::EnvFilter;

/// Initialize tracing for the application at `info` level.
///
/// `RUST_LOG` takes precedence when set.
///
/// # Example
///
/// ```rust
/// guicraft_core::init_tracing();
/// tracing::info!("Editor started");
/// ```
pub fn init_tracing() {
    init_tracing_with_level("info");
}

/// Initialize tracing with `level` as the fallback filter.
///
/// Installing a subscriber twice is not an error; the second call does
/// nothing.
pub fn init_tracing_with_level(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
