//! # Guicraft Plugin API
//!
//! This crate defines the contract between the guicraft host and the code
//! that supplies element kinds to it. An element kind is described by an
//! [`ElementDefinition`]: it sizes itself, draws onto a [`Surface`], declares a
//! [`ConfigSchema`] and produces default values for new instances.
//!
//! ## Building a definition
//!
//! ```rust
//! use guicraft_plugin_api::{
//!     Color, ConfigFieldSpec, ConfigSchema, ElementDefinition, ElementDefinitionBuilder,
//!     PixelBuffer, Rect, Surface,
//! };
//!
//! let definition = ElementDefinitionBuilder::new(|surface, rect, values| {
//!         let fill = values
//!             .get_str("color")
//!             .map(Color::parse)
//!             .transpose()?
//!             .unwrap_or(Color::BLACK);
//!         surface.fill_rect(rect, fill);
//!         Ok(())
//!     })
//!     .default_size(8, 8)
//!     .minimum_size(2, 2)
//!     .config(ConfigSchema::new().with_field("color", ConfigFieldSpec::string()))
//!     .build()
//!     .unwrap();
//!
//! let mut buffer = PixelBuffer::new(8, 8);
//! let defaults = definition.default_value().unwrap();
//! definition
//!     .render(&mut buffer, Rect::sized(8, 8), &defaults.config_values)
//!     .unwrap();
//! assert_eq!(buffer.pixel(0, 0), Some([0, 0, 0, 255]));
//! ```

pub mod config;
pub mod element;
pub mod geometry;
pub mod invoke;
pub mod plugin;
pub mod surface;

pub use config::{
    ChoiceOption, ConfigFieldKind, ConfigFieldSpec, ConfigSchema, ConfigValue, ConfigValues,
    DiskFile, ValueKind,
};
pub use element::{
    DeclarativeElement, ElementDefault, ElementDefinition, ElementDefinitionBuilder, RenderFn,
    SharedDefinition, ValueOrProvider,
};
pub use geometry::{clamp_minimum, minimum_size_validator, DimensionValidator, Rect, SizeRule};
pub use invoke::{try_call, try_call_async};
pub use plugin::{ElementRegistrar, Plugin, PluginInfo};
pub use surface::{Color, ImageData, PixelBuffer, Surface};

/// Result type used throughout the plugin API
pub type Result<T> = std::result::Result<T, anyhow::Error>;
