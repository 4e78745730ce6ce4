//! Element definitions.
//!
//! An [`ElementDefinition`] is the static description of one kind of element:
//! how it sizes itself, how it draws, what it lets the user configure and what
//! a freshly placed instance looks like. Definitions are created once when a
//! plugin loads and never change afterwards.
//!
//! Most definitions do not need a hand-written trait implementation; the
//! [`ElementDefinitionBuilder`] assembles one from closures and values.

use crate::{ConfigSchema, ConfigValues, Rect, SizeRule, Surface};
use anyhow::anyhow;
use std::fmt;
use std::sync::Arc;

/// Size and configuration of a newly placed element.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElementDefault {
    pub width: i64,
    pub height: i64,
    pub config_values: ConfigValues,
}

/// The capability contract every element kind fulfils.
///
/// All four operations may be backed by foreign code, so the fallible ones
/// return [`crate::Result`] and callers are expected to recover from errors.
///
/// # Example
///
/// ```rust
/// use guicraft_plugin_api::{
///     Color, ConfigSchema, ConfigValues, ElementDefault, ElementDefinition, Rect, Surface,
/// };
///
/// struct Solid;
///
/// impl ElementDefinition for Solid {
///     fn validate_dimensions(&self, rect: Rect) -> anyhow::Result<Rect> {
///         Ok(rect)
///     }
///
///     fn render(&self, surface: &mut dyn Surface, rect: Rect, _: &ConfigValues) -> anyhow::Result<()> {
///         surface.fill_rect(rect, Color::BLACK);
///         Ok(())
///     }
///
///     fn config_schema(&self) -> ConfigSchema {
///         ConfigSchema::new()
///     }
///
///     fn default_value(&self) -> anyhow::Result<ElementDefault> {
///         Ok(ElementDefault { width: 16, height: 16, config_values: ConfigValues::new() })
///     }
/// }
/// ```
pub trait ElementDefinition: Send + Sync {
    /// Enforce this element's sizing constraints on `rect`.
    fn validate_dimensions(&self, rect: Rect) -> crate::Result<Rect>;

    /// Draw the element into `rect` on `surface`.
    fn render(
        &self,
        surface: &mut dyn Surface,
        rect: Rect,
        config_values: &ConfigValues,
    ) -> crate::Result<()>;

    /// The configuration schema. Returns the same schema on every call.
    fn config_schema(&self) -> ConfigSchema;

    /// Size and configuration for a new instance.
    fn default_value(&self) -> crate::Result<ElementDefault>;
}

/// Reference-counted handle to a registered definition.
pub type SharedDefinition = Arc<dyn ElementDefinition>;

/// Render callback of a declaratively built element.
pub type RenderFn =
    Arc<dyn Fn(&mut dyn Surface, Rect, &ConfigValues) -> crate::Result<()> + Send + Sync>;

/// Either a ready value or a zero-argument function producing it.
pub enum ValueOrProvider<T> {
    Value(T),
    Provider(Arc<dyn Fn() -> crate::Result<T> + Send + Sync>),
}

impl<T: Clone> ValueOrProvider<T> {
    /// Wrap a provider closure.
    pub fn provider<F>(provider: F) -> Self
    where
        F: Fn() -> crate::Result<T> + Send + Sync + 'static,
    {
        ValueOrProvider::Provider(Arc::new(provider))
    }

    /// Produce the value, calling the provider if there is one.
    pub fn resolve(&self) -> crate::Result<T> {
        match self {
            ValueOrProvider::Value(value) => Ok(value.clone()),
            ValueOrProvider::Provider(provider) => provider(),
        }
    }
}

impl<T: Clone> Clone for ValueOrProvider<T> {
    fn clone(&self) -> Self {
        match self {
            ValueOrProvider::Value(value) => ValueOrProvider::Value(value.clone()),
            ValueOrProvider::Provider(provider) => ValueOrProvider::Provider(provider.clone()),
        }
    }
}

impl<T: Default> Default for ValueOrProvider<T> {
    fn default() -> Self {
        ValueOrProvider::Value(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for ValueOrProvider<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueOrProvider::Value(value) => f.debug_tuple("Value").field(value).finish(),
            ValueOrProvider::Provider(_) => f.write_str("Provider(..)"),
        }
    }
}

impl<T> From<T> for ValueOrProvider<T> {
    fn from(value: T) -> Self {
        ValueOrProvider::Value(value)
    }
}

/// Builds an [`ElementDefinition`] from a declarative description.
///
/// The config schema is evaluated once, in [`build`](Self::build). The default
/// configuration is evaluated every time a default value is requested.
///
/// # Example
///
/// ```rust
/// use guicraft_plugin_api::{
///     Color, ConfigFieldSpec, ConfigSchema, ElementDefinition, ElementDefinitionBuilder, Rect,
/// };
///
/// let definition = ElementDefinitionBuilder::new(|surface, rect, _values| {
///         surface.fill_rect(rect, Color::WHITE);
///         Ok(())
///     })
///     .default_size(18, 18)
///     .minimum_size(2, 2)
///     .config(ConfigSchema::new().with_field("label", ConfigFieldSpec::string()))
///     .build()
///     .unwrap();
///
/// assert_eq!(definition.validate_dimensions(Rect::sized(1, 1)).unwrap(), Rect::sized(2, 2));
/// assert_eq!(definition.default_value().unwrap().width, 18);
/// ```
#[derive(Clone)]
pub struct ElementDefinitionBuilder {
    render: RenderFn,
    config: ValueOrProvider<ConfigSchema>,
    default_value: ValueOrProvider<ConfigValues>,
    default_size: Option<(i64, i64)>,
    size_rule: SizeRule,
}

impl ElementDefinitionBuilder {
    pub fn new<F>(render: F) -> Self
    where
        F: Fn(&mut dyn Surface, Rect, &ConfigValues) -> crate::Result<()> + Send + Sync + 'static,
    {
        Self::from_render_fn(Arc::new(render))
    }

    pub fn from_render_fn(render: RenderFn) -> Self {
        Self {
            render,
            config: ValueOrProvider::default(),
            default_value: ValueOrProvider::default(),
            default_size: None,
            size_rule: SizeRule::Minimum {
                width: 1,
                height: 1,
            },
        }
    }

    pub fn config<C: Into<ValueOrProvider<ConfigSchema>>>(mut self, config: C) -> Self {
        self.config = config.into();
        self
    }

    pub fn default_value<V: Into<ValueOrProvider<ConfigValues>>>(mut self, values: V) -> Self {
        self.default_value = values.into();
        self
    }

    pub fn default_size(mut self, width: i64, height: i64) -> Self {
        self.default_size = Some((width, height));
        self
    }

    pub fn size_rule<R: Into<SizeRule>>(mut self, rule: R) -> Self {
        self.size_rule = rule.into();
        self
    }

    pub fn minimum_size(self, width: i64, height: i64) -> Self {
        self.size_rule((width, height))
    }

    /// Finish the definition.
    ///
    /// # Errors
    ///
    /// Fails if no default size was given or the config provider fails.
    pub fn build(self) -> crate::Result<DeclarativeElement> {
        let (default_width, default_height) = self
            .default_size
            .ok_or_else(|| anyhow!("an element definition needs a default size"))?;
        let config = self.config.resolve()?;
        Ok(DeclarativeElement {
            render: self.render,
            config,
            default_value: self.default_value,
            default_width,
            default_height,
            size_rule: self.size_rule,
        })
    }
}

impl fmt::Debug for ElementDefinitionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementDefinitionBuilder")
            .field("config", &self.config)
            .field("default_value", &self.default_value)
            .field("default_size", &self.default_size)
            .field("size_rule", &self.size_rule)
            .finish_non_exhaustive()
    }
}

/// Definition produced by [`ElementDefinitionBuilder`].
#[derive(Clone)]
pub struct DeclarativeElement {
    render: RenderFn,
    config: ConfigSchema,
    default_value: ValueOrProvider<ConfigValues>,
    default_width: i64,
    default_height: i64,
    size_rule: SizeRule,
}

impl ElementDefinition for DeclarativeElement {
    fn validate_dimensions(&self, rect: Rect) -> crate::Result<Rect> {
        self.size_rule.apply(rect)
    }

    fn render(
        &self,
        surface: &mut dyn Surface,
        rect: Rect,
        config_values: &ConfigValues,
    ) -> crate::Result<()> {
        (self.render)(surface, rect, config_values)
    }

    fn config_schema(&self) -> ConfigSchema {
        self.config.clone()
    }

    fn default_value(&self) -> crate::Result<ElementDefault> {
        Ok(ElementDefault {
            width: self.default_width,
            height: self.default_height,
            config_values: self.default_value.resolve()?,
        })
    }
}

impl fmt::Debug for DeclarativeElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeclarativeElement")
            .field("config", &self.config)
            .field("default_width", &self.default_width)
            .field("default_height", &self.default_height)
            .field("size_rule", &self.size_rule)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConfigFieldSpec, ConfigValue};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn noop_render(_: &mut dyn Surface, _: Rect, _: &ConfigValues) -> crate::Result<()> {
        Ok(())
    }

    #[test]
    fn test_build_requires_default_size() {
        assert!(ElementDefinitionBuilder::new(noop_render).build().is_err());
    }

    #[test]
    fn test_config_provider_evaluated_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let definition = ElementDefinitionBuilder::new(noop_render)
            .default_size(4, 4)
            .config(ValueOrProvider::provider(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(ConfigSchema::new().with_field("n", ConfigFieldSpec::number()))
            }))
            .build()
            .unwrap();

        assert_eq!(definition.config_schema().len(), 1);
        assert_eq!(definition.config_schema().len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_default_value_provider_evaluated_per_request() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let definition = ElementDefinitionBuilder::new(noop_render)
            .default_size(4, 5)
            .default_value(ValueOrProvider::provider(move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                Ok(ConfigValues::new().with("n", n as f64))
            }))
            .build()
            .unwrap();

        let first = definition.default_value().unwrap();
        let second = definition.default_value().unwrap();
        assert_eq!((first.width, first.height), (4, 5));
        assert_eq!(first.config_values.get("n"), Some(&ConfigValue::Number(0.0)));
        assert_eq!(second.config_values.get("n"), Some(&ConfigValue::Number(1.0)));
    }

    #[test]
    fn test_failing_config_provider_fails_build() {
        let result = ElementDefinitionBuilder::new(noop_render)
            .default_size(1, 1)
            .config(ValueOrProvider::<ConfigSchema>::provider(|| Err(anyhow!("broken schema"))))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_default_size_rule_is_one_by_one() {
        let definition = ElementDefinitionBuilder::new(noop_render)
            .default_size(3, 3)
            .build()
            .unwrap();
        assert_eq!(
            definition.validate_dimensions(Rect::new(1, 1, 0, -4)).unwrap(),
            Rect::new(1, 1, 1, 1)
        );
    }
}
