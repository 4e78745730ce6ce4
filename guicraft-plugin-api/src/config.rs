//! Configuration schemas and values.
//!
//! An element describes what the user may configure on it with a
//! [`ConfigSchema`]: an ordered list of keys, each with a [`ConfigFieldSpec`].
//! The values the user picked live in a [`ConfigValues`] map on every placed
//! element and are handed to the element's render function.

use crate::ImageData;
use anyhow::{anyhow, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// One option of a dropdown or radio field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    /// Value stored in the configuration when this option is selected
    pub id: String,
    /// Text shown to the user; falls back to `id`
    #[serde(default)]
    pub label: Option<String>,
}

impl ChoiceOption {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self {
            id: id.into(),
            label: None,
        }
    }

    pub fn labelled<S: Into<String>, L: Into<String>>(id: S, label: L) -> Self {
        Self {
            id: id.into(),
            label: Some(label.into()),
        }
    }

    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }
}

/// The kinds of configuration an element can ask for.
///
/// Dropdown and radio differ only in presentation; both store the chosen
/// option's id as a string.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigFieldKind {
    StringInput,
    UnboundNumberInput,
    BoundNumberInput { min: f64, max: f64 },
    Dropdown { values: Vec<ChoiceOption> },
    Radio { values: Vec<ChoiceOption> },
    FileInput,
}

impl ConfigFieldKind {
    /// The tag used for this kind in plugin-facing descriptions.
    pub fn type_name(&self) -> &'static str {
        match self {
            ConfigFieldKind::StringInput => "string_input",
            ConfigFieldKind::UnboundNumberInput => "unbound_number_input",
            ConfigFieldKind::BoundNumberInput { .. } => "bound_number_input",
            ConfigFieldKind::Dropdown { .. } => "dropdown",
            ConfigFieldKind::Radio { .. } => "radio",
            ConfigFieldKind::FileInput => "file_input",
        }
    }

    /// The kind of value this field stores.
    pub fn value_kind(&self) -> ValueKind {
        match self {
            ConfigFieldKind::StringInput
            | ConfigFieldKind::Dropdown { .. }
            | ConfigFieldKind::Radio { .. } => ValueKind::String,
            ConfigFieldKind::UnboundNumberInput | ConfigFieldKind::BoundNumberInput { .. } => {
                ValueKind::Number
            }
            ConfigFieldKind::FileInput => ValueKind::File,
        }
    }
}

/// A single schema entry: its kind plus an optional display label.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFieldSpec {
    pub kind: ConfigFieldKind,
    pub label: Option<String>,
}

impl ConfigFieldSpec {
    pub fn new(kind: ConfigFieldKind) -> Self {
        Self { kind, label: None }
    }

    pub fn string() -> Self {
        Self::new(ConfigFieldKind::StringInput)
    }

    pub fn number() -> Self {
        Self::new(ConfigFieldKind::UnboundNumberInput)
    }

    /// A number restricted to `[min, max]`.
    ///
    /// # Errors
    ///
    /// Returns an error if `min > max` or either bound is NaN.
    pub fn bounded(min: f64, max: f64) -> crate::Result<Self> {
        if min.is_nan() || max.is_nan() || min > max {
            bail!("invalid number bounds: min {min} must not exceed max {max}");
        }
        Ok(Self::new(ConfigFieldKind::BoundNumberInput { min, max }))
    }

    pub fn dropdown(values: Vec<ChoiceOption>) -> Self {
        Self::new(ConfigFieldKind::Dropdown { values })
    }

    pub fn radio(values: Vec<ChoiceOption>) -> Self {
        Self::new(ConfigFieldKind::Radio { values })
    }

    pub fn file() -> Self {
        Self::new(ConfigFieldKind::FileInput)
    }

    pub fn with_label<S: Into<String>>(mut self, label: S) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Whether `value` has the kind this field stores.
    pub fn accepts(&self, value: &ConfigValue) -> bool {
        self.kind.value_kind() == value.kind()
    }

    /// Check `value` against this field and normalize it.
    ///
    /// Bounded numbers are clamped into range; choice fields only accept one
    /// of their option ids.
    ///
    /// # Errors
    ///
    /// Returns an error on a kind mismatch, a number that is NaN or infinite,
    /// or an unknown choice.
    ///
    /// # Example
    ///
    /// ```rust
    /// use guicraft_plugin_api::{ConfigFieldSpec, ConfigValue};
    ///
    /// let spec = ConfigFieldSpec::bounded(0.0, 10.0).unwrap();
    /// assert_eq!(spec.coerce(ConfigValue::Number(42.0)).unwrap(), ConfigValue::Number(10.0));
    /// assert!(spec.coerce(ConfigValue::from("text")).is_err());
    /// assert!(spec.coerce(ConfigValue::Number(f64::NAN)).is_err());
    /// ```
    pub fn coerce(&self, value: ConfigValue) -> crate::Result<ConfigValue> {
        if !self.accepts(&value) {
            bail!(
                "{} field expects a {} value, got {}",
                self.kind.type_name(),
                self.kind.value_kind(),
                value.kind()
            );
        }
        if let ConfigValue::Number(n) = &value {
            if !n.is_finite() {
                bail!("{} field expects a finite number, got {}", self.kind.type_name(), n);
            }
        }
        match (&self.kind, value) {
            (ConfigFieldKind::BoundNumberInput { min, max }, ConfigValue::Number(n)) => {
                Ok(ConfigValue::Number(n.clamp(*min, *max)))
            }
            (
                ConfigFieldKind::Dropdown { values } | ConfigFieldKind::Radio { values },
                ConfigValue::String(choice),
            ) => {
                if values.iter().any(|option| option.id == choice) {
                    Ok(ConfigValue::String(choice))
                } else {
                    Err(anyhow!("`{choice}` is not one of the available options"))
                }
            }
            (_, value) => Ok(value),
        }
    }
}

/// The kind of a configuration value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    Number,
    File,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueKind::String => "string",
            ValueKind::Number => "number",
            ValueKind::File => "file",
        })
    }
}

/// Ordered mapping from configuration key to field spec.
///
/// Keys are unique; inserting an existing key replaces its spec in place.
///
/// # Example
///
/// ```rust
/// use guicraft_plugin_api::{ConfigFieldSpec, ConfigSchema};
///
/// let schema = ConfigSchema::new()
///     .with_field("title", ConfigFieldSpec::string().with_label("Title"))
///     .with_field("background", ConfigFieldSpec::file());
/// assert_eq!(schema.keys().collect::<Vec<_>>(), vec!["title", "background"]);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigSchema {
    fields: Vec<(String, ConfigFieldSpec)>,
}

impl ConfigSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field<S: Into<String>>(mut self, key: S, spec: ConfigFieldSpec) -> Self {
        self.insert(key, spec);
        self
    }

    pub fn insert<S: Into<String>>(&mut self, key: S, spec: ConfigFieldSpec) {
        let key = key.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = spec,
            None => self.fields.push((key, spec)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ConfigFieldSpec> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, spec)| spec)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigFieldSpec)> {
        self.fields.iter().map(|(key, spec)| (key.as_str(), spec))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Keys of file fields; these start out unset on a new instance.
    pub fn file_keys(&self) -> impl Iterator<Item = &str> {
        self.iter()
            .filter(|(_, spec)| spec.kind.value_kind() == ValueKind::File)
            .map(|(key, _)| key)
    }
}

/// A file picked by the user, together with its decoded pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct DiskFile {
    pub path: String,
    pub image: Arc<ImageData>,
}

impl DiskFile {
    pub fn new<S: Into<String>>(path: S, image: ImageData) -> Self {
        Self {
            path: path.into(),
            image: Arc::new(image),
        }
    }
}

/// The runtime value of one configuration key.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    String(String),
    Number(f64),
    File(DiskFile),
}

impl ConfigValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            ConfigValue::String(_) => ValueKind::String,
            ConfigValue::Number(_) => ValueKind::Number,
            ConfigValue::File(_) => ValueKind::File,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            ConfigValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&DiskFile> {
        match self {
            ConfigValue::File(file) => Some(file),
            _ => None,
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::String(value)
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        ConfigValue::Number(value)
    }
}

impl From<DiskFile> for ConfigValue {
    fn from(value: DiskFile) -> Self {
        ConfigValue::File(value)
    }
}

/// The configuration values of one placed element.
///
/// An unset file field is represented by its key being absent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigValues {
    values: BTreeMap<String, ConfigValue>,
}

impl ConfigValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ConfigValue::as_str)
    }

    pub fn get_number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(ConfigValue::as_number)
    }

    pub fn get_file(&self, key: &str) -> Option<&DiskFile> {
        self.get(key).and_then(ConfigValue::as_file)
    }

    pub fn insert<S: Into<String>>(&mut self, key: S, value: ConfigValue) -> Option<ConfigValue> {
        self.values.insert(key.into(), value)
    }

    pub fn with<S: Into<String>, V: Into<ConfigValue>>(mut self, key: S, value: V) -> Self {
        self.insert(key, value.into());
        self
    }

    /// Set or clear a file value. `None` removes the key.
    pub fn set_file<S: Into<String>>(&mut self, key: S, file: Option<DiskFile>) {
        let key = key.into();
        match file {
            Some(file) => {
                self.values.insert(key, ConfigValue::File(file));
            }
            None => {
                self.values.remove(&key);
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<ConfigValue> {
        self.values.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.values.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, ConfigValue)> for ConfigValues {
    fn from_iter<I: IntoIterator<Item = (K, ConfigValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl IntoIterator for ConfigValues {
    type Item = (String, ConfigValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, ConfigValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_rejects_inverted_bounds() {
        assert!(ConfigFieldSpec::bounded(5.0, 1.0).is_err());
        assert!(ConfigFieldSpec::bounded(1.0, 1.0).is_ok());
    }

    #[test]
    fn test_schema_insert_replaces_in_place() {
        let mut schema = ConfigSchema::new()
            .with_field("a", ConfigFieldSpec::string())
            .with_field("b", ConfigFieldSpec::number());
        schema.insert("a", ConfigFieldSpec::file());
        assert_eq!(schema.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(schema.get("a").unwrap().kind, ConfigFieldKind::FileInput);
    }

    #[test]
    fn test_file_keys() {
        let schema = ConfigSchema::new()
            .with_field("name", ConfigFieldSpec::string())
            .with_field("bg", ConfigFieldSpec::file());
        assert_eq!(schema.file_keys().collect::<Vec<_>>(), vec!["bg"]);
    }

    #[test]
    fn test_choice_coercion() {
        let spec = ConfigFieldSpec::radio(vec![
            ChoiceOption::new("left"),
            ChoiceOption::labelled("right", "Right side"),
        ]);
        assert!(spec.coerce(ConfigValue::from("left")).is_ok());
        assert!(spec.coerce(ConfigValue::from("middle")).is_err());
        assert!(spec.coerce(ConfigValue::Number(1.0)).is_err());
    }

    #[test]
    fn test_non_finite_numbers_rejected() {
        for spec in [ConfigFieldSpec::number(), ConfigFieldSpec::bounded(0.0, 100.0).unwrap()] {
            assert!(spec.coerce(ConfigValue::Number(f64::NAN)).is_err());
            assert!(spec.coerce(ConfigValue::Number(f64::INFINITY)).is_err());
            assert!(spec.coerce(ConfigValue::Number(f64::NEG_INFINITY)).is_err());
            assert!(spec.coerce(ConfigValue::Number(-0.5)).is_ok());
        }
    }

    #[test]
    fn test_unset_file_is_absent() {
        let mut values = ConfigValues::new();
        values.set_file("bg", Some(DiskFile::new("a.png", ImageData::blank(1, 1))));
        assert!(values.get_file("bg").is_some());
        values.set_file("bg", None);
        assert!(!values.contains_key("bg"));
        assert!(values.get("bg").is_none());
    }

    #[test]
    fn test_value_accessors() {
        let values = ConfigValues::new().with("title", "Chest").with("rows", 3.0);
        assert_eq!(values.get_str("title"), Some("Chest"));
        assert_eq!(values.get_number("rows"), Some(3.0));
        assert_eq!(values.get_number("title"), None);
    }
}
