//! Values that cross the boundary between plugin scripts and the host.
//!
//! Scripts see element definitions as opaque `Element` handles, draw onto a
//! recording `Canvas` and describe new elements with object maps that
//! [`build_definition`] turns into a regular [`DeclarativeElement`].

use super::runtime::ScriptRuntime;
use guicraft_plugin_api::{
    ChoiceOption, Color, ConfigFieldSpec, ConfigSchema, ConfigValue, ConfigValues,
    DeclarativeElement, DiskFile, ElementDefinitionBuilder, ImageData, Rect, SharedDefinition,
    SizeRule, Surface, ValueOrProvider,
};
use rhai::{Array, Dynamic, FnPtr, ImmutableString, Map, INT};
use std::sync::{Arc, Mutex, PoisonError};

/// A registered or built-in definition as seen by scripts.
#[derive(Clone)]
pub struct ElementHandle {
    definition: SharedDefinition,
}

impl ElementHandle {
    pub fn new(definition: SharedDefinition) -> Self {
        Self { definition }
    }

    pub fn definition(&self) -> &SharedDefinition {
        &self.definition
    }

    pub fn into_definition(self) -> SharedDefinition {
        self.definition
    }
}

/// Decoded pixels handed to scripts (previews, file inputs).
#[derive(Debug, Clone)]
pub struct ScriptImage(pub Arc<ImageData>);

#[derive(Debug, Clone)]
enum DrawCommand {
    Fill(Rect, Color),
    Blend {
        image: Arc<ImageData>,
        x: i64,
        y: i64,
        grayscale: bool,
    },
}

/// Drawing surface given to script render functions.
///
/// Commands are recorded and only replayed onto the real surface once the
/// script returns successfully, so a failing render leaves nothing behind.
#[derive(Debug, Clone)]
pub struct ScriptCanvas {
    width: u32,
    height: u32,
    commands: Arc<Mutex<Vec<DrawCommand>>>,
}

impl ScriptCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            commands: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of recorded drawing commands.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Draw everything recorded so far onto `surface`.
    pub fn replay(&self, surface: &mut dyn Surface) {
        for command in self.lock().iter() {
            match command {
                DrawCommand::Fill(rect, color) => surface.fill_rect(*rect, *color),
                DrawCommand::Blend {
                    image,
                    x,
                    y,
                    grayscale,
                } => surface.blend_image(image, *x, *y, *grayscale),
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<DrawCommand>> {
        self.commands.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Surface for ScriptCanvas {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.lock().push(DrawCommand::Fill(rect, color));
    }

    fn blend_image(&mut self, image: &ImageData, x: i64, y: i64, grayscale: bool) {
        self.lock().push(DrawCommand::Blend {
            image: Arc::new(image.clone()),
            x,
            y,
            grayscale,
        });
    }
}

impl ScriptCanvas {
    /// Blend an image that is already shared without copying its pixels.
    pub(crate) fn blend_shared(&mut self, image: Arc<ImageData>, x: i64, y: i64, grayscale: bool) {
        self.lock().push(DrawCommand::Blend {
            image,
            x,
            y,
            grayscale,
        });
    }
}

/// Configuration values as an object map for scripts.
///
/// Numbers become floats and file values become `#{ path, image }`.
pub fn values_to_map(values: &ConfigValues) -> Map {
    values
        .iter()
        .map(|(key, value)| {
            let value = match value {
                ConfigValue::String(s) => Dynamic::from(s.clone()),
                ConfigValue::Number(n) => Dynamic::from_float(*n),
                ConfigValue::File(file) => {
                    let mut map = Map::new();
                    map.insert("path".into(), Dynamic::from(file.path.clone()));
                    map.insert(
                        "image".into(),
                        Dynamic::from(ScriptImage(file.image.clone())),
                    );
                    Dynamic::from_map(map)
                }
            };
            (key.into(), value)
        })
        .collect()
}

/// Read configuration values back from a script map. `()` entries are unset.
///
/// # Errors
///
/// Fails for values that are not strings, numbers or `#{ path, image }` maps.
pub fn map_to_values(map: Map) -> Result<ConfigValues, String> {
    let mut values = ConfigValues::new();
    for (key, value) in map {
        if value.is_unit() {
            continue;
        }
        let value = dynamic_to_value(value).map_err(|e| format!("config value `{}`: {}", key, e))?;
        values.insert(key.to_string(), value);
    }
    Ok(values)
}

pub(crate) fn dynamic_to_value(value: Dynamic) -> Result<ConfigValue, String> {
    if value.is_string() {
        return Ok(ConfigValue::String(value.to_string()));
    }
    if let Some(number) = as_number(&value) {
        if !number.is_finite() {
            return Err(format!("{} is not a finite number", number));
        }
        return Ok(ConfigValue::Number(number));
    }
    if let Some(file) = value.read_lock::<Map>().and_then(|map| file_from_map(&map)) {
        return Ok(ConfigValue::File(file));
    }
    Err(format!("unsupported value of type {}", value.type_name()))
}

fn file_from_map(map: &Map) -> Option<DiskFile> {
    let path = map.get("path")?.clone().into_string().ok()?;
    let image = map.get("image")?.clone().try_cast::<ScriptImage>()?;
    Some(DiskFile {
        path,
        image: image.0,
    })
}

pub(crate) fn as_number(value: &Dynamic) -> Option<f64> {
    if let Ok(int) = value.as_int() {
        return Some(int as f64);
    }
    value.as_float().ok()
}

fn as_int(value: &Dynamic) -> Option<INT> {
    if let Ok(int) = value.as_int() {
        return Some(int);
    }
    value
        .as_float()
        .ok()
        .filter(|f| f.is_finite())
        .map(|f| f.round() as INT)
}

/// Read a `[width, height]` pair.
pub(crate) fn size_pair(value: &Dynamic, what: &str) -> Result<(i64, i64), String> {
    let pair = value
        .read_lock::<Array>()
        .filter(|array| array.len() == 2)
        .and_then(|array| Some((as_int(&array[0])?, as_int(&array[1])?)));
    pair.ok_or_else(|| format!("{} must be an array of two numbers", what))
}

/// Parse a config description.
///
/// Accepts an array of field descriptions with a `key` each, kept in the
/// order given, or a map of key to field description. A map comes out sorted
/// by key whatever order it was written in.
///
/// ```text
/// #{ rows: #{ type: "bound_number_input", min: 1, max: 6, label: "Rows" } }
/// [ #{ key: "title", type: "string_input" }, #{ key: "bg", type: "file_input" } ]
/// ```
pub fn parse_schema(value: &Dynamic) -> Result<ConfigSchema, String> {
    let mut schema = ConfigSchema::new();
    if let Some(map) = value.read_lock::<Map>() {
        for (key, field) in map.iter() {
            schema.insert(key.to_string(), parse_field(key, field)?);
        }
        return Ok(schema);
    }
    if let Some(array) = value.read_lock::<Array>() {
        for field in array.iter() {
            let key = field
                .read_lock::<Map>()
                .and_then(|map| map.get("key").cloned())
                .and_then(|key| key.into_string().ok())
                .ok_or_else(|| "every config field in an array needs a string `key`".to_string())?;
            let spec = parse_field(&key, field)?;
            schema.insert(key, spec);
        }
        return Ok(schema);
    }
    Err(format!("config must be a map or an array, got {}", value.type_name()))
}

fn parse_field(key: &str, field: &Dynamic) -> Result<ConfigFieldSpec, String> {
    let map = field
        .read_lock::<Map>()
        .ok_or_else(|| format!("config field `{}` must be a map", key))?;
    let text = |name: &str| -> Option<String> {
        map.get(name).and_then(|v| v.clone().into_string().ok())
    };
    let number = |name: &str| -> Result<f64, String> {
        map.get(name)
            .and_then(as_number)
            .ok_or_else(|| format!("config field `{}` needs a numeric `{}`", key, name))
    };
    let choices = || -> Result<Vec<ChoiceOption>, String> {
        let values = map
            .get("values")
            .and_then(|v| v.read_lock::<Array>().map(|a| (*a).clone()))
            .ok_or_else(|| format!("config field `{}` needs an array of `values`", key))?;
        values.iter().map(|v| parse_choice(key, v)).collect()
    };

    let kind = text("type").ok_or_else(|| format!("config field `{}` needs a string `type`", key))?;
    let spec = match kind.as_str() {
        "string_input" => ConfigFieldSpec::string(),
        "unbound_number_input" => ConfigFieldSpec::number(),
        "bound_number_input" => ConfigFieldSpec::bounded(number("min")?, number("max")?)
            .map_err(|e| format!("config field `{}`: {}", key, e))?,
        "dropdown" => ConfigFieldSpec::dropdown(choices()?),
        "radio" => ConfigFieldSpec::radio(choices()?),
        "file_input" => ConfigFieldSpec::file(),
        other => return Err(format!("config field `{}` has unknown type `{}`", key, other)),
    };
    Ok(match text("label") {
        Some(label) => spec.with_label(label),
        None => spec,
    })
}

fn parse_choice(key: &str, value: &Dynamic) -> Result<ChoiceOption, String> {
    if value.is_string() {
        return Ok(ChoiceOption::new(value.to_string()));
    }
    let map = value
        .read_lock::<Map>()
        .ok_or_else(|| format!("options of `{}` must be strings or #{{id, label}} maps", key))?;
    let id = map
        .get("id")
        .and_then(|v| v.clone().into_string().ok())
        .ok_or_else(|| format!("an option of `{}` has no string `id`", key))?;
    Ok(match map.get("label").and_then(|v| v.clone().into_string().ok()) {
        Some(label) => ChoiceOption::labelled(id, label),
        None => ChoiceOption::new(id),
    })
}

/// Script map describing a definition's default value.
pub fn default_to_map(width: i64, height: i64, values: &ConfigValues) -> Map {
    let mut map = Map::new();
    map.insert("width".into(), Dynamic::from_int(width));
    map.insert("height".into(), Dynamic::from_int(height));
    map.insert("config_values".into(), Dynamic::from_map(values_to_map(values)));
    map
}

/// Build a definition from the map a plugin passed to
/// `create_element_definition`.
///
/// Recognised keys: `render` (function, required), `default_size`
/// (`[w, h]`, required), `validate_dimensions` (`[min_w, min_h]` or a
/// function of a `Rect`), `config` (see [`parse_schema`], or a function
/// returning it) and `default_value` (map of values, or a function returning
/// one). Functions are called inside `runtime`.
///
/// Rhai object maps do not remember insertion order, so a `config` map
/// yields its fields sorted by key. Pass an array of fields to control the
/// order the editor shows them in.
pub fn build_definition(
    runtime: Arc<ScriptRuntime>,
    spec: &Map,
) -> Result<DeclarativeElement, String> {
    let render = spec
        .get("render")
        .and_then(|v| v.clone().try_cast::<FnPtr>())
        .ok_or_else(|| "`render` must be a function".to_string())?;
    let (width, height) = spec
        .get("default_size")
        .ok_or_else(|| "`default_size` is required".to_string())
        .and_then(|v| size_pair(v, "`default_size`"))?;

    let render_runtime = runtime.clone();
    let mut builder = ElementDefinitionBuilder::new(move |surface, rect, values| {
        let canvas = ScriptCanvas::new(surface.width(), surface.height());
        render_runtime.call::<Dynamic>(
            &render,
            (canvas.clone(), rect, Dynamic::from_map(values_to_map(values))),
        )?;
        canvas.replay(surface);
        Ok(())
    })
    .default_size(width, height);

    if let Some(rule) = spec.get("validate_dimensions") {
        builder = builder.size_rule(size_rule(runtime.clone(), rule)?);
    }

    if let Some(config) = spec.get("config") {
        let schema = match config.clone().try_cast::<FnPtr>() {
            Some(provider) => {
                let produced = runtime
                    .call::<Dynamic>(&provider, ())
                    .map_err(|e| format!("config provider failed: {:#}", e))?;
                parse_schema(&produced)?
            }
            None => parse_schema(config)?,
        };
        builder = builder.config(schema);
    }

    if let Some(default_value) = spec.get("default_value") {
        let values = match default_value.clone().try_cast::<FnPtr>() {
            Some(provider) => {
                let runtime = runtime.clone();
                ValueOrProvider::provider(move || {
                    let produced = runtime.call::<Map>(&provider, ())?;
                    map_to_values(produced).map_err(anyhow::Error::msg)
                })
            }
            None => {
                let map = default_value
                    .read_lock::<Map>()
                    .map(|map| (*map).clone())
                    .ok_or_else(|| "`default_value` must be a map or a function".to_string())?;
                ValueOrProvider::Value(map_to_values(map)?)
            }
        };
        builder = builder.default_value(values);
    }

    builder.build().map_err(|e| format!("{:#}", e))
}

fn size_rule(runtime: Arc<ScriptRuntime>, rule: &Dynamic) -> Result<SizeRule, String> {
    if let Some(validator) = rule.clone().try_cast::<FnPtr>() {
        return Ok(SizeRule::Custom(Arc::new(move |rect: Rect| {
            runtime.call::<Rect>(&validator, (rect,))
        })));
    }
    size_pair(rule, "`validate_dimensions`").map(SizeRule::from)
}

pub(crate) fn parse_color(color: &ImmutableString) -> Result<Color, String> {
    Color::parse(color.as_str()).map_err(|e| e.to_string())
}
