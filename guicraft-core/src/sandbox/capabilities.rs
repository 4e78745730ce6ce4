//! The host functions a plugin script can reach.
//!
//! Each plugin engine gets exactly the functions registered here and nothing
//! else. Handles to shared host state are weak: a definition created by a
//! plugin keeps its engine alive, and the engine must not in turn keep the
//! registry alive.

use super::exception::{script_error, script_error_with, DUPLICATE_REGISTRATION_KIND};
use super::runtime::{ScriptRuntime, PLUGIN_LOG_TARGET};
use super::script_element::{
    build_definition, default_to_map, map_to_values, parse_color, ElementHandle, ScriptCanvas,
    ScriptImage,
};
use crate::preview::PreviewCache;
use crate::registry::ElementRegistry;
use guicraft_plugin_api::{clamp_minimum, Rect, SharedDefinition, Surface};
use rhai::{
    Array, Dynamic, Engine, EvalAltResult, FnPtr, ImmutableString, Map, NativeCallContext, INT,
};
use std::sync::{Arc, OnceLock, Weak};
use tracing::{debug, error, info, warn};

type ScriptResult<T> = Result<T, Box<EvalAltResult>>;

/// Built-in definitions exposed to plugins, by id.
pub type Builtins = Arc<Vec<(String, SharedDefinition)>>;

/// Host state reachable from one plugin's engine.
pub(crate) struct HostBindings {
    pub plugin: String,
    pub registry: Weak<ElementRegistry>,
    pub previews: Weak<PreviewCache>,
    pub builtins: Builtins,
    /// Filled in once the plugin's runtime exists
    pub runtime: Arc<OnceLock<Weak<ScriptRuntime>>>,
}

fn upgrade<T>(weak: &Weak<T>, what: &str) -> ScriptResult<Arc<T>> {
    weak.upgrade()
        .ok_or_else(|| script_error("PluginError", format!("the {} is no longer available", what)))
}

/// Register the value types scripts work with: `Rect`, `Image`, `Canvas` and
/// `Element`.
pub(crate) fn register_types(engine: &mut Engine) {
    engine
        .register_type_with_name::<Rect>("Rect")
        .register_fn("rect", |x: INT, y: INT, width: INT, height: INT| {
            Rect::new(x, y, width, height)
        })
        .register_get_set("x", |r: &mut Rect| r.x, |r: &mut Rect, v: INT| r.x = v)
        .register_get_set("y", |r: &mut Rect| r.y, |r: &mut Rect, v: INT| r.y = v)
        .register_get_set("width", |r: &mut Rect| r.width, |r: &mut Rect, v: INT| r.width = v)
        .register_get_set("height", |r: &mut Rect| r.height, |r: &mut Rect, v: INT| r.height = v)
        .register_fn("contains", |r: &mut Rect, x: INT, y: INT| r.contains(x, y))
        .register_fn("to_string", |r: &mut Rect| {
            format!("Rect({}, {}, {}, {})", r.x, r.y, r.width, r.height)
        })
        .register_fn("to_debug", |r: &mut Rect| format!("{:?}", r));

    engine
        .register_type_with_name::<ScriptImage>("Image")
        .register_get("width", |image: &mut ScriptImage| INT::from(image.0.width()))
        .register_get("height", |image: &mut ScriptImage| INT::from(image.0.height()));

    engine
        .register_type_with_name::<ScriptCanvas>("Canvas")
        .register_get("width", |canvas: &mut ScriptCanvas| INT::from(canvas.width()))
        .register_get("height", |canvas: &mut ScriptCanvas| INT::from(canvas.height()))
        .register_fn(
            "fill_rect",
            |canvas: &mut ScriptCanvas, rect: Rect, color: ImmutableString| -> ScriptResult<()> {
                let color = parse_color(&color).map_err(|e| script_error("TypeError", e))?;
                canvas.fill_rect(rect, color);
                Ok(())
            },
        )
        .register_fn(
            "fill_rect",
            |canvas: &mut ScriptCanvas,
             x: INT,
             y: INT,
             width: INT,
             height: INT,
             color: ImmutableString|
             -> ScriptResult<()> {
                let color = parse_color(&color).map_err(|e| script_error("TypeError", e))?;
                canvas.fill_rect(Rect::new(x, y, width, height), color);
                Ok(())
            },
        )
        .register_fn(
            "blend_image",
            |canvas: &mut ScriptCanvas, image: ScriptImage, x: INT, y: INT| {
                canvas.blend_shared(image.0, x, y, false)
            },
        )
        .register_fn(
            "blend_image",
            |canvas: &mut ScriptCanvas, image: ScriptImage, x: INT, y: INT, grayscale: bool| {
                canvas.blend_shared(image.0, x, y, grayscale)
            },
        );

    engine
        .register_type_with_name::<ElementHandle>("Element")
        .register_fn(
            "render",
            |element: &mut ElementHandle,
             canvas: ScriptCanvas,
             rect: Rect,
             values: Map|
             -> ScriptResult<()> {
                let values = map_to_values(values).map_err(|e| script_error("TypeError", e))?;
                let mut canvas = canvas;
                element
                    .definition()
                    .render(&mut canvas, rect, &values)
                    .map_err(|e| script_error("RenderError", format!("{:#}", e)))
            },
        )
        .register_fn(
            "validate_dimensions",
            |element: &mut ElementHandle, rect: Rect| -> ScriptResult<Rect> {
                element
                    .definition()
                    .validate_dimensions(rect)
                    .map_err(|e| script_error("ValidationError", format!("{:#}", e)))
            },
        )
        .register_fn(
            "default_value",
            |element: &mut ElementHandle| -> ScriptResult<Map> {
                let default = element
                    .definition()
                    .default_value()
                    .map_err(|e| script_error("ElementError", format!("{:#}", e)))?;
                Ok(default_to_map(
                    default.width,
                    default.height,
                    &default.config_values,
                ))
            },
        );
}

/// Register the capability functions bound to one plugin.
pub(crate) fn register_capabilities(engine: &mut Engine, host: HostBindings) {
    let HostBindings {
        plugin,
        registry,
        previews,
        builtins,
        runtime,
    } = host;

    let (name, weak) = (plugin.clone(), registry.clone());
    engine.register_fn(
        "register_element",
        move |id: &str, element: ElementHandle| -> ScriptResult<()> {
            let registry = upgrade(&weak, "element registry")?;
            registry
                .register(id, element.into_definition(), Some(name.as_str()))
                .map_err(|err| {
                    if err.is_duplicate_registration() {
                        script_error_with(
                            DUPLICATE_REGISTRATION_KIND,
                            err.to_string(),
                            [("id", Dynamic::from(id.to_string()))],
                        )
                    } else {
                        script_error("PluginError", err.to_string())
                    }
                })
        },
    );

    // `config` given as a map loses its written order; see `build_definition`
    engine.register_fn(
        "create_element_definition",
        move |spec: Map| -> ScriptResult<ElementHandle> {
            let runtime = runtime
                .get()
                .and_then(Weak::upgrade)
                .ok_or_else(|| script_error("PluginError", "the plugin runtime is not available"))?;
            let definition =
                build_definition(runtime, &spec).map_err(|e| script_error("TypeError", e))?;
            Ok(ElementHandle::new(Arc::new(definition)))
        },
    );

    let weak = registry.clone();
    engine.register_fn("get_registered_elements", move || -> ScriptResult<Array> {
        let registry = upgrade(&weak, "element registry")?;
        Ok(registry.ids().into_iter().map(Dynamic::from).collect())
    });

    let weak = registry;
    engine.register_fn("get_element", move |id: &str| -> ScriptResult<Dynamic> {
        let registry = upgrade(&weak, "element registry")?;
        Ok(registry
            .get(id)
            .map(|definition| Dynamic::from(ElementHandle::new(definition)))
            .unwrap_or(Dynamic::UNIT))
    });

    engine.register_fn("get_element_preview", move |id: &str| -> ScriptResult<Dynamic> {
        let previews = upgrade(&previews, "preview cache")?;
        Ok(previews
            .get_preview(id)
            .map(|image| Dynamic::from(ScriptImage(image)))
            .unwrap_or(Dynamic::UNIT))
    });

    engine.register_fn(
        "try_call",
        |ctx: NativeCallContext, function: Dynamic, args: Array| try_call_script(&ctx, function, args),
    );
    engine.register_fn("try_call", |ctx: NativeCallContext, function: Dynamic| {
        try_call_script(&ctx, function, Array::new())
    });

    engine.register_fn(
        "validate_minimum_size",
        |min_width: INT, min_height: INT, rect: Rect| clamp_minimum(min_width, min_height, rect),
    );
    engine.register_fn(
        "minimum_size_validator",
        |min_width: INT, min_height: INT| -> ScriptResult<FnPtr> {
            let mut validator = FnPtr::new("validate_minimum_size")?;
            validator
                .add_curry(Dynamic::from_int(min_width))
                .add_curry(Dynamic::from_int(min_height));
            Ok(validator)
        },
    );

    let all = builtins.clone();
    engine.register_fn("default_elements", move || -> Map {
        all.iter()
            .map(|(id, definition)| {
                (id.as_str().into(), Dynamic::from(ElementHandle::new(definition.clone())))
            })
            .collect()
    });
    engine.register_fn("builtin", move |id: &str| -> Dynamic {
        builtins
            .iter()
            .find(|(builtin, _)| builtin == id)
            .map(|(_, definition)| Dynamic::from(ElementHandle::new(definition.clone())))
            .unwrap_or(Dynamic::UNIT)
    });

    let name = plugin.clone();
    engine.register_fn("plugin_name", move || name.clone());

    let name = plugin.clone();
    engine.register_fn("log_info", move |message: &str| {
        info!(target: PLUGIN_LOG_TARGET, "[{}]: {}", name, message)
    });
    let name = plugin.clone();
    engine.register_fn("log_warn", move |message: &str| {
        warn!(target: PLUGIN_LOG_TARGET, "[{}]: {}", name, message)
    });
    let name = plugin;
    engine.register_fn("log_error", move |message: &str| {
        error!(target: PLUGIN_LOG_TARGET, "[{}]: {}", name, message)
    });
}

/// Call `function` with `args`; anything but a successful call yields `()`.
///
/// Running out of operations or time is not swallowed, so a plugin cannot use
/// this to outlive its budget.
fn try_call_script(ctx: &NativeCallContext, function: Dynamic, args: Array) -> ScriptResult<Dynamic> {
    let Some(function) = function.try_cast::<FnPtr>() else {
        return Ok(Dynamic::UNIT);
    };
    match function.call_within_context::<Dynamic>(ctx, args) {
        Ok(value) => Ok(value),
        Err(err) => match *err {
            EvalAltResult::ErrorTerminated(..) | EvalAltResult::ErrorTooManyOperations(..) => Err(err),
            _ => {
                debug!("try_call swallowed script error: {}", err);
                Ok(Dynamic::UNIT)
            }
        },
    }
}
