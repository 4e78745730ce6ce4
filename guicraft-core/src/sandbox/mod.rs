//! # Plugin sandbox
//!
//! Plugins are Rhai scripts. Each one runs once, at load time, in its own
//! engine whose only host functions are the capabilities in
//! [`capabilities`](self::capabilities): registering and building element
//! definitions, read-only registry access, geometry helpers, error-safe calls,
//! built-in elements, previews and prefixed logging. Imports and `eval` are
//! unavailable, and every call into a script runs under an operation budget
//! and a wall-clock deadline.
//!
//! A batch of plugins is loaded concurrently on the blocking pool. One plugin
//! failing never affects the others; the outcome is collected into a
//! [`PluginLoadReport`] in input order.
//!
//! ## Example
//!
//! ```rust
//! use guicraft_core::sandbox::{PluginSandbox, PluginScript, SandboxLimits};
//! use guicraft_core::{ElementRegistry, PreviewCache};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let registry = Arc::new(ElementRegistry::new());
//! let previews = Arc::new(PreviewCache::new(registry.clone(), 1 << 20));
//! let sandbox = PluginSandbox::new(registry.clone(), previews, SandboxLimits::default());
//!
//! let report = sandbox
//!     .load_batch(vec![PluginScript::new(
//!         r##"
//!         let dot = create_element_definition(#{
//!             render: |canvas, rect, values| canvas.fill_rect(rect, "#ff0000"),
//!             default_size: [1, 1],
//!         });
//!         register_element("dot", dot);
//!         "##,
//!         "dot.rhai",
//!     )])
//!     .await;
//!
//! assert_eq!(report.successful, vec!["dot.rhai"]);
//! assert!(registry.contains("dot"));
//! # });
//! ```

pub mod capabilities;
pub mod exception;
pub mod runtime;
pub mod script_element;
pub mod source;

pub use capabilities::Builtins;
pub use exception::{render_exception, DUPLICATE_REGISTRATION_KIND};
pub use runtime::{SandboxLimits, ScriptRuntime, PLUGIN_LOG_TARGET};
pub use script_element::{ElementHandle, ScriptCanvas, ScriptImage};
pub use source::{
    parse_payload, DirectoryPluginSource, PluginScript, PluginSource, StaticPluginSource,
};

use crate::preview::PreviewCache;
use crate::registry::ElementRegistry;
use crate::{Error, Result};
use capabilities::HostBindings;
use futures::future::join_all;
use guicraft_plugin_api::SharedDefinition;
use rhai::{Dynamic, Scope};
use runtime::Deadline;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Suffix every plugin name must end with.
pub const PLUGIN_SUFFIX: &str = ".rhai";

/// Shortest acceptable plugin name, suffix included.
pub const MIN_PLUGIN_NAME_LEN: usize = 6;

/// Message of a rejected plugin name.
pub const INVALID_NAME_MESSAGE: &str = "A plugin name can only contain letters, - and _, has to be at least 1 letter long and end in `.rhai`";

/// Check a declared plugin name.
///
/// # Errors
///
/// Returns [`Error::PluginValidation`] unless the name is at least
/// [`MIN_PLUGIN_NAME_LEN`] characters, ends in [`PLUGIN_SUFFIX`] and the rest
/// consists of ASCII letters, `-` and `_`.
///
/// # Example
///
/// ```rust
/// use guicraft_core::sandbox::validate_plugin_name;
///
/// assert!(validate_plugin_name("a.rhai").is_ok());
/// assert!(validate_plugin_name(".rhai").is_err());
/// assert!(validate_plugin_name("abc!.rhai").is_err());
/// ```
pub fn validate_plugin_name(name: &str) -> Result<()> {
    let valid = name.len() >= MIN_PLUGIN_NAME_LEN
        && name.strip_suffix(PLUGIN_SUFFIX).is_some_and(|stem| {
            stem.chars()
                .all(|c| c.is_ascii_alphabetic() || c == '-' || c == '_')
        });
    if valid {
        Ok(())
    } else {
        Err(Error::plugin_validation(name, INVALID_NAME_MESSAGE))
    }
}

/// A plugin that failed to load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginFailure {
    pub name: String,
    pub exception: String,
}

/// Outcome of loading a batch, both lists in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginLoadReport {
    pub successful: Vec<String>,
    pub errored: Vec<PluginFailure>,
}

/// Where plugin loading stands. `Loaded` and `Errored` are terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PluginLoadStatus {
    Loading,
    Loaded(PluginLoadReport),
    Errored { exception: String },
}

impl PluginLoadStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PluginLoadStatus::Loading)
    }
}

/// Everything one plugin execution needs, cheap to clone onto a worker.
#[derive(Clone)]
struct SandboxHost {
    registry: Arc<ElementRegistry>,
    previews: Arc<PreviewCache>,
    builtins: Builtins,
    limits: SandboxLimits,
}

impl SandboxHost {
    fn execute(&self, plugin: &PluginScript) -> std::result::Result<(), String> {
        let name = plugin.name.as_str();
        let deadline = Arc::new(Deadline::new());
        let slot = Arc::new(OnceLock::new());

        let mut engine = runtime::new_engine(name, &self.limits, deadline.clone());
        capabilities::register_types(&mut engine);
        capabilities::register_capabilities(
            &mut engine,
            HostBindings {
                plugin: name.to_string(),
                registry: Arc::downgrade(&self.registry),
                previews: Arc::downgrade(&self.previews),
                builtins: self.builtins.clone(),
                runtime: slot.clone(),
            },
        );

        let ast = engine
            .compile(&plugin.source)
            .map_err(|err| exception::render_parse_error(&err, name))?;
        let runtime = Arc::new(ScriptRuntime::new(
            name,
            engine,
            ast,
            deadline,
            self.limits.timeout,
        ));
        // the slot is fresh, so this cannot already be set
        let _ = slot.set(Arc::downgrade(&runtime));

        let mut scope = Scope::new();
        scope.push_constant("PLUGIN_NAME", name.to_string());
        scope.push_constant(
            DUPLICATE_REGISTRATION_KIND,
            Dynamic::from(DUPLICATE_REGISTRATION_KIND.to_string()),
        );
        runtime.run_body(&mut scope)
    }
}

/// Loads plugin scripts into a shared registry.
pub struct PluginSandbox {
    host: SandboxHost,
    status: watch::Sender<PluginLoadStatus>,
}

impl PluginSandbox {
    /// Create a sandbox registering into `registry`. The load status starts
    /// out as [`PluginLoadStatus::Loading`].
    pub fn new(
        registry: Arc<ElementRegistry>,
        previews: Arc<PreviewCache>,
        limits: SandboxLimits,
    ) -> Self {
        let (status, _) = watch::channel(PluginLoadStatus::Loading);
        Self {
            host: SandboxHost {
                registry,
                previews,
                builtins: Arc::new(Vec::new()),
                limits,
            },
            status,
        }
    }

    /// Expose these definitions to plugins through `builtin(id)` and
    /// `default_elements()`.
    pub fn with_builtins(mut self, builtins: Vec<(String, SharedDefinition)>) -> Self {
        self.host.builtins = Arc::new(builtins);
        self
    }

    /// The current load status.
    pub fn status(&self) -> PluginLoadStatus {
        self.status.borrow().clone()
    }

    /// Subscribe to status changes. The receiver is notified once, when
    /// loading finishes.
    pub fn subscribe(&self) -> watch::Receiver<PluginLoadStatus> {
        self.status.subscribe()
    }

    /// Fetch plugins from `source`, load them and publish the final status.
    ///
    /// Only the first call does anything; later calls return the terminal
    /// status unchanged.
    pub async fn load_from(&self, source: &dyn PluginSource) -> PluginLoadStatus {
        let current = self.status();
        if current.is_terminal() {
            warn!("Plugins were already loaded");
            return current;
        }

        let status = match source.fetch().await.and_then(parse_payload) {
            Ok(plugins) => PluginLoadStatus::Loaded(self.load_batch(plugins).await),
            Err(err) => {
                error!("Loading plugins failed: {}", err);
                PluginLoadStatus::Errored {
                    exception: err.to_string(),
                }
            }
        };
        self.status.send_replace(status.clone());
        status
    }

    /// Load a batch of plugins.
    ///
    /// Names are validated first; valid plugins run concurrently on the
    /// blocking pool. Does not touch the load status.
    pub async fn load_batch(&self, plugins: Vec<PluginScript>) -> PluginLoadReport {
        info!("Loading {} plugins", plugins.len());
        let runs = plugins.into_iter().map(|plugin| {
            let host = self.host.clone();
            async move {
                if let Err(err) = validate_plugin_name(&plugin.name) {
                    return (plugin.name, Err(err.to_string()));
                }
                let name = plugin.name.clone();
                let outcome = tokio::task::spawn_blocking(move || host.execute(&plugin))
                    .await
                    .unwrap_or_else(|e| Err(format!("PanicError: plugin execution aborted: {}", e)));
                (name, outcome)
            }
        });

        let mut report = PluginLoadReport::default();
        for (name, outcome) in join_all(runs).await {
            match outcome {
                Ok(()) => {
                    debug!("[{}]: loaded", name);
                    report.successful.push(name);
                }
                Err(exception) => {
                    error!("[{}]: failed to load: {}", name, exception);
                    report.errored.push(PluginFailure { name, exception });
                }
            }
        }
        info!(
            "Plugins loaded: {} successful, {} failed",
            report.successful.len(),
            report.errored.len()
        );
        report
    }

    /// Run a single plugin on the current thread.
    ///
    /// # Errors
    ///
    /// Returns the rendered exception of a rejected or failing plugin.
    pub fn execute(&self, plugin: &PluginScript) -> std::result::Result<(), String> {
        validate_plugin_name(&plugin.name).map_err(|e| e.to_string())?;
        self.host.execute(plugin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guicraft_plugin_api::{ElementDefinitionBuilder, PixelBuffer, Rect};

    fn sandbox() -> (Arc<ElementRegistry>, PluginSandbox) {
        let registry = Arc::new(ElementRegistry::new());
        let previews = Arc::new(PreviewCache::new(registry.clone(), 1 << 20));
        let sandbox = PluginSandbox::new(registry.clone(), previews, SandboxLimits::default());
        (registry, sandbox)
    }

    const DOT: &str = r##"
        let dot = create_element_definition(#{
            render: |canvas, rect, values| canvas.fill_rect(rect, "#ff0000"),
            default_size: [2, 2],
            validate_dimensions: [2, 2],
        });
        register_element("dot", dot);
    "##;

    #[test]
    fn test_plugin_names() {
        assert!(validate_plugin_name("a.rhai").is_ok());
        assert!(validate_plugin_name("my-plugin_x.rhai").is_ok());
        assert!(validate_plugin_name(".rhai").is_err());
        assert!(validate_plugin_name("abc!.rhai").is_err());
        assert!(validate_plugin_name("abc.js").is_err());
        assert!(validate_plugin_name("a1.rhai").is_err());

        let err = validate_plugin_name("bad name!").unwrap_err();
        assert_eq!(err.to_string(), INVALID_NAME_MESSAGE);
    }

    #[test]
    fn test_registered_script_element_renders() {
        let (registry, sandbox) = sandbox();
        sandbox.execute(&PluginScript::new(DOT, "dot.rhai")).unwrap();

        let definition = registry.get("dot").unwrap();
        assert_eq!(registry.list_all()[0].registerer, "dot.rhai");
        assert_eq!(
            definition.validate_dimensions(Rect::sized(1, 5)).unwrap(),
            Rect::sized(2, 5)
        );

        let mut buffer = PixelBuffer::new(3, 3);
        definition
            .render(&mut buffer, Rect::new(1, 1, 2, 2), &Default::default())
            .unwrap();
        assert_eq!(buffer.pixel(0, 0), Some([0, 0, 0, 0]));
        assert_eq!(buffer.pixel(2, 2), Some([255, 0, 0, 255]));
    }

    #[test]
    fn test_failed_render_draws_nothing() {
        let (registry, sandbox) = sandbox();
        let script = r##"
            register_element("half", create_element_definition(#{
                render: |canvas, rect, values| {
                    canvas.fill_rect(rect, "#ffffff");
                    throw "second half missing";
                },
                default_size: [1, 1],
            }));
        "##;
        sandbox.execute(&PluginScript::new(script, "half.rhai")).unwrap();

        let mut buffer = PixelBuffer::new(1, 1);
        let err = registry
            .get("half")
            .unwrap()
            .render(&mut buffer, Rect::sized(1, 1), &Default::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "second half missing");
        assert_eq!(buffer.pixel(0, 0), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_duplicate_registration_is_catchable() {
        let (registry, sandbox) = sandbox();
        sandbox.execute(&PluginScript::new(DOT, "dot.rhai")).unwrap();

        let script = r#"
            let copy = create_element_definition(#{
                render: |canvas, rect, values| {},
                default_size: [9, 9],
            });
            try {
                register_element("dot", copy);
                throw "registration should have failed";
            } catch (e) {
                if e.kind != DuplicateRegistrationError || e.id != "dot" {
                    throw e;
                }
            }
        "#;
        sandbox.execute(&PluginScript::new(script, "copy.rhai")).unwrap();
        assert_eq!(registry.get("dot").unwrap().default_value().unwrap().width, 2);
    }

    #[test]
    fn test_uncaught_duplicate_fails_plugin() {
        let (_, sandbox) = sandbox();
        sandbox.execute(&PluginScript::new(DOT, "dot.rhai")).unwrap();
        let err = sandbox
            .execute(&PluginScript::new(DOT, "again.rhai"))
            .unwrap_err();
        assert!(err.starts_with(
            "DuplicateRegistrationError: Double registration of element with id dot"
        ));
    }

    #[test]
    fn test_capabilities_read_registry_and_builtins() {
        let (registry, sandbox) = sandbox();
        let panel = Arc::new(
            ElementDefinitionBuilder::new(|_, _, _| Ok(()))
                .default_size(176, 166)
                .minimum_size(8, 8)
                .build()
                .unwrap(),
        );
        registry.register("panel", panel.clone(), None).unwrap();
        let sandbox = sandbox.with_builtins(vec![("panel".to_string(), panel)]);

        let script = r#"
            if get_registered_elements() != ["panel"] { throw "listing"; }
            if type_of(get_element("missing")) != "()" { throw "lookup"; }
            let panel = builtin("panel");
            let size = panel.default_value();
            if size.width != 176 || size.height != 166 { throw "default"; }
            let r = panel.validate_dimensions(rect(3, 4, 1, 1));
            if r.x != 3 || r.width != 8 { throw "validate"; }
            if default_elements().keys() != ["panel"] { throw "builtins"; }
            if PLUGIN_NAME != "reader.rhai" { throw "name"; }
        "#;
        sandbox
            .execute(&PluginScript::new(script, "reader.rhai"))
            .unwrap();
    }

    #[test]
    fn test_geometry_helpers() {
        let (_, sandbox) = sandbox();
        let script = r#"
            let r = validate_minimum_size(8, 8, rect(1, 2, 3, 20));
            if r.width != 8 || r.height != 20 || r.x != 1 { throw "clamp"; }
            let v = minimum_size_validator(5, 5);
            let r = v.call(rect(0, 0, 1, 1));
            if r.width != 5 { throw "curried"; }
        "#;
        sandbox
            .execute(&PluginScript::new(script, "geometry.rhai"))
            .unwrap();
    }

    #[test]
    fn test_try_call_absorbs_failures() {
        let (_, sandbox) = sandbox();
        let script = r#"
            fn boom(x) { throw "boom"; }
            fn double(x) { x * 2 }
            if try_call(Fn("boom"), [1]) != () { throw "failure not absorbed"; }
            if try_call(Fn("double"), [21]) != 42 { throw "value lost"; }
            if try_call((), []) != () { throw "absent function"; }
        "#;
        sandbox
            .execute(&PluginScript::new(script, "calls.rhai"))
            .unwrap();
    }

    #[test]
    fn test_imports_are_unavailable() {
        let (_, sandbox) = sandbox();
        let err = sandbox
            .execute(&PluginScript::new(r#"import "other" as o;"#, "imports.rhai"))
            .unwrap_err();
        assert!(err.starts_with("ModuleNotFoundError: "));
    }

    #[test]
    fn test_runaway_plugin_is_stopped() {
        let registry = Arc::new(ElementRegistry::new());
        let previews = Arc::new(PreviewCache::new(registry.clone(), 1));
        let limits = SandboxLimits {
            max_operations: 10_000,
            ..SandboxLimits::default()
        };
        let sandbox = PluginSandbox::new(registry, previews, limits);
        let err = sandbox
            .execute(&PluginScript::new("let n = 0; loop { n += 1; }", "spin.rhai"))
            .unwrap_err();
        assert!(err.starts_with("OperationLimitError: "));
    }

    #[test]
    fn test_nested_calls_share_the_time_budget() {
        let registry = Arc::new(ElementRegistry::new());
        let previews = Arc::new(PreviewCache::new(registry.clone(), 1));
        let limits = SandboxLimits {
            max_operations: 0,
            timeout: std::time::Duration::from_millis(100),
            ..SandboxLimits::default()
        };
        let sandbox = PluginSandbox::new(registry, previews, limits);

        let script = r#"
            let square = create_element_definition(#{
                render: |canvas, area, values| {},
                default_size: [4, 4],
                validate_dimensions: |area| validate_minimum_size(4, 4, area),
            });
            let start = timestamp();
            while start.elapsed < 5.0 {
                square.validate_dimensions(rect(0, 0, 1, 1));
            }
            throw "the plugin outlived its time budget";
        "#;
        let err = sandbox
            .execute(&PluginScript::new(script, "square.rhai"))
            .unwrap_err();
        assert!(err.contains("TimeoutError"), "{}", err);
    }

    #[tokio::test]
    async fn test_batch_isolates_failures_in_input_order() {
        let (registry, sandbox) = sandbox();
        let report = sandbox
            .load_batch(vec![
                PluginScript::new(DOT, "a.rhai"),
                PluginScript::new(r#"throw "broken";"#, "b.rhai"),
                PluginScript::new(DOT, "bad name!"),
            ])
            .await;

        assert_eq!(report.successful, vec!["a.rhai"]);
        assert_eq!(
            report.errored,
            vec![
                PluginFailure {
                    name: "b.rhai".to_string(),
                    exception: "broken".to_string(),
                },
                PluginFailure {
                    name: "bad name!".to_string(),
                    exception: INVALID_NAME_MESSAGE.to_string(),
                },
            ]
        );
        assert_eq!(registry.count(), 1);
    }

    #[tokio::test]
    async fn test_status_transitions_once() {
        let (_, sandbox) = sandbox();
        let mut updates = sandbox.subscribe();
        assert_eq!(sandbox.status(), PluginLoadStatus::Loading);

        let source = StaticPluginSource::from_scripts(vec![PluginScript::new(DOT, "dot.rhai")]);
        let status = sandbox.load_from(&source).await;

        updates.changed().await.unwrap();
        assert_eq!(*updates.borrow(), status);
        assert!(matches!(status, PluginLoadStatus::Loaded(ref report) if report.successful == vec!["dot.rhai"]));

        let again = sandbox
            .load_from(&StaticPluginSource::failing("late"))
            .await;
        assert_eq!(again, status);
    }

    #[tokio::test]
    async fn test_transport_failure_is_top_level() {
        let (registry, sandbox) = sandbox();
        let status = sandbox
            .load_from(&StaticPluginSource::new(serde_json::json!([["only source"]])))
            .await;
        assert_eq!(
            status,
            PluginLoadStatus::Errored {
                exception: source::WRONG_RESPONSE_MESSAGE.to_string()
            }
        );
        assert_eq!(registry.count(), 0);
    }
}
