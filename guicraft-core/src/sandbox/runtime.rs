//! Script engine construction and calls back into plugin code.

use super::exception::render_exception;
use crate::config::PluginConfig;
use rhai::module_resolvers::DummyModuleResolver;
use rhai::{Dynamic, Engine, FnPtr, FuncArgs, Scope, AST};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Tracing target of everything plugins log.
pub const PLUGIN_LOG_TARGET: &str = "guicraft::plugin";

/// Resource limits applied to every plugin engine.
#[derive(Debug, Clone, PartialEq)]
pub struct SandboxLimits {
    /// Operation budget per call into the script (0 = unlimited)
    pub max_operations: u64,
    /// Wall-clock budget per call into the script (zero = unlimited)
    pub timeout: Duration,
    pub max_call_levels: usize,
    pub max_string_size: usize,
    pub max_array_size: usize,
    pub max_map_size: usize,
}

impl From<&PluginConfig> for SandboxLimits {
    fn from(config: &PluginConfig) -> Self {
        Self {
            max_operations: config.max_operations,
            timeout: Duration::from_millis(config.timeout_ms),
            max_call_levels: config.max_call_levels,
            max_string_size: config.max_string_size,
            max_array_size: config.max_array_size,
            max_map_size: config.max_map_size,
        }
    }
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self::from(&PluginConfig::default())
    }
}

/// Wall-clock deadline checked from the engine's progress callback.
#[derive(Debug)]
pub(crate) struct Deadline {
    epoch: Instant,
    // nanoseconds after `epoch`; 0 while disarmed
    expires_at: AtomicU64,
}

impl Deadline {
    pub(crate) fn new() -> Self {
        Self {
            epoch: Instant::now(),
            expires_at: AtomicU64::new(0),
        }
    }

    pub(crate) fn arm(&self, timeout: Duration) {
        if timeout.is_zero() {
            self.expires_at.store(0, Ordering::Relaxed);
            return;
        }
        let expires_at = self.epoch.elapsed().saturating_add(timeout);
        let nanos = u64::try_from(expires_at.as_nanos()).unwrap_or(u64::MAX).max(1);
        self.expires_at.store(nanos, Ordering::Relaxed);
    }

    pub(crate) fn expired(&self) -> bool {
        match self.expires_at.load(Ordering::Relaxed) {
            0 => false,
            limit => self.epoch.elapsed().as_nanos() > u128::from(limit),
        }
    }
}

/// Create a locked-down engine for `plugin`.
///
/// Module imports resolve to nothing, `eval` is unavailable and all output
/// goes through tracing with the plugin's name as prefix.
pub(crate) fn new_engine(plugin: &str, limits: &SandboxLimits, deadline: Arc<Deadline>) -> Engine {
    let mut engine = Engine::new();
    engine.set_module_resolver(DummyModuleResolver::new());
    engine.disable_symbol("eval");

    engine.set_max_operations(limits.max_operations);
    engine.set_max_call_levels(limits.max_call_levels);
    engine.set_max_string_size(limits.max_string_size);
    engine.set_max_array_size(limits.max_array_size);
    engine.set_max_map_size(limits.max_map_size);

    engine.on_progress(move |_| {
        if deadline.expired() {
            Some(Dynamic::from("Plugin exceeded its time budget".to_string()))
        } else {
            None
        }
    });

    let name = plugin.to_string();
    engine.on_print(move |text| info!(target: PLUGIN_LOG_TARGET, "[{}]: {}", name, text));
    let name = plugin.to_string();
    engine.on_debug(move |text, _, position| {
        debug!(target: PLUGIN_LOG_TARGET, "[{}]: {} ({})", name, text, position)
    });

    engine
}

/// A compiled plugin and the engine it runs in.
///
/// Definitions created by a plugin keep its runtime alive so their render and
/// sizing functions can be called long after the plugin body finished.
pub struct ScriptRuntime {
    name: String,
    engine: Engine,
    ast: AST,
    deadline: Arc<Deadline>,
    timeout: Duration,
    // calls into the script currently in progress
    depth: AtomicUsize,
}

/// Leaves a call into the script when dropped.
struct CallGuard<'a>(&'a AtomicUsize);

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptRuntime {
    pub(crate) fn new(
        name: &str,
        engine: Engine,
        ast: AST,
        deadline: Arc<Deadline>,
        timeout: Duration,
    ) -> Self {
        Self {
            name: name.to_string(),
            engine,
            ast,
            deadline,
            timeout,
            depth: AtomicUsize::new(0),
        }
    }

    /// Declared name of the plugin.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the plugin body once with `scope` as its global scope.
    pub(crate) fn run_body(&self, scope: &mut Scope) -> Result<(), String> {
        let _guard = self.enter();
        self.engine
            .run_ast_with_scope(scope, &self.ast)
            .map_err(|err| render_exception(&err, &self.name))
    }

    /// Enter a call into the script. Only the outermost call starts a fresh
    /// time budget; nested calls run on the budget of the call around them.
    fn enter(&self) -> CallGuard<'_> {
        if self.depth.fetch_add(1, Ordering::SeqCst) == 0 {
            self.deadline.arm(self.timeout);
        }
        CallGuard(&self.depth)
    }

    /// Call a script function, with a fresh time budget unless another call
    /// into this plugin is already running.
    ///
    /// # Errors
    ///
    /// Returns the rendered script exception.
    pub fn call<T: Clone + Send + Sync + 'static>(
        &self,
        function: &FnPtr,
        args: impl FuncArgs,
    ) -> anyhow::Result<T> {
        let _guard = self.enter();
        function
            .call::<T>(&self.engine, &self.ast, args)
            .map_err(|err| anyhow::anyhow!(render_exception(&err, &self.name)))
    }
}

impl std::fmt::Debug for ScriptRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptRuntime")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
