//! The contract every managed component implements.
//!
//! The orchestrator only ever talks to a component through [`Component`]; it
//! never inspects internals. Components own their own synchronization, so
//! every lifecycle method takes `&self`.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use dashmap::DashMap;

use crate::config_source::ConfigSource;
use crate::context::Context;
use crate::error::Result;

pub(crate) type ComponentMap = DashMap<String, Arc<dyn Component>>;

/// Hook a component invokes around its own start or reload, receiving the
/// component itself.
pub type ComponentHookFn = Arc<dyn Fn(&dyn Component) -> Result<()> + Send + Sync>;

/// Trait for subsystems that can be managed by the orchestrator.
pub trait Component: Any + Send + Sync {
    /// Short identifier of the kind of component (`"database"`, `"http"`, ...).
    fn type_name(&self) -> &str;

    /// Receive the registry wiring.
    ///
    /// Called exactly once per [`Registry::set`](crate::Registry::set), before
    /// the component is stored.
    fn init(&mut self, wiring: Wiring) {
        let _ = wiring;
    }

    /// Perform all initialization. On success [`Component::is_started`] must
    /// report true.
    ///
    /// `components` reaches already-started dependencies, `config` reads this
    /// component's settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the component could not be started.
    fn start(&self, components: &ComponentGetter, config: &ConfigSource) -> Result<()>;

    /// Apply new configuration without a full stop/start cycle when possible.
    /// On failure the component should keep its last good state.
    ///
    /// # Errors
    ///
    /// Returns an error if the new configuration could not be applied.
    fn reload(&self, components: &ComponentGetter, config: &ConfigSource) -> Result<()>;

    /// Release all resources. Must be idempotent and must not fail;
    /// problems are handled (logged) internally.
    ///
    /// During teardown this runs with the teardown in progress. Cancelling the
    /// orchestrator from here returns immediately, but waiting on another
    /// thread that cancels it deadlocks.
    fn stop(&self);

    /// Whether the component finished starting.
    fn is_started(&self) -> bool;

    /// Whether the component is serving. With `at_least_one`, a component
    /// running several units reports true if any of them runs.
    fn is_running(&self, at_least_one: bool) -> bool;

    /// Install hooks run around this component's own start, nested inside the
    /// orchestrator-level start hooks. Ignored unless the component supports
    /// them.
    fn register_func_start(&self, before: ComponentHookFn, after: ComponentHookFn) {
        let _ = (before, after);
    }

    /// Same as [`Component::register_func_start`], around reload.
    fn register_func_reload(&self, before: ComponentHookFn, after: ComponentHookFn) {
        let _ = (before, after);
    }

    /// Keys of the components that must be started first.
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// Default configuration fragment (JSON), used to bootstrap config files.
    fn default_config(&self) -> Vec<u8> {
        Vec::new()
    }
}

impl dyn Component {
    /// Downcast to the concrete component type.
    #[must_use]
    pub fn downcast_ref<T: Component>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref::<T>()
    }
}

impl fmt::Debug for dyn Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("type", &self.type_name())
            .field("started", &self.is_started())
            .finish_non_exhaustive()
    }
}

/// Accessors handed to a component when it is registered.
#[derive(Debug, Clone)]
pub struct Wiring {
    /// Key the component is registered under
    pub key: String,
    /// Context of the owning orchestrator, cancelled on shutdown
    pub context: Context,
    /// Lookup into the registry
    pub components: ComponentGetter,
    /// Configuration value source
    pub config: ConfigSource,
}

/// Read-only lookup into the registry, handed to components.
///
/// Holds the registry weakly so a component storing it does not keep the
/// registry alive.
#[derive(Clone)]
pub struct ComponentGetter {
    map: Weak<ComponentMap>,
}

impl fmt::Debug for ComponentGetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentGetter")
            .field("alive", &(self.map.strong_count() > 0))
            .finish()
    }
}

impl ComponentGetter {
    pub(crate) fn new(map: &Arc<ComponentMap>) -> Self {
        Self {
            map: Arc::downgrade(map),
        }
    }

    /// Get the component registered under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Arc<dyn Component>> {
        self.map
            .upgrade()
            .and_then(|map| map.get(key).map(|entry| Arc::clone(entry.value())))
    }

    /// Check if a component is registered under `key`.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.map
            .upgrade()
            .is_some_and(|map| map.contains_key(key))
    }
}
