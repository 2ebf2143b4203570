//! Lifecycle engine and shutdown coordination.
//!
//! An [`Orchestrator`] owns a [`Registry`] of components, the hooks around
//! each phase, a cancellable [`Context`] and a set of cleanup callbacks.
//!
//! * `start` / `reload` visit every component in dependency order. Every
//!   component is attempted; failures are collected into one
//!   [`Error::Phase`] aggregate. A failing before-hook aborts the phase.
//! * `stop` visits the same order reversed and never fails.
//! * Cancelling the context, from an explicit [`Orchestrator::cancel`], a
//!   termination signal or a cancelled parent context, runs every cleanup
//!   callback once and then `stop`, exactly once per orchestrator.
//!
//! A background watcher thread per orchestrator blocks on the context and
//! performs that teardown. It only holds a weak reference, so dropping the
//! last [`Orchestrator`] handle lets it exit.

use figment::Figment;
use parking_lot::{Mutex, ReentrantMutex};
use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use tracing::{debug, error, info, instrument, warn};

use crate::component::Component;
use crate::config::Config;
use crate::config_source::ConfigSource;
use crate::context::{CancelReason, Context};
use crate::error::{Error, ErrorCode, Result};
use crate::hooks::{HookPoint, Hooks, Phase, StopHookPoint};
use crate::registry::Registry;
use crate::resolver;
use crate::signal::{SignalConfig, SignalHandler};

/// Cleanup callback run once when the orchestrator is cancelled.
pub type CancelFn = Box<dyn FnOnce() + Send + 'static>;

struct Inner {
    config: Config,
    context: Context,
    registry: Registry,
    source: ConfigSource,
    hooks: Hooks,
    signals: SignalConfig,
    cancel_fns: Mutex<BTreeMap<u64, CancelFn>>,
    cancel_seq: AtomicU64,
    /// Set once teardown has begun; held for its whole duration
    teardown: ReentrantMutex<Cell<bool>>,
}

impl Inner {
    fn dependencies(&self) -> Result<Vec<String>> {
        let keys = self.registry.keys();
        let deps: HashMap<String, Vec<String>> = keys
            .iter()
            .filter_map(|key| {
                self.registry
                    .get(key)
                    .map(|component| (key.clone(), component.dependencies()))
            })
            .collect();
        resolver::resolve(&keys, &deps)
    }

    fn run_phase(&self, phase: Phase) -> Result<()> {
        self.hooks.run(HookPoint::before(phase))?;
        let order = self.dependencies()?;

        let getter = self.registry.getter();
        let mut failures = Vec::new();

        for key in &order {
            let Some(component) = self.registry.get(key) else {
                continue;
            };

            info!(component = %key, phase = %phase, "{} component", progressive(phase));
            let result = match phase {
                Phase::Start => component.start(&getter, &self.source),
                Phase::Reload => component.reload(&getter, &self.source),
            };
            self.registry.update(key, Arc::clone(&component));

            match result {
                Err(e) => {
                    error!(component = %key, phase = %phase, error = %e, "component returned an error");
                    failures.push(Error::component_phase(phase, key, e));
                }
                Ok(()) if !component.is_started() => {
                    let e = Error::component_not_started(phase, key);
                    error!(component = %key, phase = %phase, error = %e, "component is not started");
                    failures.push(e);
                }
                Ok(()) => {}
            }
        }

        if !failures.is_empty() {
            return Err(Error::phase(phase, failures));
        }

        self.hooks.run(HookPoint::after(phase))
    }

    fn stop(&self) {
        self.hooks.run_stop(StopHookPoint::Before);

        let order = match self.dependencies() {
            Ok(mut order) => {
                order.reverse();
                order
            }
            Err(e) => {
                warn!(error = %e, "cannot order components, stopping in key order");
                self.registry.keys()
            }
        };

        for key in &order {
            if let Some(component) = self.registry.get(key) {
                debug!(component = %key, "stopping component");
                component.stop();
            }
        }

        self.hooks.run_stop(StopHookPoint::After);
    }

    fn run_cancel_fns(&self) {
        loop {
            let next = self.cancel_fns.lock().pop_first();
            match next {
                Some((id, f)) => {
                    debug!(callback = id, "running cancel callback");
                    f();
                }
                None => break,
            }
        }
    }

    /// Cleanup callbacks then stop, at most once.
    ///
    /// A concurrent caller blocks until the first one finished; a re-entrant
    /// call from a callback or component returns immediately. The guard is held
    /// across user code, so user code must not wait on another thread that
    /// cancels.
    fn teardown(&self) {
        let guard = self.teardown.lock();
        if guard.replace(true) {
            return;
        }

        info!(
            orchestrator = %self.config.name,
            reason = ?self.context.reason(),
            "Cancellation received, tearing down components"
        );
        self.run_cancel_fns();
        self.stop();
        info!(orchestrator = %self.config.name, "Teardown complete");
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.context.cancel(CancelReason::Dropped);
    }
}

const fn progressive(phase: Phase) -> &'static str {
    match phase {
        Phase::Start => "starting",
        Phase::Reload => "reloading",
    }
}

fn spawn_watcher(inner: &Arc<Inner>) -> Result<()> {
    let weak: Weak<Inner> = Arc::downgrade(inner);
    let context = inner.context.clone();

    thread::Builder::new()
        .name(format!("{}-watcher", inner.config.name))
        .spawn(move || {
            context.wait();
            match weak.upgrade() {
                Some(inner) => inner.teardown(),
                None => debug!("Orchestrator dropped, watcher exiting"),
            }
        })
        .map(drop)
        .map_err(|e| {
            Error::runtime_with_source(
                ErrorCode::RuntimeSpawnError,
                "Failed to spawn cancellation watcher thread",
                e,
            )
        })
}

/// Supervisor of a set of interdependent components.
///
/// Cloning is cheap and every clone drives the same components.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("name", &self.inner.config.name)
            .field("components", &self.inner.registry.keys())
            .field("hooks", &self.inner.hooks)
            .field("context", &self.inner.context)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Create a new orchestrator builder.
    #[must_use]
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    /// Create an orchestrator with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the watcher thread cannot be spawned.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Orchestrator configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Cancellation context shared with every component.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.inner.context
    }

    /// Check if the orchestrator has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.context.is_cancelled()
    }

    /// Underlying component registry.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Source components read their configuration from.
    #[must_use]
    pub fn config_source(&self) -> &ConfigSource {
        &self.inner.source
    }

    /// Replace the provider components read their configuration from.
    /// Takes effect on the next start or reload.
    pub fn set_config_provider(&self, provider: Figment) {
        self.inner.source.set_provider(provider);
    }

    // Lifecycle

    /// Start every component in dependency order.
    ///
    /// # Errors
    ///
    /// Returns the start-before hook error, [`Error::DependencyCycle`] if no
    /// order exists, a [`Error::Phase`] aggregate of every failed component,
    /// or the start-after hook error.
    #[instrument(skip(self), fields(orchestrator = %self.inner.config.name))]
    pub fn start(&self) -> Result<()> {
        self.inner.run_phase(Phase::Start)
    }

    /// Reload every component in dependency order.
    ///
    /// # Errors
    ///
    /// Same as [`Orchestrator::start`], for the reload hooks.
    #[instrument(skip(self), fields(orchestrator = %self.inner.config.name))]
    pub fn reload(&self) -> Result<()> {
        self.inner.run_phase(Phase::Reload)
    }

    /// Stop every component in reverse dependency order. Never fails.
    #[instrument(skip(self), fields(orchestrator = %self.inner.config.name))]
    pub fn stop(&self) {
        self.inner.stop();
    }

    // Components

    /// Register `component` under `key`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns a registry error if `key` is empty.
    pub fn component_set<K: Into<String>, C: Component>(&self, key: K, component: C) -> Result<()> {
        self.inner.registry.set(key, component)
    }

    /// Register an already boxed component under `key`.
    ///
    /// # Errors
    ///
    /// Returns a registry error if `key` is empty.
    pub fn component_set_boxed<K: Into<String>>(&self, key: K, component: Box<dyn Component>) -> Result<()> {
        self.inner.registry.set_boxed(key, component)
    }

    /// Get the component registered under `key`.
    #[must_use]
    pub fn component_get(&self, key: &str) -> Option<Arc<dyn Component>> {
        self.inner.registry.get(key)
    }

    /// Check if a component is registered under `key`.
    #[must_use]
    pub fn component_has(&self, key: &str) -> bool {
        self.inner.registry.has(key)
    }

    /// Type name of the component under `key`, empty if absent.
    #[must_use]
    pub fn component_type(&self, key: &str) -> String {
        self.inner
            .registry
            .get(key)
            .map(|component| component.type_name().to_string())
            .unwrap_or_default()
    }

    /// Remove the component under `key` without stopping it.
    pub fn component_del(&self, key: &str) -> Option<Arc<dyn Component>> {
        self.inner.registry.delete(key)
    }

    /// Snapshot of every registered component.
    #[must_use]
    pub fn component_list(&self) -> HashMap<String, Arc<dyn Component>> {
        self.inner.registry.list()
    }

    /// Every registered key, sorted.
    #[must_use]
    pub fn component_keys(&self) -> Vec<String> {
        self.inner.registry.keys()
    }

    /// Visit components in key order until `f` returns false.
    pub fn component_walk<F>(&self, f: F)
    where
        F: FnMut(&str, &Arc<dyn Component>) -> bool,
    {
        self.inner.registry.walk(f);
    }

    /// Keys in start order (dependencies first).
    ///
    /// # Errors
    ///
    /// Returns [`Error::DependencyCycle`] if the dependencies form a cycle.
    pub fn component_dependencies(&self) -> Result<Vec<String>> {
        self.inner.dependencies()
    }

    /// True when every component reports started (vacuously true when empty).
    #[must_use]
    pub fn component_is_started(&self) -> bool {
        self.inner
            .registry
            .list()
            .values()
            .all(|component| component.is_started())
    }

    /// With `at_least_one`, true when any component runs; otherwise true when
    /// every component runs.
    #[must_use]
    pub fn component_is_running(&self, at_least_one: bool) -> bool {
        let components = self.inner.registry.list();
        if at_least_one {
            components.values().any(|c| c.is_running(true))
        } else {
            components.values().all(|c| c.is_running(false))
        }
    }

    /// Default configuration of every component as one pretty-printed JSON
    /// object keyed by component key.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the component whose fragment is
    /// not valid JSON.
    pub fn default_config(&self) -> Result<String> {
        let mut root = serde_json::Map::new();

        for key in self.inner.registry.keys() {
            let Some(component) = self.inner.registry.get(&key) else {
                continue;
            };
            let fragment = component.default_config();
            if fragment.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            let value: serde_json::Value = serde_json::from_slice(&fragment).map_err(|e| {
                Error::config_with_source(
                    ErrorCode::ConfigParse,
                    format!("invalid default configuration for component '{key}'"),
                    e,
                )
            })?;
            root.insert(key, value);
        }

        Ok(serde_json::to_string_pretty(&serde_json::Value::Object(root))?)
    }

    // Hooks

    /// Set the hook run before any component starts, replacing others.
    pub fn register_func_start_before<F>(&self, f: F)
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        self.inner.hooks.set(HookPoint::StartBefore, f);
    }

    /// Set the hook run after every component started, replacing others.
    pub fn register_func_start_after<F>(&self, f: F)
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        self.inner.hooks.set(HookPoint::StartAfter, f);
    }

    /// Set the hook run before any component reloads, replacing others.
    pub fn register_func_reload_before<F>(&self, f: F)
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        self.inner.hooks.set(HookPoint::ReloadBefore, f);
    }

    /// Set the hook run after every component reloaded, replacing others.
    pub fn register_func_reload_after<F>(&self, f: F)
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        self.inner.hooks.set(HookPoint::ReloadAfter, f);
    }

    /// Set the hook run before components stop, replacing others.
    pub fn register_func_stop_before<F>(&self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.hooks.set_stop(StopHookPoint::Before, f);
    }

    /// Set the hook run after components stopped, replacing others.
    pub fn register_func_stop_after<F>(&self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.hooks.set_stop(StopHookPoint::After, f);
    }

    /// Append a hook at a start or reload hook point.
    pub fn add_func<F>(&self, point: HookPoint, f: F)
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        self.inner.hooks.add(point, f);
    }

    /// Append a hook at a stop hook point.
    pub fn add_func_stop<F>(&self, point: StopHookPoint, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.hooks.add_stop(point, f);
    }

    // Cancellation

    /// Register a cleanup callback run once on cancellation. Returns its id.
    ///
    /// Callbacks run while teardown is in progress: calling
    /// [`Orchestrator::cancel`] from the callback itself returns immediately,
    /// but handing it to another thread and waiting for that thread
    /// deadlocks, since other threads wait for teardown to finish.
    pub fn cancel_add<F>(&self, f: F) -> u64
    where
        F: FnOnce() + Send + 'static,
    {
        let id = self.inner.cancel_seq.fetch_add(1, Ordering::Relaxed);
        self.inner.cancel_fns.lock().insert(id, Box::new(f));
        id
    }

    /// Register several cleanup callbacks at once.
    pub fn cancel_add_all<I>(&self, fns: I) -> Vec<u64>
    where
        I: IntoIterator<Item = CancelFn>,
    {
        let mut map = self.inner.cancel_fns.lock();
        fns.into_iter()
            .map(|f| {
                let id = self.inner.cancel_seq.fetch_add(1, Ordering::Relaxed);
                map.insert(id, f);
                id
            })
            .collect()
    }

    /// Remove the cleanup callback `id` without running it.
    pub fn cancel_remove(&self, id: u64) -> bool {
        self.inner.cancel_fns.lock().remove(&id).is_some()
    }

    /// Remove every cleanup callback without running them.
    pub fn cancel_clean(&self) {
        self.inner.cancel_fns.lock().clear();
    }

    /// Number of pending cleanup callbacks.
    #[must_use]
    pub fn cancel_len(&self) -> usize {
        self.inner.cancel_fns.lock().len()
    }

    /// Cancel the context, run the cleanup callbacks and stop every
    /// component. Returns once teardown is complete.
    pub fn cancel(&self) {
        self.inner.context.cancel(CancelReason::Requested);
        self.inner.teardown();
    }

    /// Cancel, tear down, then exit the process with `code`.
    pub fn shutdown(&self, code: i32) -> ! {
        self.inner.context.cancel(CancelReason::Shutdown(code));
        self.inner.teardown();
        info!(code, "Exiting process");
        std::process::exit(code)
    }

    /// Wait for a termination signal or cancellation of the context, then
    /// tear down. Meant to be the last call of an async `main`.
    ///
    /// # Errors
    ///
    /// Returns an error if signal handlers cannot be registered or the
    /// teardown task fails.
    pub async fn wait_notify(&self) -> Result<()> {
        let handler = SignalHandler::new(self.inner.context.clone(), self.inner.signals);
        if let Some(signal) = handler.handle_signals().await? {
            info!(signal, "Termination signal received");
        }

        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.teardown())
            .await
            .map_err(|e| {
                Error::runtime_with_source(ErrorCode::RuntimeSpawnError, "Teardown task failed", e)
            })
    }

    /// Blocking variant of [`Orchestrator::wait_notify`], for a synchronous
    /// `main`. Must not be called from inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the signal runtime cannot be built, or any error of
    /// [`Orchestrator::wait_notify`].
    pub fn wait_notify_blocking(&self) -> Result<()> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                Error::runtime_with_source(
                    ErrorCode::RuntimeBuildError,
                    "Failed to build signal runtime",
                    e,
                )
            })?;
        runtime.block_on(self.wait_notify())
    }
}

/// Builder for [`Orchestrator`].
#[derive(Debug, Default)]
pub struct OrchestratorBuilder {
    config: Config,
    parent: Option<Context>,
    provider: Option<Figment>,
    signals: Option<SignalConfig>,
}

impl OrchestratorBuilder {
    /// Create a builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `config` for the orchestrator settings.
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Derive the orchestrator context from `parent`, so cancelling the
    /// parent tears the orchestrator down.
    #[must_use]
    pub fn with_parent(mut self, parent: &Context) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    /// Provider components read their configuration from.
    #[must_use]
    pub fn with_config_provider(mut self, provider: Figment) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Override the signals handled by [`Orchestrator::wait_notify`], which
    /// otherwise follow the `shutdown` section of the configuration.
    #[must_use]
    pub const fn with_signal_config(mut self, signals: SignalConfig) -> Self {
        self.signals = Some(signals);
        self
    }

    /// Build the orchestrator and spawn its watcher thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the watcher thread
    /// cannot be spawned.
    pub fn build(self) -> Result<Orchestrator> {
        self.config.validate()?;

        let context = self.parent.as_ref().map_or_else(Context::new, Context::child);
        let source = self
            .provider
            .map_or_else(ConfigSource::new, ConfigSource::with_provider);
        let registry = Registry::new(context.clone(), source.clone());
        let signals = self
            .signals
            .unwrap_or_else(|| SignalConfig::from(&self.config.shutdown));

        let inner = Arc::new(Inner {
            config: self.config,
            context,
            registry,
            source,
            hooks: Hooks::new(),
            signals,
            cancel_fns: Mutex::new(BTreeMap::new()),
            cancel_seq: AtomicU64::new(1),
            teardown: ReentrantMutex::new(Cell::new(false)),
        });
        spawn_watcher(&inner)?;

        info!(orchestrator = %inner.config.name, "Orchestrator created");
        Ok(Orchestrator { inner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentGetter;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    #[derive(Default)]
    struct Flag {
        started: AtomicBool,
        deps: Vec<String>,
        config: &'static str,
    }

    impl Component for Flag {
        fn type_name(&self) -> &str {
            "flag"
        }

        fn start(&self, _: &ComponentGetter, _: &ConfigSource) -> Result<()> {
            self.started.store(true, Ordering::Release);
            Ok(())
        }

        fn reload(&self, _: &ComponentGetter, _: &ConfigSource) -> Result<()> {
            Ok(())
        }

        fn stop(&self) {
            self.started.store(false, Ordering::Release);
        }

        fn is_started(&self) -> bool {
            self.started.load(Ordering::Acquire)
        }

        fn is_running(&self, _: bool) -> bool {
            self.is_started()
        }

        fn dependencies(&self) -> Vec<String> {
            self.deps.clone()
        }

        fn default_config(&self) -> Vec<u8> {
            self.config.as_bytes().to_vec()
        }
    }

    fn flag(deps: &[&str]) -> Flag {
        Flag {
            deps: deps.iter().map(ToString::to_string).collect(),
            ..Flag::default()
        }
    }

    #[test]
    fn test_component_accessors() {
        let orch = Orchestrator::new().unwrap();
        orch.component_set("db", flag(&[])).unwrap();

        assert!(orch.component_has("db"));
        assert_eq!(orch.component_type("db"), "flag");
        assert_eq!(orch.component_type("missing"), "");
        assert_eq!(orch.component_keys(), vec!["db".to_string()]);
        assert!(orch.component_del("db").is_some());
        assert!(orch.component_list().is_empty());
    }

    #[test]
    fn test_started_and_running_on_empty_registry() {
        let orch = Orchestrator::new().unwrap();
        assert!(orch.component_is_started());
        assert!(orch.component_is_running(false));
        assert!(!orch.component_is_running(true));
    }

    #[test]
    fn test_started_and_running_follow_components() {
        let orch = Orchestrator::new().unwrap();
        orch.component_set("a", flag(&[])).unwrap();
        orch.component_set("b", flag(&["a"])).unwrap();
        assert!(!orch.component_is_started());
        assert!(!orch.component_is_running(true));

        orch.start().unwrap();
        assert!(orch.component_is_started());
        assert!(orch.component_is_running(false));

        orch.stop();
        assert!(!orch.component_is_started());
    }

    #[test]
    fn test_default_config_aggregates_fragments() {
        let orch = Orchestrator::new().unwrap();
        orch.component_set(
            "db",
            Flag {
                config: r#"{"url":"postgres://localhost"}"#,
                ..Flag::default()
            },
        )
        .unwrap();
        orch.component_set("noop", flag(&[])).unwrap();

        let out = orch.default_config().unwrap();
        assert_eq!(out, "{\n  \"db\": {\n    \"url\": \"postgres://localhost\"\n  }\n}");
    }

    #[test]
    fn test_default_config_invalid_fragment() {
        let orch = Orchestrator::new().unwrap();
        orch.component_set(
            "broken",
            Flag {
                config: "{not json",
                ..Flag::default()
            },
        )
        .unwrap();

        let err = orch.default_config().unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_default_config_empty() {
        let orch = Orchestrator::new().unwrap();
        assert_eq!(orch.default_config().unwrap(), "{}");
    }

    #[test]
    fn test_cycle_aborts_start_before_components() {
        let orch = Orchestrator::new().unwrap();
        let before_ran = Arc::new(AtomicBool::new(false));
        let after_ran = Arc::new(AtomicBool::new(false));
        let b = Arc::clone(&before_ran);
        orch.register_func_start_before(move || {
            b.store(true, Ordering::Release);
            Ok(())
        });
        let a = Arc::clone(&after_ran);
        orch.register_func_start_after(move || {
            a.store(true, Ordering::Release);
            Ok(())
        });
        orch.component_set("a", flag(&["b"])).unwrap();
        orch.component_set("b", flag(&["a"])).unwrap();

        let err = orch.start().unwrap_err();
        assert!(err.is_cycle());
        assert!(before_ran.load(Ordering::Acquire));
        assert!(!after_ran.load(Ordering::Acquire));
        assert!(!orch.registry().get("a").unwrap().is_started());
        assert!(!orch.registry().get("b").unwrap().is_started());
        assert!(orch.component_dependencies().is_err());

        // Stop still reaches every component.
        orch.stop();
    }

    #[test]
    fn test_cancel_callbacks_bookkeeping() {
        let orch = Orchestrator::new().unwrap();
        let first = orch.cancel_add(|| {});
        let ids = orch.cancel_add_all(vec![Box::new(|| {}) as CancelFn, Box::new(|| {})]);
        assert_eq!(ids.len(), 2);
        assert!(ids.iter().all(|id| *id > first));
        assert_eq!(orch.cancel_len(), 3);

        assert!(orch.cancel_remove(first));
        assert!(!orch.cancel_remove(first));
        orch.cancel_clean();
        assert_eq!(orch.cancel_len(), 0);
    }

    #[test]
    fn test_cancel_is_synchronous_and_once() {
        let orch = Orchestrator::new().unwrap();
        orch.component_set("a", flag(&[])).unwrap();
        orch.start().unwrap();

        let stops = Arc::new(AtomicU64::new(0));
        let s = Arc::clone(&stops);
        orch.register_func_stop_after(move || {
            s.fetch_add(1, Ordering::SeqCst);
        });

        orch.cancel();
        assert!(orch.is_cancelled());
        assert!(!orch.component_is_started());
        orch.cancel();
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reentrant_cancel_from_callback() {
        let orch = Orchestrator::new().unwrap();
        let handle = orch.clone();
        let ran = Arc::new(AtomicBool::new(false));
        let r = Arc::clone(&ran);
        orch.cancel_add(move || {
            handle.cancel();
            r.store(true, Ordering::Release);
        });

        orch.cancel();
        assert!(ran.load(Ordering::Acquire));
    }

    #[test]
    fn test_drop_releases_watcher() {
        let orch = Orchestrator::new().unwrap();
        let ctx = orch.context().clone();
        drop(orch);
        assert!(ctx.wait_timeout(Duration::from_secs(1)));
        assert_eq!(ctx.reason(), Some(CancelReason::Dropped));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = Config {
            name: String::new(),
            ..Config::default()
        };
        assert!(Orchestrator::builder().with_config(config).build().is_err());
    }
}
