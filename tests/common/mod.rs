//! Shared test component recording every lifecycle call.

#![allow(dead_code)]

use parking_lot::Mutex;
use proc_lifecycle::{
    Component, ComponentGetter, ComponentHookFn, ConfigSource, Error, Result, Wiring,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Ordered journal shared by components and hooks.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(journal: &Journal, prefix: &str) -> Vec<String> {
    journal
        .lock()
        .iter()
        .filter(|e| e.starts_with(prefix))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    Ok,
    Fail,
    /// Return success without becoming started
    Silent,
}

type HookPair = Mutex<Option<(ComponentHookFn, ComponentHookFn)>>;

pub struct Recorder {
    key: String,
    journal: Journal,
    deps: Vec<String>,
    on_start: Behaviour,
    on_reload: Behaviour,
    started: AtomicBool,
    stops: Arc<AtomicUsize>,
    start_hooks: HookPair,
    reload_hooks: HookPair,
}

impl Recorder {
    pub fn new(journal: &Journal, deps: &[&str]) -> Self {
        Self {
            key: String::new(),
            journal: Arc::clone(journal),
            deps: deps.iter().map(ToString::to_string).collect(),
            on_start: Behaviour::Ok,
            on_reload: Behaviour::Ok,
            started: AtomicBool::new(false),
            stops: Arc::new(AtomicUsize::new(0)),
            start_hooks: Mutex::new(None),
            reload_hooks: Mutex::new(None),
        }
    }

    pub fn on_start(mut self, behaviour: Behaviour) -> Self {
        self.on_start = behaviour;
        self
    }

    pub fn on_reload(mut self, behaviour: Behaviour) -> Self {
        self.on_reload = behaviour;
        self
    }

    /// Counter of stop calls, readable after the component is registered.
    pub fn stop_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.stops)
    }

    fn apply(&self, verb: &str, behaviour: Behaviour, hooks: &HookPair) -> Result<()> {
        let hooks = hooks.lock().clone();
        if let Some((before, _)) = &hooks {
            before(self)?;
        }

        self.journal.lock().push(format!("{verb}:{}", self.key));
        let result = match behaviour {
            Behaviour::Ok => {
                self.started.store(true, Ordering::Release);
                Ok(())
            }
            Behaviour::Fail => Err(Error::component(&self.key, format!("{verb} refused"))),
            Behaviour::Silent => {
                self.started.store(false, Ordering::Release);
                Ok(())
            }
        };

        if let (Ok(()), Some((_, after))) = (&result, &hooks) {
            after(self)?;
        }
        result
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Component for Recorder {
    fn type_name(&self) -> &str {
        "recorder"
    }

    fn init(&mut self, wiring: Wiring) {
        self.key = wiring.key;
    }

    fn start(&self, _: &ComponentGetter, _: &ConfigSource) -> Result<()> {
        self.apply("start", self.on_start, &self.start_hooks)
    }

    fn reload(&self, _: &ComponentGetter, _: &ConfigSource) -> Result<()> {
        self.apply("reload", self.on_reload, &self.reload_hooks)
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if self.started.swap(false, Ordering::AcqRel) {
            self.journal.lock().push(format!("stop:{}", self.key));
        }
    }

    fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    fn is_running(&self, _: bool) -> bool {
        self.is_started()
    }

    fn register_func_start(&self, before: ComponentHookFn, after: ComponentHookFn) {
        *self.start_hooks.lock() = Some((before, after));
    }

    fn register_func_reload(&self, before: ComponentHookFn, after: ComponentHookFn) {
        *self.reload_hooks.lock() = Some((before, after));
    }

    fn dependencies(&self) -> Vec<String> {
        self.deps.clone()
    }
}

/// Poll `cond` until it holds or `timeout` elapses.
pub fn eventually<F: Fn() -> bool>(timeout: Duration, cond: F) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}
