//! Hooks run around the lifecycle phases.
//!
//! Each hook point holds an ordered list of subscribers. `set` keeps the
//! single-slot behaviour (the list is replaced by one hook), `add` appends
//! another subscriber. Start and reload hooks are fallible and the first
//! error aborts the phase; stop hooks cannot fail.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::error::{Error, Result};

/// Fallible hook invoked before or after start/reload.
pub type HookFn = Arc<dyn Fn() -> Result<()> + Send + Sync>;

/// Hook invoked before or after stop.
pub type StopHookFn = Arc<dyn Fn() + Send + Sync>;

/// Lifecycle phase that can fail and be aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Forward start of every component
    Start,
    /// Forward reload of every component
    Reload,
}

impl Phase {
    /// Lowercase verb used in messages and logs.
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Reload => "reload",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// Point around a fallible phase where hooks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    /// Before any component is started
    StartBefore,
    /// After every component has been started
    StartAfter,
    /// Before any component is reloaded
    ReloadBefore,
    /// After every component has been reloaded
    ReloadAfter,
}

impl HookPoint {
    /// Hook point running before `phase`.
    #[must_use]
    pub const fn before(phase: Phase) -> Self {
        match phase {
            Phase::Start => Self::StartBefore,
            Phase::Reload => Self::ReloadBefore,
        }
    }

    /// Hook point running after `phase`.
    #[must_use]
    pub const fn after(phase: Phase) -> Self {
        match phase {
            Phase::Start => Self::StartAfter,
            Phase::Reload => Self::ReloadAfter,
        }
    }

    /// Phase this hook point belongs to.
    #[must_use]
    pub const fn phase(self) -> Phase {
        match self {
            Self::StartBefore | Self::StartAfter => Phase::Start,
            Self::ReloadBefore | Self::ReloadAfter => Phase::Reload,
        }
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StartBefore => write!(f, "start-before"),
            Self::StartAfter => write!(f, "start-after"),
            Self::ReloadBefore => write!(f, "reload-before"),
            Self::ReloadAfter => write!(f, "reload-after"),
        }
    }
}

/// Point around the stop phase where hooks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopHookPoint {
    /// Before any component is stopped
    Before,
    /// After every component has been stopped
    After,
}

/// Subscriber lists for every hook point.
#[derive(Default)]
pub struct Hooks {
    phase: RwLock<HashMap<HookPoint, Vec<HookFn>>>,
    stop: RwLock<HashMap<StopHookPoint, Vec<StopHookFn>>>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase: HashMap<HookPoint, usize> =
            self.phase.read().iter().map(|(k, v)| (*k, v.len())).collect();
        let stop: HashMap<StopHookPoint, usize> =
            self.stop.read().iter().map(|(k, v)| (*k, v.len())).collect();
        f.debug_struct("Hooks")
            .field("phase", &phase)
            .field("stop", &stop)
            .finish()
    }
}

impl Hooks {
    /// Create an empty hook set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every subscriber of `point` with `hook`.
    pub fn set<F>(&self, point: HookPoint, hook: F)
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        self.phase.write().insert(point, vec![Arc::new(hook) as HookFn]);
    }

    /// Append `hook` to the subscribers of `point`.
    pub fn add<F>(&self, point: HookPoint, hook: F)
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        self.phase.write().entry(point).or_default().push(Arc::new(hook));
    }

    /// Replace every subscriber of the stop hook `point` with `hook`.
    pub fn set_stop<F>(&self, point: StopHookPoint, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.stop.write().insert(point, vec![Arc::new(hook) as StopHookFn]);
    }

    /// Append `hook` to the subscribers of the stop hook `point`.
    pub fn add_stop<F>(&self, point: StopHookPoint, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.stop.write().entry(point).or_default().push(Arc::new(hook));
    }

    /// Remove every hook, fallible and stop alike.
    pub fn clear(&self) {
        self.phase.write().clear();
        self.stop.write().clear();
    }

    /// Number of subscribers registered at `point`.
    #[must_use]
    pub fn len(&self, point: HookPoint) -> usize {
        self.phase.read().get(&point).map_or(0, Vec::len)
    }

    /// Number of subscribers registered at the stop hook `point`.
    #[must_use]
    pub fn stop_len(&self, point: StopHookPoint) -> usize {
        self.stop.read().get(&point).map_or(0, Vec::len)
    }

    /// Run the subscribers of `point` in order; the first error is returned.
    ///
    /// The list is snapshotted first so a hook may register other hooks.
    pub(crate) fn run(&self, point: HookPoint) -> Result<()> {
        let hooks = self.phase.read().get(&point).cloned().unwrap_or_default();
        for hook in hooks {
            hook().map_err(|e| Error::hook(point, e))?;
        }
        debug!(hook = %point, "hooks completed");
        Ok(())
    }

    /// Run the stop subscribers of `point`.
    pub(crate) fn run_stop(&self, point: StopHookPoint) {
        let hooks = self.stop.read().get(&point).cloned().unwrap_or_default();
        for hook in hooks {
            hook();
        }
    }
}
