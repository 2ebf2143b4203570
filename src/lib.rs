#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
//! # proc-lifecycle: Component Lifecycle Orchestration
//!
//! A process-wide supervisor for named, interdependent subsystems. Components
//! are registered under a key, declare the keys they depend on, and are driven
//! through start, reload and stop in dependency order, with hooks around each
//! phase and a single coordinated cancellation path.
//!
//! ## Key Features
//!
//! - **Dependency Ordering**: deterministic start order, reversed for stop, with
//!   cycle detection
//! - **Failure Aggregation**: every component is attempted; all failures of a
//!   phase are reported together
//! - **Hooks**: ordered subscribers before and after start, reload and stop
//! - **Coordinated Shutdown**: explicit cancel, termination signals or a parent
//!   context all lead to one teardown (cleanup callbacks, then stop)
//! - **Configuration**: figment-backed settings for the orchestrator and a
//!   swappable provider for component settings
//! - **Structured Logging**: `tracing` events with component and phase fields
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use proc_lifecycle::{Component, ComponentGetter, ConfigSource, Orchestrator, Result};
//! use std::sync::atomic::{AtomicBool, Ordering};
//!
//! #[derive(Default)]
//! struct Database {
//!     started: AtomicBool,
//! }
//!
//! impl Component for Database {
//!     fn type_name(&self) -> &str {
//!         "database"
//!     }
//!
//!     fn start(&self, _: &ComponentGetter, _: &ConfigSource) -> Result<()> {
//!         self.started.store(true, Ordering::Release);
//!         Ok(())
//!     }
//!
//!     fn reload(&self, _: &ComponentGetter, _: &ConfigSource) -> Result<()> {
//!         Ok(())
//!     }
//!
//!     fn stop(&self) {
//!         self.started.store(false, Ordering::Release);
//!     }
//!
//!     fn is_started(&self) -> bool {
//!         self.started.load(Ordering::Acquire)
//!     }
//!
//!     fn is_running(&self, _: bool) -> bool {
//!         self.is_started()
//!     }
//! }
//!
//! fn main() -> Result<()> {
//!     let orchestrator = Orchestrator::new()?;
//!     orchestrator.component_set("db", Database::default())?;
//!     orchestrator.start()?;
//!
//!     // Blocks until SIGTERM/SIGINT/SIGQUIT, then stops every component.
//!     orchestrator.wait_notify_blocking()
//! }
//! ```

mod component;
mod config_source;
mod error;
mod orchestrator;
mod registry;

pub mod config;
pub mod context;
pub mod hooks;
pub mod logging;
pub mod resolver;
pub mod signal;

pub use component::{Component, ComponentGetter, ComponentHookFn, Wiring};
pub use config::{Config, ConfigBuilder, LogConfig, LogLevel, ShutdownConfig};
pub use config_source::ConfigSource;
pub use context::{CancelReason, Context};
pub use error::{Error, ErrorCode, Result};
pub use hooks::{HookPoint, Phase, StopHookPoint};
pub use orchestrator::{CancelFn, Orchestrator, OrchestratorBuilder};
pub use registry::Registry;
pub use signal::{SignalConfig, SignalHandler, SignalHandling};

/// Version of the proc-lifecycle library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
