//! Error handling for the proc-lifecycle orchestrator.
//!
//! Every error carries a structured [`ErrorCode`] for programmatic handling,
//! a human-readable message and, where one exists, the underlying source error.
//!
//! # Error Structure
//!
//! * **Error Code**: a unique identifier grouped by thousands per concern
//! * **Message**: a human-readable description
//! * **Source**: optional underlying error that caused this one
//! * **Context-specific fields**: component key, hook point, cycle path, ...
//!
//! Lifecycle phases (start, reload) report component failures as a single
//! [`Error::Phase`] aggregate holding one entry per failing component, so a
//! caller checks [`Error::has_failures`] rather than matching on codes.
//!
//! ```no_run
//! use proc_lifecycle::{Error, Result};
//!
//! fn open_pool(url: &str) -> Result<()> {
//!     if url.is_empty() {
//!         return Err(Error::config("database url must not be empty"));
//!     }
//!     Ok(())
//! }
//! ```

use crate::hooks::{HookPoint, Phase};

/// Result type alias for proc-lifecycle operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed source error carried by every variant.
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error code enum for categorizing and identifying errors
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[non_exhaustive]
pub enum ErrorCode {
    // Configuration errors: 1000-1999
    ConfigInvalid = 1000,
    ConfigParse = 1001,
    ConfigMissing = 1002,
    ConfigProviderMissing = 1003,

    // Signal handling errors: 2000-2999
    SignalRegisterFailed = 2000,

    // Registry errors: 3000-3999
    RegistryInvalidKey = 3000,
    RegistryNotFound = 3001,

    // Component errors: 4000-4999
    ComponentStartFailed = 4000,
    ComponentReloadFailed = 4001,
    ComponentNotStarted = 4002,
    ComponentFailed = 4003,

    // Phase aggregate errors: 4100-4199
    PhaseStartFailed = 4100,
    PhaseReloadFailed = 4101,

    // Hook errors: 4200-4299
    HookFailed = 4200,

    // Dependency errors: 4300-4399
    DependencyCycle = 4300,

    // IO errors: 5000-5999
    IoError = 5000,

    // Runtime errors: 6000-6999
    RuntimeSpawnError = 6000,
    RuntimeBuildError = 6001,

    // State errors: 9000-9999
    InvalidStateValue = 9000,

    // Unknown/other errors: 99000+
    Unknown = 99999,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.as_str(), *self as i32)
    }
}

impl ErrorCode {
    /// Convert error code to string representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConfigInvalid => "CONFIG_INVALID",
            Self::ConfigParse => "CONFIG_PARSE",
            Self::ConfigMissing => "CONFIG_MISSING",
            Self::ConfigProviderMissing => "CONFIG_PROVIDER_MISSING",

            Self::SignalRegisterFailed => "SIGNAL_REGISTER_FAILED",

            Self::RegistryInvalidKey => "REGISTRY_INVALID_KEY",
            Self::RegistryNotFound => "REGISTRY_NOT_FOUND",

            Self::ComponentStartFailed => "COMPONENT_START_FAILED",
            Self::ComponentReloadFailed => "COMPONENT_RELOAD_FAILED",
            Self::ComponentNotStarted => "COMPONENT_NOT_STARTED",
            Self::ComponentFailed => "COMPONENT_FAILED",

            Self::PhaseStartFailed => "PHASE_START_FAILED",
            Self::PhaseReloadFailed => "PHASE_RELOAD_FAILED",

            Self::HookFailed => "HOOK_FAILED",

            Self::DependencyCycle => "DEPENDENCY_CYCLE",

            Self::IoError => "IO_ERROR",

            Self::RuntimeSpawnError => "RUNTIME_SPAWN_ERROR",
            Self::RuntimeBuildError => "RUNTIME_BUILD_ERROR",

            Self::InvalidStateValue => "INVALID_STATE_VALUE",

            Self::Unknown => "UNKNOWN_ERROR",
        }
    }
}

/// Comprehensive error type for all orchestrator operations.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Configuration-related errors
    #[error("Configuration error [{code}]: {message}")]
    Config {
        /// Error code for structured error handling
        code: ErrorCode,
        /// Human-readable error message
        message: String,
        /// Optional source error for better context
        #[source]
        source: Option<BoxedSource>,
    },

    /// A single component failed, or reported an inconsistent state
    #[error("Component '{key}' error [{code}]: {message}")]
    Component {
        /// Error code for structured error handling
        code: ErrorCode,
        /// Registry key of the component
        key: String,
        /// Human-readable error message
        message: String,
        /// Error returned by the component itself, if any
        #[source]
        source: Option<BoxedSource>,
    },

    /// A lifecycle hook returned an error
    #[error("Hook {hook} error [{code}]: {message}")]
    Hook {
        /// Error code for structured error handling
        code: ErrorCode,
        /// Hook point that failed
        hook: HookPoint,
        /// Human-readable error message
        message: String,
        /// Error returned by the hook
        #[source]
        source: Option<BoxedSource>,
    },

    /// Aggregate of every component failure collected during a phase
    #[error("{phase} failed [{code}]: {}", summarize(.failures))]
    Phase {
        /// Error code for structured error handling
        code: ErrorCode,
        /// Lifecycle phase that failed
        phase: Phase,
        /// One entry per failing component, in visit order
        failures: Vec<Error>,
    },

    /// The declared dependencies contain a cycle
    #[error("Dependency cycle detected [{code}]: {}", .path.join(" -> "))]
    DependencyCycle {
        /// Error code for structured error handling
        code: ErrorCode,
        /// Keys forming the cycle, first key repeated at the end
        path: Vec<String>,
    },

    /// Registry errors
    #[error("Registry error [{code}]: {message}")]
    Registry {
        /// Error code for structured error handling
        code: ErrorCode,
        /// Human-readable error message
        message: String,
    },

    /// Signal handling errors
    #[error("Signal handling error [{code}]: {message}{signal:?}")]
    Signal {
        /// Error code for structured error handling
        code: ErrorCode,
        /// Human-readable error message
        message: String,
        /// Signal number if applicable
        signal: Option<i32>,
        /// Optional source error for better context
        #[source]
        source: Option<BoxedSource>,
    },

    /// I/O operation errors
    #[error("I/O error [{code}]: {message}")]
    Io {
        /// Error code for structured error handling
        code: ErrorCode,
        /// Human-readable error message
        message: String,
        /// Optional source error for better context
        #[source]
        source: Option<BoxedSource>,
    },

    /// Runtime errors (thread spawning, runtime construction)
    #[error("Runtime error [{code}]: {message}")]
    Runtime {
        /// Error code for structured error handling
        code: ErrorCode,
        /// Human-readable error message
        message: String,
        /// Optional source error for better context
        #[source]
        source: Option<BoxedSource>,
    },

    /// Invalid state errors
    #[error("Invalid state [{code}]: {message}")]
    InvalidState {
        /// Error code for structured error handling
        code: ErrorCode,
        /// Human-readable error message
        message: String,
    },
}

fn summarize(failures: &[Error]) -> String {
    let keys: Vec<&str> = failures.iter().filter_map(Error::component_key).collect();
    let details: Vec<String> = failures.iter().map(ToString::to_string).collect();
    format!(
        "{} component(s) failed ({}): {}",
        failures.len(),
        keys.join(", "),
        details.join("; ")
    )
}

impl Error {
    /// Create a new configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::config_with_code(ErrorCode::ConfigInvalid, message)
    }

    /// Create a new configuration error with specific code.
    pub fn config_with_code<S: Into<String>>(code: ErrorCode, message: S) -> Self {
        Self::Config {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new configuration error with a source error.
    pub fn config_with_source<S, E>(code: ErrorCode, message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Config {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a generic component error, for use by component implementations.
    pub fn component<K: Into<String>, S: Into<String>>(key: K, message: S) -> Self {
        Self::Component {
            code: ErrorCode::ComponentFailed,
            key: key.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an error returned by a component during a lifecycle phase.
    pub(crate) fn component_phase(phase: Phase, key: &str, source: Self) -> Self {
        let code = match phase {
            Phase::Start => ErrorCode::ComponentStartFailed,
            Phase::Reload => ErrorCode::ComponentReloadFailed,
        };
        Self::Component {
            code,
            key: key.to_string(),
            message: format!("component '{key}' returned a {} error", phase.verb()),
            source: Some(Box::new(source)),
        }
    }

    /// A component returned success but does not report itself as started.
    pub(crate) fn component_not_started(phase: Phase, key: &str) -> Self {
        Self::Component {
            code: ErrorCode::ComponentNotStarted,
            key: key.to_string(),
            message: format!(
                "component '{key}' has been called to {}, but is not started",
                phase.verb()
            ),
            source: None,
        }
    }

    /// Create a hook failure error.
    pub(crate) fn hook(hook: HookPoint, source: Self) -> Self {
        Self::Hook {
            code: ErrorCode::HookFailed,
            hook,
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an aggregate phase error.
    pub(crate) fn phase(phase: Phase, failures: Vec<Self>) -> Self {
        let code = match phase {
            Phase::Start => ErrorCode::PhaseStartFailed,
            Phase::Reload => ErrorCode::PhaseReloadFailed,
        };
        Self::Phase {
            code,
            phase,
            failures,
        }
    }

    /// Create a dependency cycle error.
    #[must_use]
    pub const fn dependency_cycle(path: Vec<String>) -> Self {
        Self::DependencyCycle {
            code: ErrorCode::DependencyCycle,
            path,
        }
    }

    /// Create a new registry error with specific code.
    pub fn registry<S: Into<String>>(code: ErrorCode, message: S) -> Self {
        Self::Registry {
            code,
            message: message.into(),
        }
    }

    /// Create a new signal error with signal number.
    pub fn signal_with_number<S: Into<String>>(message: S, signal: i32) -> Self {
        Self::Signal {
            code: ErrorCode::SignalRegisterFailed,
            message: message.into(),
            signal: Some(signal),
            source: None,
        }
    }

    /// Create a new I/O error with a source error.
    pub fn io_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Io {
            code: ErrorCode::IoError,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new runtime error with specific code and source.
    pub fn runtime_with_source<S, E>(code: ErrorCode, message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Runtime {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new invalid state error.
    pub fn invalid_state<S: Into<String>>(message: S) -> Self {
        Self::InvalidState {
            code: ErrorCode::InvalidStateValue,
            message: message.into(),
        }
    }

    /// Get the error code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Config { code, .. }
            | Self::Component { code, .. }
            | Self::Hook { code, .. }
            | Self::Phase { code, .. }
            | Self::DependencyCycle { code, .. }
            | Self::Registry { code, .. }
            | Self::Signal { code, .. }
            | Self::Io { code, .. }
            | Self::Runtime { code, .. }
            | Self::InvalidState { code, .. } => *code,
        }
    }

    /// Key of the component this error is attributed to, if any.
    #[must_use]
    pub fn component_key(&self) -> Option<&str> {
        match self {
            Self::Component { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Per-component failures held by a phase aggregate; empty otherwise.
    #[must_use]
    pub fn failures(&self) -> &[Self] {
        match self {
            Self::Phase { failures, .. } => failures,
            _ => &[],
        }
    }

    /// Keys of every component attributed a failure by a phase aggregate.
    #[must_use]
    pub fn failed_components(&self) -> Vec<&str> {
        self.failures()
            .iter()
            .filter_map(Self::component_key)
            .collect()
    }

    /// Check if this is a phase aggregate with at least one failure.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures().is_empty()
    }

    /// Check if this error is a phase aggregate.
    #[must_use]
    pub const fn is_phase_failure(&self) -> bool {
        matches!(self, Self::Phase { .. })
    }

    /// Check if this error reports a dependency cycle.
    #[must_use]
    pub const fn is_cycle(&self) -> bool {
        matches!(self, Self::DependencyCycle { .. })
    }

    /// Check if this error is configuration-related.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::Config { .. })
    }

    /// Get the error category for metrics/logging.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Component { .. } => "component",
            Self::Hook { .. } => "hook",
            Self::Phase { .. } => "phase",
            Self::DependencyCycle { .. } => "dependency",
            Self::Registry { .. } => "registry",
            Self::Signal { .. } => "signal",
            Self::Io { .. } => "io",
            Self::Runtime { .. } => "runtime",
            Self::InvalidState { .. } => "state",
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::io_with_source("I/O operation failed", err)
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::config_with_source(ErrorCode::ConfigParse, "Configuration loading failed", err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::config_with_source(ErrorCode::ConfigParse, "JSON parsing failed", err)
    }
}
