//! Configuration management for the orchestrator itself.
//!
//! Settings are layered with figment, later sources overriding earlier ones:
//!
//! 1. Default values
//! 2. Configuration file (TOML, or JSON when the extension is `.json`)
//! 3. Environment variables prefixed `LIFECYCLE_`, nested with `__`
//!    (`LIFECYCLE_LOGGING__LEVEL=debug`)
//!
//! Component settings do not live here; they are read through a
//! [`ConfigSource`](crate::ConfigSource).

use figment::providers::{Env, Format, Serialized};
use figment::{Figment, Provider};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Prefix of the environment variables read by [`Config::load_from_file`].
pub const ENV_PREFIX: &str = "LIFECYCLE_";

/// Log level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level logging (most verbose)
    Trace,
    /// Debug level logging
    Debug,
    /// Info level logging (default)
    #[default]
    Info,
    /// Warning level logging
    Warn,
    /// Error level logging
    Error,
}

impl LogLevel {
    /// Directive understood by `EnvFilter`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Logging level
    pub level: LogLevel,
    /// Enable JSON formatted logs
    pub json: bool,
    /// Enable colored output (ignored for JSON logs)
    pub color: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            json: false,
            color: true,
        }
    }
}

/// Shutdown configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Exit code used by [`Orchestrator::shutdown`](crate::Orchestrator::shutdown)
    /// callers that have no better one
    pub exit_code: i32,
    /// Shut down on SIGTERM
    pub handle_sigterm: bool,
    /// Shut down on SIGINT (Ctrl+C)
    pub handle_sigint: bool,
    /// Shut down on SIGQUIT
    pub handle_sigquit: bool,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            exit_code: 0,
            handle_sigterm: true,
            handle_sigint: true,
            handle_sigquit: true,
        }
    }
}

/// Orchestrator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Orchestrator name, used as the watcher thread name and in logs
    pub name: String,
    /// Logging configuration
    pub logging: LogConfig,
    /// Shutdown configuration
    pub shutdown: ShutdownConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: String::from("proc-lifecycle"),
            logging: LogConfig::default(),
            shutdown: ShutdownConfig::default(),
        }
    }
}

impl Config {
    /// Load config from a file, then apply environment overrides.
    ///
    /// A missing file is not an error; defaults and environment still apply.
    ///
    /// # Errors
    ///
    /// Will return an error if the file cannot be parsed, the format is not
    /// supported, or the result fails [`Config::validate`].
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(Self::default()))
            .merge(file_provider(path.as_ref())?)
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load config using a configuration provider layered over the defaults.
    ///
    /// # Errors
    ///
    /// Will return an error if the provider fails to load a valid configuration.
    pub fn load_with_provider<P: Provider>(provider: P) -> Result<Self> {
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(provider)
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Will return an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::config("Orchestrator name cannot be empty"));
        }
        Ok(())
    }

    /// Check if JSON logging is enabled.
    #[must_use]
    pub const fn is_json_logging(&self) -> bool {
        self.logging.json
    }

    /// Check if colored logging is enabled.
    #[must_use]
    pub const fn is_colored_logging(&self) -> bool {
        self.logging.color && !self.logging.json
    }

    /// Create a builder for this configuration.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Figment provider for the component settings stored in `path`, with
/// environment overrides applied. Suitable for
/// [`OrchestratorBuilder::with_config_provider`](crate::OrchestratorBuilder::with_config_provider).
///
/// # Errors
///
/// Returns an error if the file format is not supported.
pub fn component_provider<P: AsRef<Path>>(path: P) -> Result<Figment> {
    Ok(Figment::new()
        .merge(file_provider(path.as_ref())?)
        .merge(Env::prefixed(ENV_PREFIX).split("__")))
}

fn file_provider(path: &Path) -> Result<Figment> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        return Ok(Figment::from(figment::providers::Json::file(path)));
    }

    #[cfg(feature = "toml")]
    {
        Ok(Figment::from(figment::providers::Toml::file(path)))
    }

    #[cfg(not(feature = "toml"))]
    {
        Err(Error::config(format!(
            "Unsupported configuration format for {} (enable the `toml` feature)",
            path.display()
        )))
    }
}

/// Builder for creating configurations programmatically.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new configuration builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the orchestrator name.
    #[must_use]
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.config.name = name.into();
        self
    }

    /// Set the log level.
    #[must_use]
    pub const fn log_level(mut self, level: LogLevel) -> Self {
        self.config.logging.level = level;
        self
    }

    /// Enable JSON logging.
    #[must_use]
    pub const fn json_logging(mut self, enabled: bool) -> Self {
        self.config.logging.json = enabled;
        self
    }

    /// Enable colored logging.
    #[must_use]
    pub const fn color(mut self, enabled: bool) -> Self {
        self.config.logging.color = enabled;
        self
    }

    /// Set the default shutdown exit code.
    #[must_use]
    pub const fn exit_code(mut self, code: i32) -> Self {
        self.config.shutdown.exit_code = code;
        self
    }

    /// Choose which termination signals trigger shutdown.
    #[must_use]
    pub const fn signals(mut self, sigterm: bool, sigint: bool, sigquit: bool) -> Self {
        self.config.shutdown.handle_sigterm = sigterm;
        self.config.shutdown.handle_sigint = sigint;
        self.config.shutdown.handle_sigquit = sigquit;
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Will return an error if the configuration fails validation.
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
