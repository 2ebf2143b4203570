//! Cross-platform termination signal handling.
//!
//! The handler waits for the first enabled termination signal and cancels the
//! orchestrator context with [`CancelReason::Signal`]. On Unix this covers
//! SIGTERM, SIGINT and SIGQUIT; on Windows the console events Ctrl+C,
//! Ctrl+Break and console close are used instead.

use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

use crate::config::ShutdownConfig;
use crate::context::{CancelReason, Context};
use crate::error::{Error, Result};

/// Signal handling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignalHandling {
    /// Enabled - handle this signal
    Enabled,
    /// Disabled - do not handle this signal
    #[default]
    Disabled,
}

impl From<bool> for SignalHandling {
    fn from(value: bool) -> Self {
        if value {
            Self::Enabled
        } else {
            Self::Disabled
        }
    }
}

impl From<SignalHandling> for bool {
    fn from(value: SignalHandling) -> Self {
        matches!(value, SignalHandling::Enabled)
    }
}

/// Which termination signals trigger a shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalConfig {
    /// SIGTERM (Windows: console close)
    pub term: SignalHandling,
    /// SIGINT (Windows: Ctrl+C)
    pub interrupt: SignalHandling,
    /// SIGQUIT (Windows: Ctrl+Break)
    pub quit: SignalHandling,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            term: SignalHandling::Enabled,
            interrupt: SignalHandling::Enabled,
            quit: SignalHandling::Enabled,
        }
    }
}

impl From<&ShutdownConfig> for SignalConfig {
    fn from(config: &ShutdownConfig) -> Self {
        Self {
            term: config.handle_sigterm.into(),
            interrupt: config.handle_sigint.into(),
            quit: config.handle_sigquit.into(),
        }
    }
}

impl SignalConfig {
    /// Create a new signal configuration with every signal enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable SIGTERM handling.
    #[must_use]
    pub const fn without_sigterm(mut self) -> Self {
        self.term = SignalHandling::Disabled;
        self
    }

    /// Disable SIGINT handling.
    #[must_use]
    pub const fn without_sigint(mut self) -> Self {
        self.interrupt = SignalHandling::Disabled;
        self
    }

    /// Disable SIGQUIT handling.
    #[must_use]
    pub const fn without_sigquit(mut self) -> Self {
        self.quit = SignalHandling::Disabled;
        self
    }

    /// Names of the enabled signals, for logging.
    #[must_use]
    pub fn enabled(&self) -> Vec<&'static str> {
        let mut names = Vec::with_capacity(3);
        if bool::from(self.term) {
            names.push("SIGTERM");
        }
        if bool::from(self.interrupt) {
            names.push("SIGINT");
        }
        if bool::from(self.quit) {
            names.push("SIGQUIT");
        }
        names
    }
}

/// Waits for a termination signal and cancels a context.
#[derive(Debug)]
pub struct SignalHandler {
    context: Context,
    config: SignalConfig,
    handling_signals: AtomicBool,
}

impl SignalHandler {
    /// Create a handler cancelling `context`.
    #[must_use]
    pub const fn new(context: Context, config: SignalConfig) -> Self {
        Self {
            context,
            config,
            handling_signals: AtomicBool::new(false),
        }
    }

    /// Check if signal handling is active.
    #[must_use]
    pub fn is_handling(&self) -> bool {
        self.handling_signals.load(Ordering::Acquire)
    }

    /// Wait until an enabled signal arrives or the context is cancelled by
    /// some other trigger.
    ///
    /// Returns the signal number when a signal caused the cancellation.
    ///
    /// # Errors
    ///
    /// Returns an error if the handler is already running or a signal
    /// handler could not be registered.
    pub async fn handle_signals(&self) -> Result<Option<i32>> {
        if self
            .handling_signals
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::invalid_state("Signal handling already started"));
        }

        info!(signals = ?self.config.enabled(), "Starting signal handler");
        let result = self.wait_platform().await;
        self.handling_signals.store(false, Ordering::Release);

        if let Ok(Some(signal)) = result {
            self.context.cancel(CancelReason::Signal(signal));
        }
        result
    }

    #[cfg(unix)]
    async fn wait_platform(&self) -> Result<Option<i32>> {
        use tokio::signal::unix::{signal, Signal, SignalKind};

        fn register(enabled: SignalHandling, kind: SignalKind, number: i32) -> Result<Option<Signal>> {
            if !bool::from(enabled) {
                return Ok(None);
            }
            signal(kind).map(Some).map_err(|e| {
                Error::signal_with_number(
                    format!("Failed to register {} handler: {e}", signal_description(number)),
                    number,
                )
            })
        }

        let mut sigterm = register(self.config.term, SignalKind::terminate(), 15)?;
        let mut sigint = register(self.config.interrupt, SignalKind::interrupt(), 2)?;
        let mut sigquit = register(self.config.quit, SignalKind::quit(), 3)?;

        debug!("Unix signal handlers registered");

        let received = tokio::select! {
            () = recv(sigterm.as_mut()) => {
                info!("Received SIGTERM, initiating graceful shutdown");
                Some(15)
            }
            () = recv(sigint.as_mut()) => {
                info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
                Some(2)
            }
            () = recv(sigquit.as_mut()) => {
                warn!("Received SIGQUIT, initiating shutdown");
                Some(3)
            }
            () = self.context.cancelled() => {
                debug!("Context cancelled while waiting for signals");
                None
            }
        };
        Ok(received)
    }

    #[cfg(windows)]
    async fn wait_platform(&self) -> Result<Option<i32>> {
        use tokio::signal::windows::{ctrl_break, ctrl_c, ctrl_close};

        let mut close = if bool::from(self.config.term) {
            Some(ctrl_close().map_err(|e| {
                Error::signal_with_number(format!("Failed to register console close handler: {e}"), 15)
            })?)
        } else {
            None
        };
        let mut interrupt = if bool::from(self.config.interrupt) {
            Some(ctrl_c().map_err(|e| {
                Error::signal_with_number(format!("Failed to register Ctrl+C handler: {e}"), 2)
            })?)
        } else {
            None
        };
        let mut brk = if bool::from(self.config.quit) {
            Some(ctrl_break().map_err(|e| {
                Error::signal_with_number(format!("Failed to register Ctrl+Break handler: {e}"), 3)
            })?)
        } else {
            None
        };

        debug!("Windows console event handlers registered");

        let received = tokio::select! {
            () = async { match close.as_mut() { Some(s) => { s.recv().await; } None => std::future::pending().await } } => {
                warn!("Received console close event, initiating shutdown");
                Some(15)
            }
            () = async { match interrupt.as_mut() { Some(s) => { s.recv().await; } None => std::future::pending().await } } => {
                info!("Received Ctrl+C, initiating graceful shutdown");
                Some(2)
            }
            () = async { match brk.as_mut() { Some(s) => { s.recv().await; } None => std::future::pending().await } } => {
                info!("Received Ctrl+Break, initiating graceful shutdown");
                Some(3)
            }
            () = self.context.cancelled() => {
                debug!("Context cancelled while waiting for console events");
                None
            }
        };
        Ok(received)
    }
}

#[cfg(unix)]
async fn recv(signal: Option<&mut tokio::signal::unix::Signal>) {
    match signal {
        Some(signal) => {
            let _ = signal.recv().await;
        }
        None => std::future::pending().await,
    }
}

/// Helper function to get a human-readable description of a signal.
#[must_use]
pub const fn signal_description(signal: i32) -> &'static str {
    match signal {
        1 => "SIGHUP (Hangup)",
        2 => "SIGINT (Interrupt/Ctrl+C)",
        3 => "SIGQUIT (Quit)",
        15 => "SIGTERM (Terminate)",
        _ => "Unknown signal",
    }
}
