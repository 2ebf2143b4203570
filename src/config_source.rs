//! Configuration values consulted by components on start and reload.
//!
//! A [`ConfigSource`] is a cheap handle onto a swappable figment provider.
//! Installing a new provider is visible to every handle at once, which is how
//! a reload picks up new settings.

use arc_swap::ArcSwapOption;
use figment::Figment;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, ErrorCode, Result};

/// Shared handle onto the key/value provider components read from.
#[derive(Clone, Default)]
pub struct ConfigSource {
    provider: Arc<ArcSwapOption<Figment>>,
}

impl fmt::Debug for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigSource")
            .field("has_provider", &self.has_provider())
            .finish()
    }
}

impl ConfigSource {
    /// Create a source with no provider installed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source backed by `provider`.
    #[must_use]
    pub fn with_provider(provider: Figment) -> Self {
        let source = Self::new();
        source.set_provider(provider);
        source
    }

    /// Install (or replace) the provider.
    pub fn set_provider(&self, provider: Figment) {
        self.provider.store(Some(Arc::new(provider)));
    }

    /// Remove the provider.
    pub fn clear_provider(&self) {
        self.provider.store(None);
    }

    /// Check if a provider is installed.
    #[must_use]
    pub fn has_provider(&self) -> bool {
        self.provider.load().is_some()
    }

    /// Snapshot of the current provider.
    #[must_use]
    pub fn provider(&self) -> Option<Arc<Figment>> {
        self.provider.load_full()
    }

    /// Deserialize the value stored at `key` into `T`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no provider is installed
    /// (`ConfigProviderMissing`), when `key` is absent (`ConfigMissing`) or when
    /// the value does not fit `T` (`ConfigParse`).
    pub fn model<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let provider = self.provider().ok_or_else(|| {
            Error::config_with_code(
                ErrorCode::ConfigProviderMissing,
                format!("no configuration provider registered to read '{key}'"),
            )
        })?;

        if !provider.contains(key) {
            return Err(Error::config_with_code(
                ErrorCode::ConfigMissing,
                format!("configuration key '{key}' not found"),
            ));
        }

        provider.extract_inner::<T>(key).map_err(|e| {
            Error::config_with_source(
                ErrorCode::ConfigParse,
                format!("invalid configuration for key '{key}'"),
                e,
            )
        })
    }
}
