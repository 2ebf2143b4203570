//! Thread-safe mapping from component key to component.
//!
//! Insertion is the single validation point: an empty key is rejected by
//! [`Registry::set`], so reads never need to clean up bad entries. Inserting
//! under an existing key replaces the previous component without error.

use dashmap::DashMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::component::{Component, ComponentGetter, ComponentMap, Wiring};
use crate::config_source::ConfigSource;
use crate::context::Context;
use crate::error::{Error, ErrorCode, Result};

/// Registry of components, shared by clones.
#[derive(Clone)]
pub struct Registry {
    map: Arc<ComponentMap>,
    context: Context,
    config: ConfigSource,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("keys", &self.keys())
            .finish_non_exhaustive()
    }
}

impl Registry {
    /// Create an empty registry wiring components with `context` and `config`.
    #[must_use]
    pub fn new(context: Context, config: ConfigSource) -> Self {
        Self {
            map: Arc::new(DashMap::new()),
            context,
            config,
        }
    }

    /// Register `component` under `key`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns a registry error if `key` is empty.
    pub fn set<K, C>(&self, key: K, component: C) -> Result<()>
    where
        K: Into<String>,
        C: Component,
    {
        self.set_boxed(key, Box::new(component))
    }

    /// Register an already boxed component under `key`.
    ///
    /// # Errors
    ///
    /// Returns a registry error if `key` is empty.
    pub fn set_boxed<K: Into<String>>(&self, key: K, mut component: Box<dyn Component>) -> Result<()> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(Error::registry(
                ErrorCode::RegistryInvalidKey,
                "component key must not be empty",
            ));
        }

        component.init(Wiring {
            key: key.clone(),
            context: self.context.clone(),
            components: self.getter(),
            config: self.config.clone(),
        });

        let replaced = self.map.insert(key.clone(), Arc::from(component)).is_some();
        debug!(component = %key, replaced, "Registered component");
        Ok(())
    }

    /// Store `component` again without re-wiring it.
    pub(crate) fn update(&self, key: &str, component: Arc<dyn Component>) {
        self.map.insert(key.to_string(), component);
    }

    /// Get the component registered under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Arc<dyn Component>> {
        self.map.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Check if a component is registered under `key`.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Remove the component registered under `key`, returning it.
    ///
    /// The component is not stopped; stop it first if needed.
    pub fn delete(&self, key: &str) -> Option<Arc<dyn Component>> {
        self.map.remove(key).map(|(_, component)| component)
    }

    /// Snapshot of every entry.
    #[must_use]
    pub fn list(&self) -> HashMap<String, Arc<dyn Component>> {
        self.map
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect()
    }

    /// Every registered key, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.map.iter().map(|entry| entry.key().clone()).collect();
        keys.sort_unstable();
        keys
    }

    /// Visit entries in key order until `f` returns false.
    ///
    /// `f` runs on a snapshot, so it may freely mutate the registry.
    pub fn walk<F>(&self, mut f: F)
    where
        F: FnMut(&str, &Arc<dyn Component>) -> bool,
    {
        let mut entries: Vec<(String, Arc<dyn Component>)> = self.list().into_iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        for (key, component) in &entries {
            if !f(key, component) {
                break;
            }
        }
    }

    /// Number of registered components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if no component is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Read-only lookup handle for components.
    #[must_use]
    pub fn getter(&self) -> ComponentGetter {
        ComponentGetter::new(&self.map)
    }
}
