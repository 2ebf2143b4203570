//! Simple orchestrator example: a database and a worker depending on it.
//!
//! Run with `cargo run --example simple`, stop with Ctrl+C.

use figment::providers::Serialized;
use figment::Figment;
use parking_lot::Mutex;
use proc_lifecycle::{
    logging, Component, ComponentGetter, Config, ConfigSource, Context, Error, LogLevel,
    Orchestrator, Result, Wiring,
};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Deserialize)]
struct DatabaseSettings {
    url: String,
}

#[derive(Default)]
struct Database {
    url: Mutex<Option<String>>,
}

impl Component for Database {
    fn type_name(&self) -> &str {
        "database"
    }

    fn start(&self, _: &ComponentGetter, config: &ConfigSource) -> Result<()> {
        let settings: DatabaseSettings = config.model("database")?;
        info!(url = %settings.url, "Database connected");
        *self.url.lock() = Some(settings.url);
        Ok(())
    }

    fn reload(&self, components: &ComponentGetter, config: &ConfigSource) -> Result<()> {
        self.start(components, config)
    }

    fn stop(&self) {
        if self.url.lock().take().is_some() {
            info!("Database disconnected");
        }
    }

    fn is_started(&self) -> bool {
        self.url.lock().is_some()
    }

    fn is_running(&self, _: bool) -> bool {
        self.is_started()
    }

    fn default_config(&self) -> Vec<u8> {
        br#"{"url": "postgres://localhost/app"}"#.to_vec()
    }
}

#[derive(Default)]
struct Worker {
    context: Context,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Component for Worker {
    fn type_name(&self) -> &str {
        "worker"
    }

    fn init(&mut self, wiring: Wiring) {
        self.context = wiring.context;
    }

    fn start(&self, components: &ComponentGetter, _: &ConfigSource) -> Result<()> {
        if !components.get("db").is_some_and(|db| db.is_started()) {
            return Err(Error::component("worker", "database is not available"));
        }

        let mut handle = self.handle.lock();
        if handle.is_some() {
            return Ok(());
        }

        let context = self.context.clone();
        let running = Arc::clone(&self.running);
        running.store(true, Ordering::Release);
        *handle = Some(std::thread::spawn(move || {
            let mut counter = 0u64;
            while running.load(Ordering::Acquire) && !context.wait_timeout(Duration::from_secs(1)) {
                counter += 1;
                info!("Worker iteration {}", counter);
            }
            info!("Worker shutting down after {} iterations", counter);
        }));
        Ok(())
    }

    fn reload(&self, _: &ComponentGetter, _: &ConfigSource) -> Result<()> {
        Ok(())
    }

    fn stop(&self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.join();
        }
    }

    fn is_started(&self) -> bool {
        self.handle.lock().is_some()
    }

    fn is_running(&self, _: bool) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn dependencies(&self) -> Vec<String> {
        vec!["db".to_string()]
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::builder()
        .name("simple")
        .log_level(LogLevel::Info)
        .build()?;
    logging::init(&config.logging)?;

    let orchestrator = Orchestrator::builder()
        .with_config(config)
        .with_config_provider(Figment::from(Serialized::default(
            "database",
            serde_json::json!({ "url": "postgres://localhost/simple" }),
        )))
        .build()?;

    orchestrator.component_set("worker", Worker::default())?;
    orchestrator.component_set("db", Database::default())?;
    orchestrator.cancel_add(|| info!("Flushing pending work"));

    info!("Default configuration:\n{}", orchestrator.default_config()?);
    orchestrator.start()?;

    orchestrator.wait_notify().await
}
