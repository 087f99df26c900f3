//! # porterd — porter daemon
//!
//! Composition root that wires the adapters together and runs the hub.
//!
//! ## Responsibilities
//! - Build the configuration store (builtin definitions plus `porter.toml`
//!   overrides)
//! - Initialize tracing (filter from config, `RUST_LOG` takes precedence)
//! - Construct the engine and the adapters (virtual pin board, file
//!   indicator store, solar calendar)
//! - Parse the `events.*` chains and register them
//! - Fire `OnStartup`, wait for a shutdown signal, fire `OnShutdown`,
//!   drain in-flight work with a bounded timeout
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;
mod shutdown;

use std::sync::Arc;

use porter_adapter_indicator_file::FileIndicatorStore;
use porter_adapter_pins_virtual::VirtualPinBoard;
use porter_app::actions::{ActionFactory, ActionServices};
use porter_app::engine::EventEngine;
use porter_app::ports::{IndicatorStore, PinDriver};
use porter_app::solar::{SolarCalendar, Twilight};
use porter_domain::config::ConfigValue;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Configuration
    let overrides = config::overrides_path();
    let (config, applied) = config::load(&overrides)?;

    // Logging
    let default_filter = config.get_str("logging.filter")?;
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    match applied {
        Some(count) => info!(path = %overrides.display(), count, "configuration loaded"),
        None => info!(path = %overrides.display(), "no overrides file, builtin defaults in effect"),
    }

    // Engine
    let engine = EventEngine::new();

    // Adapters
    let keyboard = config.view("keyboard");
    let inputs = string_items(&keyboard.get_list("inputs")?);
    let outputs = string_items(&keyboard.get_list("outputs")?);
    let board = Arc::new(VirtualPinBoard::new(
        engine.clone(),
        keyboard.get_str("name")?,
        &inputs,
        &outputs,
    ));
    let indicators: Arc<dyn IndicatorStore> =
        Arc::new(FileIndicatorStore::new(config.get_path("indicators.directory")?)?);

    let suntime = config.view("suntime");
    let twilight: Twilight = suntime.get_str("twilight")?.parse()?;
    let solar = Arc::new(SolarCalendar::new(
        suntime.get_float("latitude")?,
        suntime.get_float("longitude")?,
        twilight,
    ));

    // Action chains
    let pins: Arc<dyn PinDriver> = board.clone();
    let factory = ActionFactory::new(ActionServices {
        engine: engine.clone(),
        pins,
        indicators,
        solar,
    });
    let events = config.children("events")?;
    let mut registered = 0usize;
    for event in &events {
        for value in config.get_list(&format!("events.{event}"))? {
            let Some(spec) = value.as_str() else { continue };
            match factory.parse(spec, "config") {
                Ok(action) => {
                    engine.register_action(event, "config", action);
                    registered += 1;
                }
                Err(err) => warn!(event = %event, spec, error = %err, "action spec rejected"),
            }
        }
    }
    info!(
        board = board.name(),
        events = events.len(),
        actions = registered,
        "chains registered",
    );

    // Lifecycle
    engine
        .fire_and_wait("OnStartup", "porterd", serde_json::Value::Null)
        .await;
    info!("porter up, waiting for events");

    shutdown::wait_for_signal().await?;
    info!("shutdown signal received");

    engine
        .fire_and_wait("OnShutdown", "porterd", serde_json::Value::Null)
        .await;
    let drain_timeout = config.get_duration("shutdown.drain_timeout")?;
    if !engine.drain(drain_timeout).await {
        warn!(
            timeout_seconds = drain_timeout.as_secs_f64(),
            "work still in flight at exit",
        );
    }
    engine.unregister_source("config", true)?;

    Ok(())
}

fn string_items(values: &[ConfigValue]) -> Vec<String> {
    values
        .iter()
        .filter_map(ConfigValue::as_str)
        .map(str::to_owned)
        .collect()
}
