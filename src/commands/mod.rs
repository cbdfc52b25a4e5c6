//! Command handlers for the CLI application.
//!
//! - `list`: print the gesture catalog
//! - `monitor`: activate gestures and poll events
//! - `dump`: decode a recording

pub mod dump;
pub mod list;
pub mod monitor;

use std::path::PathBuf;

use anyhow::Context;
use gesture_hal::{DriverConfig, GestureEvent, GestureModule, HalConfig};

/// Result type for command handlers
pub type CommandResult = anyhow::Result<()>;

/// Where the module's driver comes from
pub struct ModuleSource {
    pub config: Option<PathBuf>,
    pub replay: Option<PathBuf>,
}

impl ModuleSource {
    pub fn load_config(&self) -> anyhow::Result<HalConfig> {
        let mut config = match &self.config {
            Some(path) => HalConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => HalConfig::load_default().context("loading default config")?,
        };
        if let Some(path) = &self.replay {
            config.driver = DriverConfig::Replay {
                path: path.clone(),
                speed: 1.0,
            };
        }
        Ok(config)
    }

    pub fn open_module(&self) -> anyhow::Result<GestureModule> {
        let config = self.load_config()?;
        GestureModule::from_config(&config).context("opening gesture module")
    }
}

/// One-line rendering of an event
pub fn format_event(module: &GestureModule, event: &GestureEvent) -> String {
    let name = module
        .catalog()
        .get(event.gesture)
        .map(|g| g.name.as_str())
        .unwrap_or("?");
    let [x, y, z] = event.vector.v;
    format!(
        "{:>14}ns  [{:>3}] {:<16} ({:+.3}, {:+.3}, {:+.3}) status={}",
        event.timestamp_ns, event.gesture.get(), name, x, y, z, event.vector.status
    )
}
