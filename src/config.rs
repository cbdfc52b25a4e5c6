//! HAL configuration loaded from TOML
//!
//! ```toml
//! queue_capacity = 128
//! default_sensitivity = 5
//!
//! [driver]
//! kind = "simulated"      # simulated | hid | replay
//! autofire_ms = 500
//!
//! [[gesture]]
//! name = "Single Tap"
//! handle = 2
//! type = "single-tap"
//! sensor_type = 1
//! ```
//!
//! Without `[[gesture]]` entries the built-in catalog is used. An entry
//! may leave out `handle`; it then gets the lowest handle no other entry
//! claims.

use std::path::{Path, PathBuf};

use gesture_transport::{GestureHandle, GestureType, SensorType, DEFAULT_CAPACITY};
use serde::{Deserialize, Serialize};

use crate::error::HalError;
use crate::hal::{builtin_gestures, GestureDescriptor, HandleRegistry, DEFAULT_SENSITIVITY};

/// Which driver backs the module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DriverConfig {
    Simulated {
        /// Period of generated detections; 0 disables autofire
        #[serde(default)]
        autofire_ms: u64,
    },
    Hid {
        vid: u16,
        pid: u16,
    },
    Replay {
        path: PathBuf,
        #[serde(default = "default_speed")]
        speed: f64,
    },
}

fn default_speed() -> f64 {
    1.0
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig::Simulated { autofire_ms: 0 }
    }
}

/// One `[[gesture]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<GestureHandle>,
    #[serde(rename = "type")]
    pub gesture_type: GestureType,
    pub sensor_type: SensorType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HalConfig {
    pub queue_capacity: usize,
    pub default_sensitivity: i32,
    pub driver: DriverConfig,
    #[serde(rename = "gesture")]
    pub gestures: Vec<GestureEntry>,
}

impl Default for HalConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_CAPACITY,
            default_sensitivity: DEFAULT_SENSITIVITY,
            driver: DriverConfig::default(),
            gestures: Vec::new(),
        }
    }
}

impl HalConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self, HalError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| HalError::Config(format!("read {}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    /// Parse from TOML string.
    pub fn from_toml(content: &str) -> Result<Self, HalError> {
        let config: HalConfig =
            toml::from_str(content).map_err(|e| HalError::Config(format!("parse TOML: {e}")))?;
        if config.queue_capacity == 0 {
            return Err(HalError::Config("queue_capacity must be at least 1".into()));
        }
        Ok(config)
    }

    /// Load the default config file, or the built-in defaults if it doesn't exist.
    pub fn load_default() -> Result<Self, HalError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Configured catalog in declaration order, falling back to the
    /// built-in one.
    ///
    /// Explicit handles are claimed first, so an entry without one never
    /// takes a handle a later entry names. Duplicate explicit handles fail.
    pub fn gestures(&self) -> Result<Vec<GestureDescriptor>, HalError> {
        if self.gestures.is_empty() {
            return Ok(builtin_gestures());
        }
        let mut registry = HandleRegistry::new();
        for entry in &self.gestures {
            if let Some(handle) = entry.handle {
                registry.reserve(handle).map_err(|_| {
                    HalError::Config(format!(
                        "gesture '{}' reuses handle {}",
                        entry.name, handle
                    ))
                })?;
            }
        }
        self.gestures
            .iter()
            .map(|entry| {
                let handle = match entry.handle {
                    Some(handle) => handle,
                    None => registry.allocate().map_err(|e| {
                        HalError::Config(format!("gesture '{}': {e}", entry.name))
                    })?,
                };
                Ok(GestureDescriptor {
                    name: entry.name.clone(),
                    handle,
                    gesture_type: entry.gesture_type,
                    sensor_type: entry.sensor_type,
                })
            })
            .collect()
    }
}

/// Path to the default config file.
pub fn default_config_path() -> PathBuf {
    config_dir().join("gestures.toml")
}

fn config_dir() -> PathBuf {
    if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(config).join("gesture-hal")
    } else if let Some(home) = std::env::var_os("HOME") {
        PathBuf::from(home).join(".config/gesture-hal")
    } else {
        PathBuf::from("/tmp/gesture-hal")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::GestureCatalog;
    use crate::module::GestureModule;

    #[test]
    fn test_empty_config_is_default() {
        let config = HalConfig::from_toml("").unwrap();
        assert_eq!(config, HalConfig::default());
        assert_eq!(config.gestures().unwrap().len(), 4);
    }

    #[test]
    fn test_parse_full_config() {
        let config = HalConfig::from_toml(
            r#"
            queue_capacity = 16
            default_sensitivity = 3

            [driver]
            kind = "hid"
            vid = 0x22b8
            pid = 0x2d66

            [[gesture]]
            name = "Lift"
            handle = 7
            type = "ic-off-glass"
            sensor_type = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.queue_capacity, 16);
        assert_eq!(config.default_sensitivity, 3);
        assert_eq!(
            config.driver,
            DriverConfig::Hid {
                vid: 0x22b8,
                pid: 0x2d66
            }
        );
        let gestures = config.gestures().unwrap();
        assert_eq!(gestures.len(), 1);
        assert_eq!(gestures[0].handle, GestureHandle::new(7));
        assert_eq!(gestures[0].gesture_type, GestureType::IcOffGlass);
        assert_eq!(gestures[0].sensor_type, SensorType::PROXIMITY);
    }

    #[test]
    fn test_replay_speed_default() {
        let config = HalConfig::from_toml(
            r#"
            [driver]
            kind = "replay"
            path = "taps.bin"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.driver,
            DriverConfig::Replay {
                path: PathBuf::from("taps.bin"),
                speed: 1.0
            }
        );
    }

    #[test]
    fn test_bad_values_rejected() {
        assert!(matches!(
            HalConfig::from_toml("queue_capacity = 0"),
            Err(HalError::Config(_))
        ));
        assert!(HalConfig::from_toml("[driver]\nkind = \"bluetooth\"").is_err());
        assert!(HalConfig::from_toml(
            "[[gesture]]\nname = \"x\"\nhandle = 300\ntype = \"single-tap\"\nsensor_type = 1"
        )
        .is_err());
    }

    #[test]
    fn test_missing_handles_allocated() {
        let config = HalConfig::from_toml(
            r#"
            [[gesture]]
            name = "Tap"
            type = "single-tap"
            sensor_type = 1

            [[gesture]]
            name = "Lift"
            handle = 0
            type = "off-glass"
            sensor_type = 8

            [[gesture]]
            name = "Double"
            type = "double-tap"
            sensor_type = 1
            "#,
        )
        .unwrap();
        assert_eq!(config.gestures[0].handle, None);

        let gestures = config.gestures().unwrap();
        let handles: Vec<u8> = gestures.iter().map(|g| g.handle.get()).collect();
        assert_eq!(handles, [1, 0, 2]);
        assert_eq!(gestures[0].name, "Tap");
        assert!(GestureCatalog::new(gestures).is_ok());
    }

    #[test]
    fn test_duplicate_handles_rejected() {
        let config = HalConfig::from_toml(
            r#"
            [[gesture]]
            name = "A"
            handle = 4
            type = "single-tap"
            sensor_type = 1

            [[gesture]]
            name = "B"
            handle = 4
            type = "double-tap"
            sensor_type = 1
            "#,
        )
        .unwrap();
        assert!(matches!(config.gestures(), Err(HalError::Config(_))));
        assert!(matches!(
            GestureModule::from_config(&config),
            Err(HalError::Config(_))
        ));
    }
}
