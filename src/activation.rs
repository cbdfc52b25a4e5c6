//! Per-handle enable and sensitivity state
//!
//! Shared between the control device, which mutates it, and the event sink,
//! which reads it on every delivered event.

use std::collections::BTreeMap;

use gesture_transport::GestureHandle;
use parking_lot::RwLock;
use serde::Serialize;

use crate::hal::GestureCatalog;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Activation {
    pub enabled: bool,
    pub sensitivity: i32,
}

/// Result of an enable/disable request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Changed,
    Unchanged,
}

/// Map of catalog handle → activation. Handles outside the catalog have no entry.
#[derive(Debug)]
pub struct ActivationSet {
    entries: RwLock<BTreeMap<GestureHandle, Activation>>,
    default_sensitivity: i32,
}

impl ActivationSet {
    /// All catalog handles, disabled, at the default sensitivity
    pub fn new(catalog: &GestureCatalog, default_sensitivity: i32) -> Self {
        let entries = catalog
            .handles()
            .map(|h| {
                (
                    h,
                    Activation {
                        enabled: false,
                        sensitivity: default_sensitivity,
                    },
                )
            })
            .collect();
        Self {
            entries: RwLock::new(entries),
            default_sensitivity,
        }
    }

    pub fn get(&self, handle: GestureHandle) -> Option<Activation> {
        self.entries.read().get(&handle).copied()
    }

    pub fn is_enabled(&self, handle: GestureHandle) -> bool {
        self.get(handle).is_some_and(|a| a.enabled)
    }

    /// Whether setting `enabled` would change anything; `None` for unknown handles
    pub fn would_toggle(&self, handle: GestureHandle, enabled: bool) -> Option<Toggle> {
        self.get(handle).map(|a| {
            if a.enabled == enabled {
                Toggle::Unchanged
            } else {
                Toggle::Changed
            }
        })
    }

    pub fn set_enabled(&self, handle: GestureHandle, enabled: bool) -> Option<Toggle> {
        let mut entries = self.entries.write();
        let entry = entries.get_mut(&handle)?;
        if entry.enabled == enabled {
            return Some(Toggle::Unchanged);
        }
        entry.enabled = enabled;
        Some(Toggle::Changed)
    }

    pub fn set_sensitivity(&self, handle: GestureHandle, sensitivity: i32) -> Option<()> {
        let mut entries = self.entries.write();
        entries.get_mut(&handle)?.sensitivity = sensitivity;
        Some(())
    }

    pub fn enabled_handles(&self) -> Vec<GestureHandle> {
        self.entries
            .read()
            .iter()
            .filter(|(_, a)| a.enabled)
            .map(|(h, _)| *h)
            .collect()
    }

    /// Disable everything and restore default sensitivities
    pub fn reset(&self) {
        for entry in self.entries.write().values_mut() {
            *entry = Activation {
                enabled: false,
                sensitivity: self.default_sensitivity,
            };
        }
    }

    pub fn snapshot(&self) -> BTreeMap<GestureHandle, Activation> {
        self.entries.read().clone()
    }
}
