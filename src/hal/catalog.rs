// Gesture Catalog - the fixed list of gestures a module exposes
//
// Built once when the module is created; never changes afterwards.

use gesture_transport::{GestureHandle, GestureType, SensorType};
use serde::{Deserialize, Serialize};

use super::registry::HandleRegistry;
use crate::error::HalError;

/// One gesture exposed by a module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GestureDescriptor {
    /// Display name
    pub name: String,
    /// Handle used to activate the gesture and tagged on its events
    pub handle: GestureHandle,
    #[serde(rename = "type")]
    pub gesture_type: GestureType,
    /// Physical sensor backing the gesture
    pub sensor_type: SensorType,
}

impl GestureDescriptor {
    pub fn new(
        name: impl Into<String>,
        handle: u8,
        gesture_type: GestureType,
        sensor_type: SensorType,
    ) -> Self {
        Self {
            name: name.into(),
            handle: GestureHandle::new(handle),
            gesture_type,
            sensor_type,
        }
    }
}

/// Built-in gesture set, used when no catalog is configured
pub fn builtin_gestures() -> Vec<GestureDescriptor> {
    vec![
        GestureDescriptor::new("Double Tap", 1, GestureType::DoubleTap, SensorType::ACCELEROMETER),
        GestureDescriptor::new("Single Tap", 2, GestureType::SingleTap, SensorType::ACCELEROMETER),
        GestureDescriptor::new("Off-Glass Lift", 3, GestureType::OffGlass, SensorType::PROXIMITY),
        GestureDescriptor::new("IC Off-Glass", 4, GestureType::IcOffGlass, SensorType::PROXIMITY),
    ]
}

/// Immutable per-module gesture list
#[derive(Debug, Clone)]
pub struct GestureCatalog {
    gestures: Vec<GestureDescriptor>,
    registry: HandleRegistry,
}

impl GestureCatalog {
    /// Build a catalog, rejecting duplicate handles
    pub fn new(gestures: Vec<GestureDescriptor>) -> Result<Self, HalError> {
        let mut registry = HandleRegistry::new();
        for g in &gestures {
            registry.reserve(g.handle).map_err(|_| {
                HalError::InvalidArgument(format!(
                    "gesture '{}' reuses handle {}",
                    g.name, g.handle
                ))
            })?;
        }
        Ok(Self { gestures, registry })
    }

    /// The full list, in declaration order
    pub fn list(&self) -> &[GestureDescriptor] {
        &self.gestures
    }

    pub fn len(&self) -> usize {
        self.gestures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gestures.is_empty()
    }

    pub fn contains(&self, handle: GestureHandle) -> bool {
        self.registry.contains(handle)
    }

    pub fn get(&self, handle: GestureHandle) -> Option<&GestureDescriptor> {
        self.gestures.iter().find(|g| g.handle == handle)
    }

    /// Resolve a caller-supplied handle; unknown handles are invalid arguments
    pub fn lookup(&self, raw: i32) -> Result<&GestureDescriptor, HalError> {
        let handle = HandleRegistry::validate(raw)?;
        self.get(handle)
            .ok_or_else(|| HalError::InvalidArgument(format!("unknown gesture handle {raw}")))
    }

    /// First gesture of the given type (drivers reporting by type use this)
    pub fn find_by_type(&self, gesture_type: GestureType) -> Option<&GestureDescriptor> {
        self.gestures.iter().find(|g| g.gesture_type == gesture_type)
    }

    pub fn handles(&self) -> impl Iterator<Item = GestureHandle> + '_ {
        self.gestures.iter().map(|g| g.handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog() {
        let catalog = GestureCatalog::new(builtin_gestures()).unwrap();
        assert_eq!(catalog.len(), 4);
        let tap = catalog.lookup(2).unwrap();
        assert_eq!(tap.gesture_type, GestureType::SingleTap);
        assert_eq!(tap.name, "Single Tap");
    }

    #[test]
    fn test_list_is_stable() {
        let catalog = GestureCatalog::new(builtin_gestures()).unwrap();
        assert_eq!(catalog.list(), catalog.list());
        assert_eq!(catalog.list(), builtin_gestures().as_slice());
    }

    #[test]
    fn test_duplicate_handles_rejected() {
        let gestures = vec![
            GestureDescriptor::new("A", 1, GestureType::DoubleTap, SensorType::ACCELEROMETER),
            GestureDescriptor::new("B", 1, GestureType::SingleTap, SensorType::ACCELEROMETER),
        ];
        assert!(matches!(
            GestureCatalog::new(gestures),
            Err(HalError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_lookup_unknown() {
        let catalog = GestureCatalog::new(builtin_gestures()).unwrap();
        assert!(matches!(catalog.lookup(9), Err(HalError::InvalidArgument(_))));
        assert!(matches!(catalog.lookup(1000), Err(HalError::InvalidArgument(_))));
    }

    #[test]
    fn test_empty_catalog_is_valid() {
        let catalog = GestureCatalog::new(Vec::new()).unwrap();
        assert!(catalog.is_empty());
        assert!(catalog.list().is_empty());
    }

    #[test]
    fn test_find_by_type() {
        let catalog = GestureCatalog::new(builtin_gestures()).unwrap();
        let g = catalog.find_by_type(GestureType::IcOffGlass).unwrap();
        assert_eq!(g.handle, GestureHandle::new(4));
    }
}
