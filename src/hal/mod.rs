// Hardware Abstraction Layer (HAL) for gesture modules
//
// This module provides:
// - Module/device constants
// - Handle registry (8-bit handle assignment and validation)
// - Gesture catalog (the fixed per-module list of gestures)

pub mod catalog;
pub mod constants;
pub mod registry;

// Re-export commonly used types
pub use catalog::{builtin_gestures, GestureCatalog, GestureDescriptor};
pub use constants::*;
pub use registry::HandleRegistry;
