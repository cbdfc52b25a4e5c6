// HAL Constants - module and device identification
//
// Values callers use to locate the module and its devices. Wire-level
// constants live in gesture_transport::protocol.

pub use gesture_transport::protocol::handle::{
    BASE as GESTURE_HANDLE_BASE, BITS as GESTURE_HANDLE_BITS, COUNT as GESTURE_HANDLE_COUNT,
};
pub use gesture_transport::protocol::WAKE_SENTINEL;

/// Id of the gesture module
pub const MODULE_ID: &str = "gestures";

/// Device name routed to the control device factory
pub const DEVICE_CONTROL: &str = "control";

/// Device name routed to the data device factory
pub const DEVICE_DATA: &str = "data";

/// Sensitivity applied to every handle until set_sensitivity is called
pub const DEFAULT_SENSITIVITY: i32 = 5;
