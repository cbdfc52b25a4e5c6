//! Protocol constants for the gesture sensor interface
//!
//! These values are part of the binary contract with existing gesture
//! modules and must not be renumbered.

/// Handle space
pub mod handle {
    /// First valid handle
    pub const BASE: i32 = 0;
    /// Handles are 8 bits wide in this version of the interface
    pub const BITS: u32 = 8;
    /// Total number of handles a module may expose
    pub const COUNT: usize = 1 << BITS;
}

/// Gesture type identifiers
pub mod gesture_type {
    pub const DOUBLE_TAP: i32 = 1;
    pub const SINGLE_TAP: i32 = 2;
    pub const OFF_GLASS: i32 = 13;
    /// Marker for ICs that report finished gestures instead of raw samples
    pub const IC_OFF_GLASS: i32 = 16;
}

/// Well-known sensor type identifiers for `GestureDescriptor::sensor_type`
pub mod sensor_type {
    pub const ACCELEROMETER: i32 = 1;
    pub const PROXIMITY: i32 = 8;
}

/// Integer `poll` result meaning "woken, no event"
pub const WAKE_SENTINEL: i32 = 0x7FFF_FFFF;

/// Gesture IC HID protocol
///
/// Input reports carry one detection each:
/// `[report_id, gesture_type, status, x_lo, x_hi, y_lo, y_hi, z_lo, z_hi]`
/// where x/y/z are signed milli-units. Feature reports drive enable and
/// sensitivity: `[report_id, cmd, gesture_type, value]`.
pub mod hid {
    /// Input report ID for gesture detections
    pub const REPORT_GESTURE: u8 = 0x07;
    /// Feature report ID for commands
    pub const REPORT_COMMAND: u8 = 0x08;
    /// Feature report length (report ID included)
    pub const COMMAND_SIZE: usize = 8;
    /// Minimum gesture input report length (report ID included)
    pub const GESTURE_REPORT_MIN: usize = 9;
    /// Scale from report milli-units to vector components
    pub const VECTOR_SCALE: f32 = 1000.0;

    /// Vendor usage page of the gesture IC
    pub const USAGE_PAGE: u16 = 0xFF60;
    /// Usage of the input interface
    pub const USAGE_INPUT: u16 = 0x01;

    /// Command bytes (second byte of a feature report)
    pub mod cmd {
        pub const SET_ENABLE: u8 = 0x01;
        pub const SET_SENSITIVITY: u8 = 0x02;
    }

    /// Reader loop timing
    pub mod timing {
        /// Read timeout; bounds how long shutdown takes to be noticed
        pub const READ_TIMEOUT_MS: i32 = 10;
        /// Back-off after a read error
        pub const ERROR_SLEEP_MS: u64 = 100;
    }
}
