//! Common types for the gesture transport layer

use std::fmt;
use std::sync::OnceLock;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::protocol::{gesture_type, handle, sensor_type, WAKE_SENTINEL};

/// 8-bit handle identifying one gesture within a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GestureHandle(u8);

impl GestureHandle {
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    /// Value as carried in the `int32 gestureId` wire field
    pub const fn as_i32(self) -> i32 {
        self.0 as i32
    }
}

/// Returned when an integer does not fit the 8-bit handle space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleOutOfRange(pub i32);

impl fmt::Display for HandleOutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "handle {} outside [{}, {})",
            self.0,
            handle::BASE,
            handle::BASE + handle::COUNT as i32
        )
    }
}

impl std::error::Error for HandleOutOfRange {}

impl TryFrom<i32> for GestureHandle {
    type Error = HandleOutOfRange;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        let offset = raw - handle::BASE;
        u8::try_from(offset)
            .map(GestureHandle)
            .map_err(|_| HandleOutOfRange(raw))
    }
}

impl fmt::Display for GestureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Closed set of gesture kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(i32)]
pub enum GestureType {
    DoubleTap = gesture_type::DOUBLE_TAP,
    SingleTap = gesture_type::SINGLE_TAP,
    OffGlass = gesture_type::OFF_GLASS,
    /// The IC reports finished gestures rather than raw data
    IcOffGlass = gesture_type::IC_OFF_GLASS,
}

impl GestureType {
    pub const ALL: [GestureType; 4] = [
        Self::DoubleTap,
        Self::SingleTap,
        Self::OffGlass,
        Self::IcOffGlass,
    ];

    pub const fn code(self) -> i32 {
        self as i32
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::DoubleTap => "double-tap",
            Self::SingleTap => "single-tap",
            Self::OffGlass => "off-glass",
            Self::IcOffGlass => "ic-off-glass",
        }
    }
}

impl TryFrom<i32> for GestureType {
    type Error = i32;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|t| t.code() == code)
            .ok_or(code)
    }
}

impl fmt::Display for GestureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Type of the physical sensor backing a gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorType(pub i32);

impl SensorType {
    pub const ACCELEROMETER: SensorType = SensorType(sensor_type::ACCELEROMETER);
    pub const PROXIMITY: SensorType = SensorType(sensor_type::PROXIMITY);
}

/// Three components plus a status byte (confidence/validity, not an error code)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GestureVector {
    pub v: [f32; 3],
    pub status: i8,
}

impl GestureVector {
    pub const fn new(v: [f32; 3], status: i8) -> Self {
        Self { v, status }
    }
}

/// One timestamped gesture detection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GestureEvent {
    /// Handle of the gesture that fired
    pub gesture: GestureHandle,
    pub vector: GestureVector,
    /// Monotonic device time in nanoseconds
    pub timestamp_ns: i64,
}

impl GestureEvent {
    pub fn new(gesture: GestureHandle, vector: GestureVector, timestamp_ns: i64) -> Self {
        Self {
            gesture,
            vector,
            timestamp_ns,
        }
    }
}

/// Successful outcome of a blocking poll
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PollOutcome {
    Event(GestureEvent),
    /// A wake (or a consumer-side close) released the poll without data
    Woken,
}

impl PollOutcome {
    /// Integer form: the handle for an event, `WAKE_SENTINEL` when woken
    pub fn code(&self) -> i32 {
        match self {
            PollOutcome::Event(ev) => ev.gesture.as_i32(),
            PollOutcome::Woken => WAKE_SENTINEL,
        }
    }

    pub fn event(&self) -> Option<&GestureEvent> {
        match self {
            PollOutcome::Event(ev) => Some(ev),
            PollOutcome::Woken => None,
        }
    }

    pub fn is_woken(&self) -> bool {
        matches!(self, PollOutcome::Woken)
    }
}

static CLOCK_BASE: OnceLock<Instant> = OnceLock::new();

/// Nanoseconds on the process-wide monotonic clock
pub fn monotonic_nanos() -> i64 {
    let base = CLOCK_BASE.get_or_init(Instant::now);
    i64::try_from(base.elapsed().as_nanos()).unwrap_or(i64::MAX)
}
