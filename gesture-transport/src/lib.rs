//! Transport layer for gesture sensor modules
//!
//! This crate holds everything that crosses the boundary between a gesture
//! driver and the processes consuming its events:
//!
//! - the fixed binary layout of an event record (`wire`)
//! - the event channel with its wake primitive and transferable handles
//!   (`channel`)
//! - HID access to gesture ICs that report finished gestures
//!   (`hid_gesture`, `event_parser`)

pub mod channel;
pub mod error;
pub mod event_parser;
pub mod protocol;
pub mod types;
pub mod wire;

mod hid_gesture;

pub use channel::{ChannelHandle, ChannelOwner, ChannelReceiver, ChannelToken, DEFAULT_CAPACITY};
pub use error::ChannelError;
pub use event_parser::{parse_gesture_report, RawGesture, ReportError};
pub use hid_gesture::{GestureDeviceInfo, HidGestureDevice};
pub use protocol::WAKE_SENTINEL;
pub use types::{
    monotonic_nanos, GestureEvent, GestureHandle, GestureType, GestureVector, HandleOutOfRange,
    PollOutcome, SensorType,
};
pub use wire::{write_record, GestureRecord, RecordReader, RECORD_SIZE};
