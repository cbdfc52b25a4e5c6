//! Transport error types

use thiserror::Error;

use crate::channel::ChannelToken;

/// Errors that can occur on the event channel and its producers
#[derive(Error, Debug)]
pub enum ChannelError {
    /// The owning control device tore the channel down
    #[error("Channel closed")]
    Closed,

    /// A token that was never issued, or whose channel is already gone
    #[error("Unknown channel: {0}")]
    UnknownChannel(ChannelToken),

    #[error("Malformed gesture record: {0}")]
    MalformedRecord(String),

    #[error("Gesture device not found: {0}")]
    DeviceNotFound(String),

    // HID-specific errors
    #[error("HID error: {0}")]
    HidError(String),

    #[error("HID permission denied: {0}")]
    HidPermissionDenied(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<hidapi::HidError> for ChannelError {
    fn from(e: hidapi::HidError) -> Self {
        let msg = e.to_string();
        if msg.contains("Permission denied") || msg.contains("EPERM") {
            ChannelError::HidPermissionDenied(msg)
        } else {
            ChannelError::HidError(msg)
        }
    }
}
