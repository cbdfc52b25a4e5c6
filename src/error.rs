//! HAL error types

use gesture_transport::ChannelError;
use thiserror::Error;

/// Errors from module, control device and data device operations.
///
/// A woken poll is not an error; it is `PollOutcome::Woken`.
#[derive(Error, Debug)]
pub enum HalError {
    /// The underlying sensor or kernel driver cannot be reached
    #[error("Device unavailable: {0}")]
    Unavailable(String),

    /// Unknown handle or out-of-range value
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Channel misuse: foreign handle, poll without an open channel
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Unrecognized device name
    #[error("Not found: {0}")]
    NotFound(String),

    /// Lifecycle call in the wrong state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HalError {
    /// Negative errno equivalent, for callers bound to the integer contract
    pub fn errno(&self) -> i32 {
        let code = match self {
            HalError::Unavailable(_) => libc::ENODEV,
            HalError::InvalidArgument(_) | HalError::Config(_) => libc::EINVAL,
            HalError::Protocol(_) => libc::EPROTO,
            HalError::NotFound(_) => libc::ENOENT,
            HalError::InvalidState(_) => libc::EBADF,
            HalError::Channel(ChannelError::Closed) => libc::EPIPE,
            HalError::Channel(ChannelError::UnknownChannel(_)) => libc::EPROTO,
            HalError::Channel(ChannelError::MalformedRecord(_)) => libc::EPROTO,
            HalError::Channel(ChannelError::DeviceNotFound(_)) => libc::ENODEV,
            HalError::Channel(ChannelError::HidPermissionDenied(_)) => libc::EACCES,
            HalError::Channel(_) | HalError::Io(_) => libc::EIO,
        };
        -code
    }
}
