//! Gesture IC input report parsing and the reader loop
//!
//! The IC sends one input report per finished gesture. The reader loop runs
//! on its own thread, timestamps each report as soon as it is read and
//! hands the parsed detection to a callback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hidapi::HidDevice;
use tracing::{debug, warn};

use crate::protocol::hid;
use crate::types::{monotonic_nanos, GestureType, GestureVector};

/// A detection as reported by the IC, before it is mapped to a handle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawGesture {
    pub gesture_type: GestureType,
    pub vector: GestureVector,
}

/// Why a report was not a gesture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    /// Some other report ID (keep-alives, descriptors)
    NotGesture(u8),
    Short(usize),
    UnknownType(i32),
}

/// Parse one input report.
///
/// Format: `[07, gesture_type, status, x_lo, x_hi, y_lo, y_hi, z_lo, z_hi]`,
/// components are signed milli-units.
pub fn parse_gesture_report(data: &[u8]) -> Result<RawGesture, ReportError> {
    let Some(&report_id) = data.first() else {
        return Err(ReportError::Short(0));
    };
    if report_id != hid::REPORT_GESTURE {
        return Err(ReportError::NotGesture(report_id));
    }
    if data.len() < hid::GESTURE_REPORT_MIN {
        return Err(ReportError::Short(data.len()));
    }

    let gesture_type =
        GestureType::try_from(i32::from(data[1])).map_err(ReportError::UnknownType)?;
    let status = data[2] as i8;
    let axis = |i: usize| {
        f32::from(i16::from_le_bytes([data[3 + 2 * i], data[4 + 2 * i]])) / hid::VECTOR_SCALE
    };

    Ok(RawGesture {
        gesture_type,
        vector: GestureVector::new([axis(0), axis(1), axis(2)], status),
    })
}

/// Build a command feature report: `[08, cmd, gesture_type, value, 0...]`
pub fn build_command(cmd: u8, gesture_type: GestureType, value: u8) -> [u8; hid::COMMAND_SIZE] {
    let mut buf = [0u8; hid::COMMAND_SIZE];
    buf[0] = hid::REPORT_COMMAND;
    buf[1] = cmd;
    buf[2] = gesture_type.code() as u8;
    buf[3] = value;
    buf
}

/// Configuration for the reader loop
#[derive(Clone)]
pub struct EventReaderConfig {
    /// Read timeout in milliseconds (for checking shutdown flag when idle)
    pub read_timeout_ms: i32,
    /// Sleep duration on error before retrying
    pub error_sleep_ms: u64,
    /// Name prefix for debug logging
    pub name: &'static str,
}

impl Default for EventReaderConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: hid::timing::READ_TIMEOUT_MS,
            error_sleep_ms: hid::timing::ERROR_SLEEP_MS,
            name: "gesture-ic",
        }
    }
}

/// Read input reports until `shutdown` is set.
///
/// Each parsed gesture is passed to `on_gesture` together with the
/// monotonic timestamp taken right after the read returned.
pub fn run_event_reader_loop<F>(
    input_device: HidDevice,
    shutdown: Arc<AtomicBool>,
    mut on_gesture: F,
    config: EventReaderConfig,
) where
    F: FnMut(RawGesture, i64),
{
    debug!("{} event reader thread started", config.name);
    let mut buf = [0u8; 64];

    while !shutdown.load(Ordering::Relaxed) {
        match input_device.read_timeout(&mut buf, config.read_timeout_ms) {
            Ok(len) if len > 0 => {
                let timestamp = monotonic_nanos();
                match parse_gesture_report(&buf[..len]) {
                    Ok(raw) => {
                        debug!(
                            "{} gesture {} at {}ns: {:?}",
                            config.name, raw.gesture_type, timestamp, raw.vector
                        );
                        on_gesture(raw, timestamp);
                    }
                    Err(ReportError::NotGesture(id)) => {
                        debug!("{} ignoring report 0x{:02X}", config.name, id);
                    }
                    Err(e) => {
                        warn!(
                            "{} bad gesture report {:?}: {:02X?}",
                            config.name,
                            e,
                            &buf[..len.min(16)]
                        );
                    }
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!("{} event reader error: {}", config.name, e);
                std::thread::sleep(Duration::from_millis(config.error_sleep_ms));
            }
        }
    }

    debug!("{} event reader thread exiting", config.name);
}
