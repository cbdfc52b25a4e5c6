//! Gesture IC attached over HID
//!
//! The IC reports finished gestures by type; the catalog maps each type to
//! its handle. It cannot release its input endpoint independently of the
//! command endpoint, so closing just the data source is not offered.

use std::sync::Arc;

use gesture_transport::{ChannelError, HidGestureDevice};
use parking_lot::Mutex;
use tracing::info;

use super::{Capabilities, EventSink, GestureDriver};
use crate::error::HalError;
use crate::hal::GestureDescriptor;

pub struct HidDriver {
    vid: u16,
    pid: u16,
    gestures: Vec<GestureDescriptor>,
    device: Mutex<Option<Arc<HidGestureDevice>>>,
}

impl HidDriver {
    pub fn new(vid: u16, pid: u16, gestures: Vec<GestureDescriptor>) -> Self {
        Self {
            vid,
            pid,
            gestures,
            device: Mutex::new(None),
        }
    }

    fn connected(&self) -> Result<Arc<HidGestureDevice>, HalError> {
        self.device
            .lock()
            .clone()
            .ok_or_else(|| HalError::Unavailable("gesture IC not connected".into()))
    }
}

fn unavailable(e: ChannelError) -> HalError {
    HalError::Unavailable(e.to_string())
}

impl GestureDriver for HidDriver {
    fn name(&self) -> &str {
        "hid"
    }

    fn gestures(&self) -> Vec<GestureDescriptor> {
        self.gestures.clone()
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            close_data_source: false,
        }
    }

    fn connect(&self, sink: EventSink) -> Result<(), HalError> {
        let mut slot = self.device.lock();
        if slot.is_some() {
            return Err(HalError::Unavailable("gesture IC already connected".into()));
        }
        let device = Arc::new(HidGestureDevice::open(self.vid, self.pid).map_err(unavailable)?);
        device
            .start_reader(move |raw, timestamp| {
                sink.deliver_type(raw.gesture_type, raw.vector, timestamp);
            })
            .map_err(unavailable)?;
        info!(
            "Gesture IC {:04x}:{:04x} connected ({})",
            self.vid,
            self.pid,
            device.info().product_name.as_deref().unwrap_or("unnamed")
        );
        *slot = Some(device);
        Ok(())
    }

    fn set_enabled(&self, gesture: &GestureDescriptor, enabled: bool) -> Result<(), HalError> {
        self.connected()?
            .set_enabled(gesture.gesture_type, enabled)
            .map_err(HalError::from)
    }

    fn set_sensitivity(
        &self,
        gesture: &GestureDescriptor,
        sensitivity: i32,
    ) -> Result<(), HalError> {
        let value = u8::try_from(sensitivity).map_err(|_| {
            HalError::InvalidArgument(format!(
                "sensitivity {sensitivity} outside 0..=255 for {}",
                gesture.name
            ))
        })?;
        self.connected()?
            .set_sensitivity(gesture.gesture_type, value)
            .map_err(HalError::from)
    }

    fn disconnect(&self) {
        if let Some(device) = self.device.lock().take() {
            device.stop_reader();
            info!("Gesture IC {:04x}:{:04x} disconnected", self.vid, self.pid);
        }
    }
}
