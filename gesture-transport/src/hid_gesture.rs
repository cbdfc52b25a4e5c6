//! HID access to a gesture IC
//!
//! The IC exposes one vendor interface. Commands go out as feature reports
//! on one handle; a second handle to the same interface is moved into the
//! reader thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use hidapi::{HidApi, HidDevice};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::ChannelError;
use crate::event_parser::{build_command, run_event_reader_loop, EventReaderConfig, RawGesture};
use crate::protocol::hid;
use crate::types::GestureType;

/// Identification of an opened gesture IC
#[derive(Debug, Clone)]
pub struct GestureDeviceInfo {
    pub vid: u16,
    pub pid: u16,
    pub path: String,
    pub product_name: Option<String>,
}

/// An opened gesture IC
pub struct HidGestureDevice {
    command_device: Mutex<HidDevice>,
    info: GestureDeviceInfo,
    shutdown: Arc<AtomicBool>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl HidGestureDevice {
    fn is_gesture_interface(device_info: &hidapi::DeviceInfo) -> bool {
        device_info.usage_page() == hid::USAGE_PAGE && device_info.usage() == hid::USAGE_INPUT
    }

    /// Find and open the gesture interface of the given VID/PID
    pub fn open(vid: u16, pid: u16) -> Result<Self, ChannelError> {
        let api = HidApi::new()?;
        let device_info = api
            .device_list()
            .find(|d| {
                d.vendor_id() == vid && d.product_id() == pid && Self::is_gesture_interface(d)
            })
            .cloned()
            .ok_or_else(|| {
                ChannelError::DeviceNotFound(format!("no gesture interface on {vid:04x}:{pid:04x}"))
            })?;

        let command_device = device_info.open_device(&api)?;
        let info = GestureDeviceInfo {
            vid,
            pid,
            path: device_info.path().to_string_lossy().into_owned(),
            product_name: device_info.product_string().map(str::to_owned),
        };
        info!("Opened gesture IC {:04x}:{:04x} at {}", vid, pid, info.path);

        Ok(Self {
            command_device: Mutex::new(command_device),
            info,
            shutdown: Arc::new(AtomicBool::new(false)),
            reader: Mutex::new(None),
        })
    }

    pub fn info(&self) -> &GestureDeviceInfo {
        &self.info
    }

    /// Spawn the reader thread; a second call while it runs is a no-op
    pub fn start_reader<F>(&self, on_gesture: F) -> Result<(), ChannelError>
    where
        F: FnMut(RawGesture, i64) + Send + 'static,
    {
        let mut reader = self.reader.lock();
        if reader.is_some() {
            return Ok(());
        }

        let api = HidApi::new()?;
        let path = std::ffi::CString::new(self.info.path.clone())
            .map_err(|e| ChannelError::HidError(e.to_string()))?;
        let input = api.open_path(&path)?;

        self.shutdown.store(false, Ordering::SeqCst);
        let shutdown = Arc::clone(&self.shutdown);
        let handle = std::thread::Builder::new()
            .name("gesture-event-reader".into())
            .spawn(move || {
                run_event_reader_loop(input, shutdown, on_gesture, EventReaderConfig::default());
            })?;
        *reader = Some(handle);
        Ok(())
    }

    /// Stop the reader thread and wait for it to exit
    pub fn stop_reader(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.reader.lock().take() {
            if handle.join().is_err() {
                debug!("gesture reader thread panicked");
            }
        }
    }

    pub fn set_enabled(&self, gesture_type: GestureType, enabled: bool) -> Result<(), ChannelError> {
        self.send(build_command(
            hid::cmd::SET_ENABLE,
            gesture_type,
            u8::from(enabled),
        ))
    }

    pub fn set_sensitivity(&self, gesture_type: GestureType, value: u8) -> Result<(), ChannelError> {
        self.send(build_command(hid::cmd::SET_SENSITIVITY, gesture_type, value))
    }

    fn send(&self, buf: [u8; hid::COMMAND_SIZE]) -> Result<(), ChannelError> {
        debug!("Sending gesture command: {:02X?}", buf);
        self.command_device.lock().send_feature_report(&buf)?;
        Ok(())
    }
}

impl Drop for HidGestureDevice {
    fn drop(&mut self) {
        self.stop_reader();
    }
}
