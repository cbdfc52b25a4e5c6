//! Control device: activation, sensitivity, data source ownership and wake
//!
//! ```text
//!  Closed ──open()──▶ Open ──open_data_source()──▶ DataSourceOpened
//!    ▲                 │  ◀──close_data_source()──        │
//!    └────close()──────┴──────────────close()─────────────┘
//! ```
//!
//! Lifecycle calls on one instance must be serialized by the caller.
//! `activate`, `set_sensitivity` and `wake` may run concurrently with a
//! poll on any data device attached to this control device's channel.

use std::sync::Arc;

use gesture_transport::{ChannelHandle, ChannelOwner};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::activation::{ActivationSet, Toggle};
use crate::driver::{BoxedDriver, Capabilities, EventSink};
use crate::error::HalError;
use crate::hal::{GestureCatalog, GestureDescriptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    Closed,
    Open,
    DataSourceOpened,
}

pub struct ControlDevice {
    driver: BoxedDriver,
    catalog: Arc<GestureCatalog>,
    activation: Arc<ActivationSet>,
    channel: Arc<Mutex<Option<ChannelOwner>>>,
    state: Mutex<ControlState>,
    queue_capacity: usize,
}

impl ControlDevice {
    /// A closed control device; call `open` before use
    pub fn new(
        driver: BoxedDriver,
        catalog: Arc<GestureCatalog>,
        queue_capacity: usize,
        default_sensitivity: i32,
    ) -> Self {
        let activation = Arc::new(ActivationSet::new(&catalog, default_sensitivity));
        Self {
            driver,
            catalog,
            activation,
            channel: Arc::new(Mutex::new(None)),
            state: Mutex::new(ControlState::Closed),
            queue_capacity,
        }
    }

    /// Connect to the sensor: Closed → Open
    pub fn open(&self) -> Result<(), HalError> {
        let mut state = self.state.lock();
        if *state != ControlState::Closed {
            return Err(HalError::InvalidState("control device already open".into()));
        }
        self.activation.reset();
        let sink = EventSink::new(
            Arc::clone(&self.catalog),
            Arc::clone(&self.activation),
            Arc::clone(&self.channel),
        );
        self.driver.connect(sink)?;
        *state = ControlState::Open;
        info!("Control device open on '{}' driver", self.driver.name());
        Ok(())
    }

    pub fn state(&self) -> ControlState {
        *self.state.lock()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.driver.capabilities()
    }

    pub fn activation(&self) -> &ActivationSet {
        &self.activation
    }

    pub fn catalog(&self) -> &GestureCatalog {
        &self.catalog
    }

    /// Create the event channel and return a transferable handle to it.
    ///
    /// The control device keeps ownership; if a data source is already open
    /// another reference to the same channel is returned.
    pub fn open_data_source(&self) -> Result<ChannelHandle, HalError> {
        let mut state = self.state.lock();
        if *state == ControlState::Closed {
            return Err(HalError::InvalidState("control device is closed".into()));
        }
        let mut channel = self.channel.lock();
        if let Some(owner) = channel.as_ref() {
            debug!("Data source already open, handing out {}", owner.token());
            return Ok(owner.handle());
        }
        let owner = ChannelOwner::create(self.queue_capacity);
        let handle = owner.handle();
        info!("Opened data source {}", owner.token());
        *channel = Some(owner);
        *state = ControlState::DataSourceOpened;
        Ok(handle)
    }

    /// Release the channel created by `open_data_source`.
    ///
    /// Returns `None` when the driver lacks this capability. Closing with no
    /// data source open succeeds.
    pub fn close_data_source(&self) -> Option<Result<(), HalError>> {
        if !self.driver.capabilities().close_data_source {
            return None;
        }
        let mut state = self.state.lock();
        self.release_data_source();
        if *state == ControlState::DataSourceOpened {
            *state = ControlState::Open;
        }
        Some(Ok(()))
    }

    fn release_data_source(&self) {
        if let Some(owner) = self.channel.lock().take() {
            owner.close();
            info!("Closed data source {}", owner.token());
        }
    }

    fn lookup(&self, handle: i32) -> Result<&GestureDescriptor, HalError> {
        self.catalog.lookup(handle)
    }

    fn ensure_open(state: ControlState) -> Result<(), HalError> {
        if state == ControlState::Closed {
            Err(HalError::InvalidState("control device is closed".into()))
        } else {
            Ok(())
        }
    }

    /// Enable or disable one gesture
    pub fn activate(&self, handle: i32, enabled: bool) -> Result<(), HalError> {
        let gesture = self.lookup(handle)?;
        let state = self.state.lock();
        Self::ensure_open(*state)?;

        if self.activation.would_toggle(gesture.handle, enabled) == Some(Toggle::Unchanged) {
            debug!("{} already {}", gesture.name, on_off(enabled));
            return Ok(());
        }
        self.driver.set_enabled(gesture, enabled)?;
        self.activation.set_enabled(gesture.handle, enabled);
        info!("{} (handle {}) {}", gesture.name, gesture.handle, on_off(enabled));
        Ok(())
    }

    /// Set the sensitivity of one gesture; no re-activation needed
    pub fn set_sensitivity(&self, handle: i32, sensitivity: i32) -> Result<(), HalError> {
        let gesture = self.lookup(handle)?;
        let state = self.state.lock();
        Self::ensure_open(*state)?;

        self.driver.set_sensitivity(gesture, sensitivity)?;
        self.activation.set_sensitivity(gesture.handle, sensitivity);
        debug!("{} sensitivity = {}", gesture.name, sensitivity);
        Ok(())
    }

    /// Release one data device blocked in `poll`.
    ///
    /// Safe from any thread. Returns false when no poll was waiting, in
    /// which case nothing is remembered for later polls.
    pub fn wake(&self) -> bool {
        let woke = self
            .channel
            .lock()
            .as_ref()
            .is_some_and(|owner| owner.wake());
        debug!("wake: {}", if woke { "released a poller" } else { "no poller" });
        woke
    }

    /// Disable every gesture, drop the data source and release the sensor
    pub fn close(&self) {
        let mut state = self.state.lock();
        if *state == ControlState::Closed {
            return;
        }
        for handle in self.activation.enabled_handles() {
            if let Some(gesture) = self.catalog.get(handle) {
                if let Err(e) = self.driver.set_enabled(gesture, false) {
                    warn!("Failed to stop {} on close: {}", gesture.name, e);
                }
            }
        }
        self.activation.reset();
        self.release_data_source();
        self.driver.disconnect();
        *state = ControlState::Closed;
        info!("Control device closed");
    }
}

impl Drop for ControlDevice {
    fn drop(&mut self) {
        self.close();
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}
