//! In-process gesture driver
//!
//! Stands in for real hardware: detections are injected with `fire`, or
//! produced periodically by an autofire thread that cycles through the
//! enabled gestures.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use gesture_transport::{monotonic_nanos, GestureEvent, GestureHandle, GestureVector};
use parking_lot::Mutex;
use tracing::{debug, info};

use super::{sleep_unless_shutdown, Capabilities, Delivery, EventSink, GestureDriver};
use crate::error::HalError;
use crate::hal::GestureDescriptor;

/// Handle → sensitivity for every gesture currently sampling
type SamplingMap = Arc<Mutex<BTreeMap<GestureHandle, i32>>>;

pub struct SimulatedDriver {
    gestures: Vec<GestureDescriptor>,
    capabilities: Capabilities,
    available: AtomicBool,
    sink: Mutex<Option<EventSink>>,
    sampling: SamplingMap,
    toggles: AtomicUsize,
    autofire: Option<Duration>,
    shutdown: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SimulatedDriver {
    pub fn new(gestures: Vec<GestureDescriptor>) -> Self {
        Self {
            gestures,
            capabilities: Capabilities::default(),
            available: AtomicBool::new(true),
            sink: Mutex::new(None),
            sampling: Arc::new(Mutex::new(BTreeMap::new())),
            toggles: AtomicUsize::new(0),
            autofire: None,
            shutdown: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        }
    }

    /// Emit one detection per interval while connected
    pub fn with_autofire(mut self, interval: Duration) -> Self {
        self.autofire = Some(interval);
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Make the next `connect` fail as if the sensor were unreachable
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Inject a detection stamped with the current monotonic time.
    ///
    /// Returns `None` when no control device is connected.
    pub fn fire(&self, handle: u8, vector: GestureVector) -> Option<Delivery> {
        self.fire_at(handle, vector, monotonic_nanos())
    }

    pub fn fire_at(&self, handle: u8, vector: GestureVector, timestamp_ns: i64) -> Option<Delivery> {
        let sink = self.sink.lock().clone()?;
        Some(sink.deliver(GestureEvent::new(
            GestureHandle::new(handle),
            vector,
            timestamp_ns,
        )))
    }

    pub fn is_connected(&self) -> bool {
        self.sink.lock().is_some()
    }

    pub fn is_sampling(&self, handle: u8) -> bool {
        self.sampling.lock().contains_key(&GestureHandle::new(handle))
    }

    pub fn sampling_sensitivity(&self, handle: u8) -> Option<i32> {
        self.sampling.lock().get(&GestureHandle::new(handle)).copied()
    }

    /// Number of times sampling was actually started or stopped
    pub fn hardware_toggles(&self) -> usize {
        self.toggles.load(Ordering::SeqCst)
    }

    fn spawn_autofire(&self, interval: Duration, sink: EventSink) -> Result<(), HalError> {
        self.shutdown.store(false, Ordering::SeqCst);
        let shutdown = Arc::clone(&self.shutdown);
        let sampling = Arc::clone(&self.sampling);
        let handle = std::thread::Builder::new()
            .name("gesture-autofire".into())
            .spawn(move || autofire_loop(interval, sink, sampling, shutdown))?;
        *self.worker.lock() = Some(handle);
        Ok(())
    }
}

fn autofire_loop(
    interval: Duration,
    sink: EventSink,
    sampling: SamplingMap,
    shutdown: Arc<AtomicBool>,
) {
    debug!("autofire thread started ({:?})", interval);
    let mut turn = 0usize;
    while sleep_unless_shutdown(interval, &shutdown) {
        let next = {
            let sampling = sampling.lock();
            if sampling.is_empty() {
                None
            } else {
                sampling.iter().nth(turn % sampling.len()).map(|(h, s)| (*h, *s))
            }
        };
        if let Some((handle, sensitivity)) = next {
            turn = turn.wrapping_add(1);
            let vector = GestureVector::new([0.0, 0.0, sensitivity as f32], 1);
            sink.deliver(GestureEvent::new(handle, vector, monotonic_nanos()));
        }
    }
    debug!("autofire thread exiting");
}

impl GestureDriver for SimulatedDriver {
    fn name(&self) -> &str {
        "simulated"
    }

    fn gestures(&self) -> Vec<GestureDescriptor> {
        self.gestures.clone()
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn connect(&self, sink: EventSink) -> Result<(), HalError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(HalError::Unavailable("simulated sensor offline".into()));
        }
        let mut slot = self.sink.lock();
        if slot.is_some() {
            return Err(HalError::Unavailable(
                "simulated sensor already connected".into(),
            ));
        }
        if let Some(interval) = self.autofire {
            self.spawn_autofire(interval, sink.clone())?;
        }
        *slot = Some(sink);
        info!("Simulated gesture sensor connected");
        Ok(())
    }

    fn set_enabled(&self, gesture: &GestureDescriptor, enabled: bool) -> Result<(), HalError> {
        let mut sampling = self.sampling.lock();
        let changed = if enabled {
            let sensitivity = self
                .sink
                .lock()
                .as_ref()
                .and_then(|s| s.sensitivity(gesture.handle))
                .unwrap_or(crate::hal::DEFAULT_SENSITIVITY);
            sampling.insert(gesture.handle, sensitivity).is_none()
        } else {
            sampling.remove(&gesture.handle).is_some()
        };
        if changed {
            self.toggles.fetch_add(1, Ordering::SeqCst);
            debug!(
                "Sampling {} for {}",
                if enabled { "started" } else { "stopped" },
                gesture.name
            );
        }
        Ok(())
    }

    fn set_sensitivity(
        &self,
        gesture: &GestureDescriptor,
        sensitivity: i32,
    ) -> Result<(), HalError> {
        if let Some(current) = self.sampling.lock().get_mut(&gesture.handle) {
            *current = sensitivity;
        }
        debug!("Sensitivity of {} set to {}", gesture.name, sensitivity);
        Ok(())
    }

    fn disconnect(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                debug!("autofire thread panicked");
            }
        }
        self.sampling.lock().clear();
        if self.sink.lock().take().is_some() {
            info!("Simulated gesture sensor disconnected");
        }
    }
}
