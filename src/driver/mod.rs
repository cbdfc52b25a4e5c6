//! Gesture driver abstraction
//!
//! A driver is the piece that talks to the sensor: it turns activation and
//! sensitivity requests into whatever the hardware needs, and pushes
//! detections into the `EventSink` it was connected with.
//!
//! ```text
//! [SimulatedDriver / HidDriver / ReplayDriver]  ← implements GestureDriver
//!                  |
//!              EventSink                         ← filters against ActivationSet
//!                  |
//!            ChannelOwner                        ← owned by the ControlDevice
//! ```
//!
//! The variant is chosen at startup from configuration.

mod hid;
mod replay;
mod simulated;

pub use hid::HidDriver;
pub use replay::ReplayDriver;
pub use simulated::SimulatedDriver;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use gesture_transport::{ChannelOwner, GestureEvent, GestureHandle, GestureType, GestureVector};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::activation::ActivationSet;
use crate::config::{DriverConfig, HalConfig};
use crate::error::HalError;
use crate::hal::{GestureCatalog, GestureDescriptor};

/// Optional operations a driver may or may not support
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// The data source can be released without closing the control device
    pub close_data_source: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            close_data_source: true,
        }
    }
}

/// The capability interface every gesture driver implements
pub trait GestureDriver: Send + Sync {
    /// Short identifier for logs
    fn name(&self) -> &str;

    /// The gestures this driver can produce
    fn gestures(&self) -> Vec<GestureDescriptor>;

    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    /// Reach the sensor and start delivering detections into `sink`.
    ///
    /// Fails with `HalError::Unavailable` when the sensor cannot be reached
    /// or is already connected to another control device.
    fn connect(&self, sink: EventSink) -> Result<(), HalError>;

    /// Start or stop sampling for one gesture
    fn set_enabled(&self, gesture: &GestureDescriptor, enabled: bool) -> Result<(), HalError>;

    /// Applied from the next sampling cycle on
    fn set_sensitivity(&self, gesture: &GestureDescriptor, sensitivity: i32)
        -> Result<(), HalError>;

    /// Stop delivering and release the sensor
    fn disconnect(&self);
}

/// Type alias for a shared driver
pub type BoxedDriver = Arc<dyn GestureDriver>;

/// Build the driver selected by the configuration
pub fn build_driver(config: &HalConfig) -> Result<BoxedDriver, HalError> {
    let gestures = config.gestures()?;
    let driver: BoxedDriver = match &config.driver {
        DriverConfig::Simulated { autofire_ms } => {
            let mut driver = SimulatedDriver::new(gestures);
            if *autofire_ms > 0 {
                driver = driver.with_autofire(Duration::from_millis(*autofire_ms));
            }
            Arc::new(driver)
        }
        DriverConfig::Hid { vid, pid } => Arc::new(HidDriver::new(*vid, *pid, gestures)),
        DriverConfig::Replay { path, speed } => {
            Arc::new(ReplayDriver::new(path.clone(), *speed, gestures)?)
        }
    };
    debug!("Selected driver '{}'", driver.name());
    Ok(driver)
}

/// Longest single sleep of a driver thread, so shutdown is noticed promptly
const SLEEP_SLICE: Duration = Duration::from_millis(20);

/// Sleep for `total` in short slices. Returns false as soon as `shutdown`
/// is set, true once the full duration has passed.
fn sleep_unless_shutdown(total: Duration, shutdown: &AtomicBool) -> bool {
    let mut left = total;
    while !left.is_zero() {
        if shutdown.load(Ordering::Relaxed) {
            return false;
        }
        let slice = left.min(SLEEP_SLICE);
        std::thread::sleep(slice);
        left -= slice;
    }
    !shutdown.load(Ordering::Relaxed)
}

// ============================================================================
// EventSink
// ============================================================================

/// What happened to an event handed to the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    /// Handle is in the catalog but not enabled
    Disabled,
    /// Handle (or gesture type) is not in the catalog
    Unknown,
    /// Timestamp earlier than the last delivered event of the same handle
    OutOfOrder,
    /// No data source is open
    NoDataSource,
}

struct SinkShared {
    catalog: Arc<GestureCatalog>,
    activation: Arc<ActivationSet>,
    channel: Arc<Mutex<Option<ChannelOwner>>>,
    last_timestamp: Mutex<HashMap<GestureHandle, i64>>,
}

/// Producer end handed to a driver on connect.
///
/// Only events for catalog handles that are currently enabled reach the
/// channel, and per handle their timestamps never go backwards.
#[derive(Clone)]
pub struct EventSink {
    shared: Arc<SinkShared>,
}

impl EventSink {
    pub(crate) fn new(
        catalog: Arc<GestureCatalog>,
        activation: Arc<ActivationSet>,
        channel: Arc<Mutex<Option<ChannelOwner>>>,
    ) -> Self {
        Self {
            shared: Arc::new(SinkShared {
                catalog,
                activation,
                channel,
                last_timestamp: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn catalog(&self) -> &GestureCatalog {
        &self.shared.catalog
    }

    pub fn is_enabled(&self, handle: GestureHandle) -> bool {
        self.shared.activation.is_enabled(handle)
    }

    pub fn sensitivity(&self, handle: GestureHandle) -> Option<i32> {
        self.shared.activation.get(handle).map(|a| a.sensitivity)
    }

    pub fn has_data_source(&self) -> bool {
        self.shared.channel.lock().is_some()
    }

    /// Deliver one detection
    pub fn deliver(&self, event: GestureEvent) -> Delivery {
        let handle = event.gesture;
        if !self.shared.catalog.contains(handle) {
            warn!("Dropping event for handle {} not in catalog", handle);
            return Delivery::Unknown;
        }
        if !self.shared.activation.is_enabled(handle) {
            debug!("Dropping event for disabled handle {}", handle);
            return Delivery::Disabled;
        }

        let mut last = self.shared.last_timestamp.lock();
        if let Some(&prev) = last.get(&handle) {
            if event.timestamp_ns < prev {
                warn!(
                    "Dropping out-of-order event for handle {}: {} < {}",
                    handle, event.timestamp_ns, prev
                );
                return Delivery::OutOfOrder;
            }
        }

        let channel = self.shared.channel.lock();
        let Some(owner) = channel.as_ref() else {
            trace!("No data source open, discarding event for handle {}", handle);
            return Delivery::NoDataSource;
        };
        match owner.push(event) {
            Ok(()) => {
                last.insert(handle, event.timestamp_ns);
                trace!("Queued event for handle {} at {}ns", handle, event.timestamp_ns);
                Delivery::Queued
            }
            Err(_) => Delivery::NoDataSource,
        }
    }

    /// Deliver a detection reported by gesture type rather than by handle
    pub fn deliver_type(
        &self,
        gesture_type: GestureType,
        vector: GestureVector,
        timestamp_ns: i64,
    ) -> Delivery {
        match self.shared.catalog.find_by_type(gesture_type) {
            Some(g) => self.deliver(GestureEvent::new(g.handle, vector, timestamp_ns)),
            None => {
                warn!("Dropping {} event: no such gesture in catalog", gesture_type);
                Delivery::Unknown
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::builtin_gestures;
    use gesture_transport::PollOutcome;

    struct Fixture {
        sink: EventSink,
        activation: Arc<ActivationSet>,
        channel: Arc<Mutex<Option<ChannelOwner>>>,
    }

    fn fixture() -> Fixture {
        let catalog = Arc::new(GestureCatalog::new(builtin_gestures()).unwrap());
        let activation = Arc::new(ActivationSet::new(&catalog, 5));
        let channel = Arc::new(Mutex::new(Some(ChannelOwner::create(8))));
        let sink = EventSink::new(catalog, Arc::clone(&activation), Arc::clone(&channel));
        Fixture {
            sink,
            activation,
            channel,
        }
    }

    fn tap(handle: u8, time: i64) -> GestureEvent {
        GestureEvent::new(GestureHandle::new(handle), GestureVector::new([0.0; 3], 1), time)
    }

    #[test]
    fn test_disabled_and_unknown_dropped() {
        let f = fixture();
        assert_eq!(f.sink.deliver(tap(2, 1)), Delivery::Disabled);
        assert_eq!(f.sink.deliver(tap(99, 1)), Delivery::Unknown);
    }

    #[test]
    fn test_enabled_event_queued() {
        let f = fixture();
        f.activation.set_enabled(GestureHandle::new(2), true);
        assert_eq!(f.sink.deliver(tap(2, 1)), Delivery::Queued);

        let rx = f.channel.lock().as_ref().unwrap().handle().subscribe();
        assert_eq!(rx.recv().unwrap(), PollOutcome::Event(tap(2, 1)));
    }

    #[test]
    fn test_timestamp_regression_dropped() {
        let f = fixture();
        f.activation.set_enabled(GestureHandle::new(1), true);
        f.activation.set_enabled(GestureHandle::new(2), true);
        assert_eq!(f.sink.deliver(tap(1, 100)), Delivery::Queued);
        assert_eq!(f.sink.deliver(tap(1, 50)), Delivery::OutOfOrder);
        // Other handles are not ordered against handle 1
        assert_eq!(f.sink.deliver(tap(2, 50)), Delivery::Queued);
        assert_eq!(f.sink.deliver(tap(1, 100)), Delivery::Queued);
    }

    #[test]
    fn test_no_data_source() {
        let f = fixture();
        f.activation.set_enabled(GestureHandle::new(2), true);
        assert!(f.sink.has_data_source());
        f.channel.lock().take();
        assert!(!f.sink.has_data_source());
        assert_eq!(f.sink.deliver(tap(2, 1)), Delivery::NoDataSource);
    }

    #[test]
    fn test_sleep_cut_short_by_shutdown() {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let setter = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            flag.store(true, Ordering::SeqCst);
        });
        let start = std::time::Instant::now();
        assert!(!sleep_unless_shutdown(Duration::from_secs(30), &shutdown));
        assert!(start.elapsed() < Duration::from_secs(5));
        setter.join().unwrap();

        assert!(!sleep_unless_shutdown(Duration::ZERO, &shutdown));
        assert!(sleep_unless_shutdown(Duration::from_millis(1), &AtomicBool::new(false)));
    }

    #[test]
    fn test_deliver_by_type() {
        let f = fixture();
        f.activation.set_enabled(GestureHandle::new(3), true);
        assert_eq!(
            f.sink
                .deliver_type(GestureType::OffGlass, GestureVector::default(), 7),
            Delivery::Queued
        );
    }
}
