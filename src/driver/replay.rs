//! Replays a recording of wire records
//!
//! The recording is read when the driver is created. After connect, a
//! worker thread waits for a data source to be opened, then re-emits the
//! events of enabled gestures with their original spacing (divided by
//! `speed`), stamped on the local clock.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use gesture_transport::{monotonic_nanos, GestureEvent, RecordReader};
use parking_lot::Mutex;
use tracing::{debug, info};

use super::{sleep_unless_shutdown, EventSink, GestureDriver, SLEEP_SLICE};
use crate::error::HalError;
use crate::hal::GestureDescriptor;

pub struct ReplayDriver {
    path: PathBuf,
    speed: f64,
    gestures: Vec<GestureDescriptor>,
    events: Arc<Vec<GestureEvent>>,
    connected: AtomicBool,
    shutdown: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ReplayDriver {
    pub fn new(
        path: PathBuf,
        speed: f64,
        gestures: Vec<GestureDescriptor>,
    ) -> Result<Self, HalError> {
        if !(speed.is_finite() && speed > 0.0) {
            return Err(HalError::Config(format!(
                "replay speed must be positive, got {speed}"
            )));
        }
        let file = File::open(&path)
            .map_err(|e| HalError::Unavailable(format!("open {}: {e}", path.display())))?;
        let events = RecordReader::new(BufReader::new(file)).collect::<Result<Vec<_>, _>>()?;
        info!("Loaded {} recorded events from {}", events.len(), path.display());
        Ok(Self::from_events(path, speed, gestures, events))
    }

    /// Replay an in-memory list instead of a file
    pub fn from_events(
        path: PathBuf,
        speed: f64,
        gestures: Vec<GestureDescriptor>,
        events: Vec<GestureEvent>,
    ) -> Self {
        Self {
            path,
            speed,
            gestures,
            events: Arc::new(events),
            connected: AtomicBool::new(false),
            shutdown: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Pause between two recorded timestamps, scaled by `speed`.
///
/// Recordings are untrusted: the difference saturates and a backwards
/// step waits zero.
fn replay_gap(prev: i64, next: i64, speed: f64) -> Duration {
    let gap_ns = next.saturating_sub(prev).max(0) as f64 / speed;
    Duration::from_nanos(gap_ns as u64)
}

fn replay_loop(events: Arc<Vec<GestureEvent>>, speed: f64, sink: EventSink, shutdown: Arc<AtomicBool>) {
    debug!("replay thread started ({} events, x{})", events.len(), speed);
    while !sink.has_data_source() {
        if !sleep_unless_shutdown(SLEEP_SLICE, &shutdown) {
            return;
        }
    }
    let mut previous: Option<i64> = None;
    for recorded in events.iter() {
        if let Some(prev) = previous {
            if !sleep_unless_shutdown(replay_gap(prev, recorded.timestamp_ns, speed), &shutdown) {
                break;
            }
        } else if shutdown.load(Ordering::Relaxed) {
            break;
        }
        previous = Some(recorded.timestamp_ns);

        if !sink.is_enabled(recorded.gesture) {
            continue;
        }
        let mut event = *recorded;
        event.timestamp_ns = monotonic_nanos();
        sink.deliver(event);
    }
    debug!("replay thread exiting");
}

impl GestureDriver for ReplayDriver {
    fn name(&self) -> &str {
        "replay"
    }

    fn gestures(&self) -> Vec<GestureDescriptor> {
        self.gestures.clone()
    }

    fn connect(&self, sink: EventSink) -> Result<(), HalError> {
        if self.connected.swap(true, Ordering::SeqCst) {
            return Err(HalError::Unavailable("replay already connected".into()));
        }
        self.shutdown.store(false, Ordering::SeqCst);
        let events = Arc::clone(&self.events);
        let shutdown = Arc::clone(&self.shutdown);
        let speed = self.speed;
        let spawned = std::thread::Builder::new()
            .name("gesture-replay".into())
            .spawn(move || replay_loop(events, speed, sink, shutdown));
        match spawned {
            Ok(handle) => {
                *self.worker.lock() = Some(handle);
                info!("Replaying {}", self.path.display());
                Ok(())
            }
            Err(e) => {
                self.connected.store(false, Ordering::SeqCst);
                Err(e.into())
            }
        }
    }

    fn set_enabled(&self, _gesture: &GestureDescriptor, _enabled: bool) -> Result<(), HalError> {
        // Filtering happens against the activation set at replay time
        Ok(())
    }

    fn set_sensitivity(
        &self,
        _gesture: &GestureDescriptor,
        _sensitivity: i32,
    ) -> Result<(), HalError> {
        Ok(())
    }

    fn disconnect(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                debug!("replay thread panicked");
            }
        }
        self.connected.store(false, Ordering::SeqCst);
    }
}
