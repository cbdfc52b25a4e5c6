//! Event channel between a gesture producer and its pollers
//!
//! ```text
//! [driver] → EventSink → ChannelOwner::push ─┐
//!                                            │  bounded FIFO
//!   ChannelOwner::wake ──── wake token ──────┤
//!                                            ▼
//!            ChannelHandle ─ subscribe → ChannelReceiver::recv (blocking)
//! ```
//!
//! The control side holds the `ChannelOwner`, the only thing able to tear
//! the channel down. Consumers get `ChannelHandle`s, which can be
//! duplicated freely and turned into receivers. Receivers on one channel
//! compete for events: each event is delivered to exactly one of them.
//!
//! A wake releases exactly one receiver that is blocked at the time of the
//! call. It is not remembered: with nobody waiting, it is a no-op. Queued
//! events are never discarded by a wake.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use crate::error::ChannelError;
use crate::types::{GestureEvent, PollOutcome};

/// Default queue depth
pub const DEFAULT_CAPACITY: usize = 128;

// ============================================================================
// Tokens and registry
// ============================================================================

/// Serialisable identity of a channel, resolvable within this process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelToken(u64);

const TOKEN_PREFIX: &str = "gesture-channel:";

impl ChannelToken {
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChannelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{TOKEN_PREFIX}{}", self.0)
    }
}

impl FromStr for ChannelToken {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s
            .strip_prefix(TOKEN_PREFIX)
            .ok_or_else(|| format!("expected '{TOKEN_PREFIX}<id>', got '{s}'"))?;
        id.parse()
            .map(ChannelToken)
            .map_err(|e| format!("bad channel id '{id}': {e}"))
    }
}

static NEXT_CHANNEL_ID: AtomicU64 = AtomicU64::new(1);

/// Live channels by token
struct ChannelRegistry {
    channels: Mutex<HashMap<ChannelToken, Weak<Shared>>>,
}

static REGISTRY: OnceLock<ChannelRegistry> = OnceLock::new();

fn channel_registry() -> &'static ChannelRegistry {
    REGISTRY.get_or_init(|| ChannelRegistry {
        channels: Mutex::new(HashMap::new()),
    })
}

impl ChannelRegistry {
    fn register(&self, token: ChannelToken, shared: &Arc<Shared>) {
        self.channels.lock().insert(token, Arc::downgrade(shared));
    }

    fn unregister(&self, token: ChannelToken) {
        self.channels.lock().remove(&token);
    }

    fn resolve(&self, token: ChannelToken) -> Option<Arc<Shared>> {
        self.channels.lock().get(&token).and_then(Weak::upgrade)
    }
}

// ============================================================================
// Shared queue state
// ============================================================================

struct QueueState {
    events: VecDeque<GestureEvent>,
    /// Receivers currently blocked in `recv`
    waiting: usize,
    /// Wakes addressed to blocked receivers, never more than `waiting`
    wakes: usize,
    closed: bool,
    dropped: u64,
}

struct Shared {
    token: ChannelToken,
    capacity: usize,
    state: Mutex<QueueState>,
    ready: Condvar,
}

impl Shared {
    fn notify(&self) {
        self.ready.notify_all();
    }
}

// ============================================================================
// Owner (control side)
// ============================================================================

/// Producer and lifetime owner of a channel
pub struct ChannelOwner {
    shared: Arc<Shared>,
}

impl ChannelOwner {
    /// Create a channel and register it for token lookup
    pub fn create(capacity: usize) -> Self {
        let token = ChannelToken(NEXT_CHANNEL_ID.fetch_add(1, Ordering::Relaxed));
        let shared = Arc::new(Shared {
            token,
            capacity: capacity.max(1),
            state: Mutex::new(QueueState {
                events: VecDeque::with_capacity(capacity.max(1)),
                waiting: 0,
                wakes: 0,
                closed: false,
                dropped: 0,
            }),
            ready: Condvar::new(),
        });
        channel_registry().register(token, &shared);
        debug!("Created {} (capacity {})", token, shared.capacity);
        Self { shared }
    }

    pub fn token(&self) -> ChannelToken {
        self.shared.token
    }

    /// A transferable reference for consumers
    pub fn handle(&self) -> ChannelHandle {
        ChannelHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Queue one event; on overflow the oldest queued event is dropped
    pub fn push(&self, event: GestureEvent) -> Result<(), ChannelError> {
        let mut st = self.shared.state.lock();
        if st.closed {
            return Err(ChannelError::Closed);
        }
        if st.events.len() >= self.shared.capacity {
            st.events.pop_front();
            st.dropped += 1;
            warn!(
                "{} full, dropped oldest event ({} total)",
                self.shared.token, st.dropped
            );
        }
        st.events.push_back(event);
        drop(st);
        self.shared.notify();
        Ok(())
    }

    /// Release one blocked receiver. Returns false when nobody was waiting.
    pub fn wake(&self) -> bool {
        let mut st = self.shared.state.lock();
        if st.closed || st.waiting <= st.wakes {
            return false;
        }
        st.wakes += 1;
        drop(st);
        self.shared.notify();
        true
    }

    /// Tear the channel down. Blocked and future receives fail with
    /// `ChannelError::Closed`; queued events are discarded.
    pub fn close(&self) {
        let mut st = self.shared.state.lock();
        if st.closed {
            return;
        }
        st.closed = true;
        st.wakes = 0;
        let discarded = st.events.len();
        st.events.clear();
        drop(st);
        channel_registry().unregister(self.shared.token);
        self.shared.notify();
        debug!(
            "Closed {} ({} queued events discarded)",
            self.shared.token, discarded
        );
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    /// Events dropped because the queue was full
    pub fn dropped_events(&self) -> u64 {
        self.shared.state.lock().dropped
    }

    pub fn pending(&self) -> usize {
        self.shared.state.lock().events.len()
    }
}

impl Drop for ChannelOwner {
    fn drop(&mut self) {
        self.close();
    }
}

// ============================================================================
// Handle (transferable reference)
// ============================================================================

/// Non-owning reference to a channel.
///
/// Dropping a handle never tears the channel down; only the owner can.
pub struct ChannelHandle {
    shared: Arc<Shared>,
}

impl ChannelHandle {
    /// Resolve a token issued by a live `ChannelOwner`
    pub fn from_token(token: ChannelToken) -> Result<Self, ChannelError> {
        channel_registry()
            .resolve(token)
            .filter(|shared| !shared.state.lock().closed)
            .map(|shared| ChannelHandle { shared })
            .ok_or(ChannelError::UnknownChannel(token))
    }

    /// Independent reference to the same channel
    pub fn duplicate(&self) -> ChannelHandle {
        ChannelHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn token(&self) -> ChannelToken {
        self.shared.token
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    /// Attach a new receiver to the channel
    pub fn subscribe(&self) -> ChannelReceiver {
        ChannelReceiver {
            shared: Arc::clone(&self.shared),
            detached: AtomicBool::new(false),
        }
    }
}

impl fmt::Debug for ChannelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelHandle")
            .field("token", &self.shared.token)
            .finish()
    }
}

// ============================================================================
// Receiver (consumer side)
// ============================================================================

/// One consumer of a channel
pub struct ChannelReceiver {
    shared: Arc<Shared>,
    detached: AtomicBool,
}

impl ChannelReceiver {
    /// Block until an event arrives, a wake is addressed to this receiver,
    /// the receiver is detached, or the channel is torn down.
    pub fn recv(&self) -> Result<PollOutcome, ChannelError> {
        let mut st = self.shared.state.lock();
        loop {
            if self.detached.load(Ordering::Acquire) {
                return Ok(PollOutcome::Woken);
            }
            if st.closed {
                return Err(ChannelError::Closed);
            }
            if let Some(event) = st.events.pop_front() {
                return Ok(PollOutcome::Event(event));
            }

            st.waiting += 1;
            self.shared.ready.wait(&mut st);
            st.waiting -= 1;

            // A detached receiver leaves any pending wake to the receivers
            // still blocked; keep wakes <= waiting once it is gone.
            if self.detached.load(Ordering::Acquire) {
                st.wakes = st.wakes.min(st.waiting);
                return Ok(PollOutcome::Woken);
            }
            if st.wakes > 0 {
                st.wakes -= 1;
                return Ok(PollOutcome::Woken);
            }
        }
    }

    /// Take a queued event without blocking
    pub fn try_recv(&self) -> Result<Option<GestureEvent>, ChannelError> {
        if self.detached.load(Ordering::Acquire) {
            return Ok(None);
        }
        let mut st = self.shared.state.lock();
        if st.closed {
            return Err(ChannelError::Closed);
        }
        Ok(st.events.pop_front())
    }

    /// Stop receiving. A blocked `recv` on this receiver returns `Woken`;
    /// other receivers and the channel itself are unaffected.
    pub fn detach(&self) {
        // Flip the flag under the lock so a receiver between its check and
        // its wait cannot miss the notification.
        let _st = self.shared.state.lock();
        self.detached.store(true, Ordering::Release);
        self.shared.notify();
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }

    pub fn token(&self) -> ChannelToken {
        self.shared.token
    }
}
