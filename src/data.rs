//! Data device: the consumer end of a data source
//!
//! A data device borrows a channel created by some control device's
//! `open_data_source`, never owning it, and pulls events one at a time
//! with a blocking `poll`. Several data devices may share one channel;
//! each event then reaches exactly one of them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use gesture_transport::{
    ChannelError, ChannelHandle, ChannelReceiver, ChannelToken, GestureRecord, PollOutcome,
};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::HalError;

#[derive(Default)]
pub struct DataDevice {
    receiver: Mutex<Option<Arc<ChannelReceiver>>>,
    /// Set by `data_close`; later polls report `Woken` instead of failing
    released: AtomicBool,
}

impl DataDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach to a channel handed out by `ControlDevice::open_data_source`.
    ///
    /// The handle is duplicated; the caller keeps theirs.
    pub fn data_open(&self, handle: &ChannelHandle) -> Result<(), HalError> {
        let mut slot = self.receiver.lock();
        if slot.is_some() {
            return Err(HalError::InvalidState("data device already open".into()));
        }
        if handle.is_closed() {
            return Err(HalError::Protocol(format!(
                "{} has been torn down",
                handle.token()
            )));
        }
        let receiver = handle.duplicate().subscribe();
        info!("Data device attached to {}", receiver.token());
        *slot = Some(Arc::new(receiver));
        self.released.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Attach by token, the serialisable form of a channel handle
    pub fn data_open_token(&self, token: ChannelToken) -> Result<(), HalError> {
        let handle = ChannelHandle::from_token(token).map_err(|e| match e {
            ChannelError::UnknownChannel(t) => {
                HalError::Protocol(format!("{t} was not issued by a live control device"))
            }
            other => HalError::Channel(other),
        })?;
        self.data_open(&handle)
    }

    /// Block until one event is available or the poll is woken.
    ///
    /// Fails with a protocol error when the device was never opened and
    /// with `ChannelError::Closed` when the channel is torn down.
    pub fn poll(&self) -> Result<PollOutcome, HalError> {
        // Clone out so data_close can run while we block
        let receiver = self.receiver.lock().clone();
        match receiver {
            Some(rx) => Ok(rx.recv()?),
            None if self.released.load(Ordering::SeqCst) => Ok(PollOutcome::Woken),
            None => Err(HalError::Protocol("poll on a data device that was never opened".into())),
        }
    }

    /// `poll` in its integer form.
    ///
    /// Fills `out` and returns the gesture handle on an event, returns
    /// `WAKE_SENTINEL` (leaving `out` untouched) when woken, and a
    /// negative errno on failure.
    pub fn poll_raw(&self, out: &mut GestureRecord) -> i32 {
        match self.poll() {
            Ok(PollOutcome::Event(event)) => {
                *out = GestureRecord::from(&event);
                out.gesture
            }
            Ok(outcome @ PollOutcome::Woken) => outcome.code(),
            Err(e) => {
                debug!("poll failed: {}", e);
                e.errno()
            }
        }
    }

    /// Stop receiving. A poll blocked on this device returns `Woken`;
    /// the channel and other data devices are unaffected.
    pub fn data_close(&self) {
        let receiver = self.receiver.lock().take();
        self.released.store(true, Ordering::SeqCst);
        if let Some(rx) = receiver {
            rx.detach();
            info!("Data device detached from {}", rx.token());
        }
    }

    pub fn is_open(&self) -> bool {
        self.receiver.lock().is_some()
    }

    pub fn token(&self) -> Option<ChannelToken> {
        self.receiver.lock().as_ref().map(|rx| rx.token())
    }
}

impl Drop for DataDevice {
    fn drop(&mut self) {
        self.data_close();
    }
}
