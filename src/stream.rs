//! Async adapter over a data device
//!
//! `poll` blocks, so it runs on its own thread and forwards outcomes over a
//! bounded tokio channel. The stream ends once the data device is closed
//! or its channel is torn down.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use gesture_transport::PollOutcome;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::data::DataDevice;
use crate::error::HalError;

pub type StreamItem = Result<PollOutcome, HalError>;

pub struct EventStream {
    inner: ReceiverStream<StreamItem>,
    device: Arc<DataDevice>,
}

impl EventStream {
    /// Start polling `device` on a background thread.
    ///
    /// A `Woken` outcome is forwarded while the device stays open; after
    /// `data_close` it ends the stream instead.
    pub fn spawn(device: Arc<DataDevice>, buffer: usize) -> Self {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let poller = Arc::clone(&device);
        std::thread::Builder::new()
            .name("gesture-poll".into())
            .spawn(move || poll_loop(poller, tx))
            .expect("Failed to spawn gesture poll thread");
        Self {
            inner: ReceiverStream::new(rx),
            device,
        }
    }

    /// Close the underlying data device; the stream ends shortly after
    pub fn close(&self) {
        self.device.data_close();
    }

    pub fn device(&self) -> &Arc<DataDevice> {
        &self.device
    }
}

fn poll_loop(device: Arc<DataDevice>, tx: mpsc::Sender<StreamItem>) {
    debug!("poll thread started");
    loop {
        let item = device.poll();
        let last = match &item {
            Ok(PollOutcome::Woken) if !device.is_open() => break,
            Ok(_) => false,
            Err(_) => true,
        };
        if tx.blocking_send(item).is_err() || last {
            break;
        }
    }
    debug!("poll thread exiting");
}

impl Stream for EventStream {
    type Item = StreamItem;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.device.data_close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use gesture_transport::ChannelOwner;
    use gesture_transport::{GestureEvent, GestureHandle, GestureVector};
    use std::time::Duration;

    #[tokio::test]
    async fn test_stream_yields_events_then_ends() {
        let owner = ChannelOwner::create(8);
        let device = Arc::new(DataDevice::new());
        device.data_open(&owner.handle()).unwrap();
        let mut stream = EventStream::spawn(Arc::clone(&device), 4);

        let ev = GestureEvent::new(GestureHandle::new(1), GestureVector::new([1.0, 2.0, 3.0], 1), 9);
        owner.push(ev).unwrap();
        let first = tokio::time::timeout(Duration::from_secs(2), stream.next())
            .await
            .unwrap();
        assert_eq!(first.unwrap().unwrap(), PollOutcome::Event(ev));

        stream.close();
        let end = tokio::time::timeout(Duration::from_secs(2), stream.next())
            .await
            .unwrap();
        assert!(end.is_none());
    }

    #[tokio::test]
    async fn test_stream_reports_teardown() {
        let owner = ChannelOwner::create(8);
        let device = Arc::new(DataDevice::new());
        device.data_open(&owner.handle()).unwrap();
        let mut stream = EventStream::spawn(device, 4);

        owner.close();
        let item = tokio::time::timeout(Duration::from_secs(2), stream.next())
            .await
            .unwrap();
        assert!(matches!(item, Some(Err(HalError::Channel(_)))));
        let end = tokio::time::timeout(Duration::from_secs(2), stream.next())
            .await
            .unwrap();
        assert!(end.is_none());
    }
}
