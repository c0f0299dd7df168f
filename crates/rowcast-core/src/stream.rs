//! Event channel plumbing shared by the per-source handlers

use crate::ChangeEvent;
use futures::Stream;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Capacity of every per-source event channel. A slow downstream reader
/// backpressures the replication loop through the bounded send; this constant
/// is the only flow-control knob.
pub const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Receiving half of a per-source event channel.
///
/// Cloneable: clones consume from the same underlying channel, so concurrent
/// readers compete for events rather than each observing the full stream.
#[derive(Clone)]
pub struct EventReceiver {
    inner: Arc<Mutex<mpsc::Receiver<ChangeEvent>>>,
}

impl EventReceiver {
    /// Create a bounded event channel with [`EVENT_CHANNEL_CAPACITY`] slots.
    pub fn channel() -> (mpsc::Sender<ChangeEvent>, EventReceiver) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        (
            tx,
            EventReceiver {
                inner: Arc::new(Mutex::new(rx)),
            },
        )
    }

    /// Receive the next event; `None` once every sender is gone and the
    /// channel is drained.
    pub async fn recv(&self) -> Option<ChangeEvent> {
        self.inner.lock().await.recv().await
    }

    /// Non-blocking receive. `None` when the channel is currently empty,
    /// closed, or another clone holds the receiver.
    pub fn try_recv(&self) -> Option<ChangeEvent> {
        self.inner.try_lock().ok()?.try_recv().ok()
    }

    /// Adapt this receiver into a [`Stream`] of events.
    pub fn into_stream(self) -> impl Stream<Item = ChangeEvent> {
        futures::stream::unfold(self, |rx| async move {
            let event = rx.recv().await?;
            Some((event, rx))
        })
    }
}

impl fmt::Debug for EventReceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventReceiver").finish_non_exhaustive()
    }
}
