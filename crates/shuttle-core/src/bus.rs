//! Event bus for queue lifecycle events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`]. The scheduler
//! publishes while it holds the queue's state lock, so all receivers observe
//! one global order.
//!
//! - `publish()` never blocks; with no receivers the event is dropped.
//! - A receiver only sees events sent after it subscribed.
//! - Receivers that fall more than `capacity` events behind observe
//!   `RecvError::Lagged(n)` and skip the `n` oldest events.

use tokio::sync::broadcast;

use crate::domain::QueueEvent;

#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<QueueEvent>,
}

impl Bus {
    /// Creates a bus with the given ring capacity (clamped to at least 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn publish(&self, ev: QueueEvent) {
        let _ = self.tx.send(ev);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
