//! One-shot timers and the signal channel feeding the driver task.
//!
//! Processor outcomes, expired deadlines and due retries all arrive as a
//! [`Signal`] on one unbounded channel, so they are applied one at a time
//! under the state lock no matter which thread produced them.
//!
//! Timers are tokio tasks; their `AbortHandle`s are kept so a stale deadline
//! can be cancelled explicitly once the outcome is in.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::domain::{ItemId, Outcome};

#[derive(Debug)]
pub(crate) enum Signal {
    /// The processor reported for dispatch `token`.
    Outcome {
        item_id: ItemId,
        token: u64,
        outcome: Outcome,
    },

    /// The deadline of dispatch `token` elapsed.
    DeadlineElapsed { item_id: ItemId, token: u64 },

    /// The retry delay of `item_id` elapsed.
    RetryDue { item_id: ItemId },
}

pub(crate) struct Timers {
    signals: mpsc::UnboundedSender<Signal>,
    deadline: Option<AbortHandle>,
    retries: HashMap<ItemId, AbortHandle>,
}

impl Timers {
    pub(crate) fn new(signals: mpsc::UnboundedSender<Signal>) -> Self {
        Self {
            signals,
            deadline: None,
            retries: HashMap::new(),
        }
    }

    pub(crate) fn sender(&self) -> mpsc::UnboundedSender<Signal> {
        self.signals.clone()
    }

    /// Arm the deadline for the active dispatch, replacing any previous one.
    pub(crate) fn arm_deadline(&mut self, item_id: ItemId, token: u64, after: Duration) {
        self.disarm_deadline();
        let handle = self.spawn_after(after, Signal::DeadlineElapsed { item_id, token });
        self.deadline = Some(handle);
    }

    pub(crate) fn disarm_deadline(&mut self) {
        if let Some(handle) = self.deadline.take() {
            handle.abort();
        }
    }

    pub(crate) fn schedule_retry(&mut self, item_id: ItemId, after: Duration) {
        let handle = self.spawn_after(after, Signal::RetryDue { item_id });
        if let Some(previous) = self.retries.insert(item_id, handle) {
            previous.abort();
        }
    }

    /// Forget the handle of a retry timer that has fired.
    pub(crate) fn retry_fired(&mut self, item_id: ItemId) {
        self.retries.remove(&item_id);
    }

    pub(crate) fn pending_retries(&self) -> usize {
        self.retries.len()
    }

    pub(crate) fn cancel_all(&mut self) {
        self.disarm_deadline();
        for (_, handle) in self.retries.drain() {
            handle.abort();
        }
    }

    fn spawn_after(&self, after: Duration, signal: Signal) -> AbortHandle {
        let signals = self.signals.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = signals.send(signal);
        })
        .abort_handle()
    }
}

impl Drop for Timers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    fn id() -> ItemId {
        ItemId::from_ulid(Ulid::new())
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_fires_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = Timers::new(tx);
        let item = id();
        timers.arm_deadline(item, 7, Duration::from_millis(100));

        tokio::time::sleep(Duration::from_millis(99)).await;
        assert!(rx.try_recv().is_err());
        tokio::time::sleep(Duration::from_millis(2)).await;
        match rx.try_recv() {
            Ok(Signal::DeadlineElapsed { item_id, token }) => {
                assert_eq!(item_id, item);
                assert_eq!(token, 7);
            }
            other => panic!("expected deadline signal, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn disarmed_deadline_never_fires() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = Timers::new(tx);
        timers.arm_deadline(id(), 1, Duration::from_millis(50));
        timers.disarm_deadline();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_all_stops_pending_retries() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = Timers::new(tx);
        timers.schedule_retry(id(), Duration::from_millis(10));
        timers.schedule_retry(id(), Duration::from_millis(20));
        assert_eq!(timers.pending_retries(), 2);

        timers.cancel_all();
        assert_eq!(timers.pending_retries(), 0);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(rx.try_recv().is_err());
    }
}
