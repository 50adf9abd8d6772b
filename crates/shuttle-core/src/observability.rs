//! Status views and an event logger for queue operators.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::{ItemStatus, QueueEvent, QueueState};

/// Items in the queue by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub pending: usize,
    pub processing: usize,
    pub retrying: usize,
}

impl QueueCounts {
    pub fn from_state(state: &QueueState) -> Self {
        let mut counts = Self::default();
        for item in &state.items {
            match item.status {
                ItemStatus::Pending => counts.pending += 1,
                ItemStatus::Processing => counts.processing += 1,
                ItemStatus::Retrying => counts.retrying += 1,
                // Settled items leave the store as they settle.
                ItemStatus::Completed | ItemStatus::Failed | ItemStatus::Cancelled => {}
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.pending + self.processing + self.retrying
    }
}

/// Log every event from `rx` until the bus closes.
///
/// Item events go out at `info`/`warn`; snapshots at `debug`.
pub fn spawn_event_log(mut rx: broadcast::Receiver<QueueEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event log fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn log_event(event: &QueueEvent) {
    let kind = event.kind();
    match event {
        QueueEvent::StateChanged(state) => {
            let counts = QueueCounts::from_state(state);
            debug!(
                event = %kind,
                pending = counts.pending,
                processing = counts.processing,
                retrying = counts.retrying,
                chain = state.processing_chain.len(),
                "queue state"
            );
        }
        QueueEvent::QueueEmpty => info!(event = %kind, "queue empty"),
        QueueEvent::ProcessingFailed(item) => warn!(
            event = %kind,
            item = %item.id,
            error = item.error.as_deref().unwrap_or(""),
            retries = item.retry_count,
            "item failed"
        ),
        _ => {
            if let Some(item) = event.item() {
                info!(
                    event = %kind,
                    item = %item.id,
                    priority = %item.priority,
                    status = ?item.status,
                    "item event"
                );
            }
        }
    }
}
