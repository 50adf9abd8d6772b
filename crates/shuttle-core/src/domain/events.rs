//! Lifecycle events published on the queue's bus.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{QueueItem, QueueState};

/// A lifecycle transition. Item events carry a copy of the item as it was
/// at emission time; `StateChanged` carries a full snapshot.
///
/// Subscribers see events in emission order: the item event for a
/// transition always precedes the `StateChanged` that reflects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueEvent {
    ItemQueued(QueueItem),
    ItemCancelled(QueueItem),
    ProcessingStarted(QueueItem),
    ProcessingCompleted(QueueItem),
    ProcessingFailed(QueueItem),
    RetryScheduled(QueueItem),
    RetryStarted(QueueItem),
    ChainStarted(QueueItem),
    ChainCompleted(QueueItem),
    QueueEmpty,
    StateChanged(Box<QueueState>),
}

/// Payload-free classification of [`QueueEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ItemQueued,
    ItemCancelled,
    ProcessingStarted,
    ProcessingCompleted,
    ProcessingFailed,
    RetryScheduled,
    RetryStarted,
    ChainStarted,
    ChainCompleted,
    QueueEmpty,
    StateChanged,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::ItemQueued => "ITEM_QUEUED",
            EventKind::ItemCancelled => "ITEM_CANCELLED",
            EventKind::ProcessingStarted => "PROCESSING_STARTED",
            EventKind::ProcessingCompleted => "PROCESSING_COMPLETED",
            EventKind::ProcessingFailed => "PROCESSING_FAILED",
            EventKind::RetryScheduled => "RETRY_SCHEDULED",
            EventKind::RetryStarted => "RETRY_STARTED",
            EventKind::ChainStarted => "CHAIN_STARTED",
            EventKind::ChainCompleted => "CHAIN_COMPLETED",
            EventKind::QueueEmpty => "QUEUE_EMPTY",
            EventKind::StateChanged => "STATE_CHANGED",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl QueueEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            QueueEvent::ItemQueued(_) => EventKind::ItemQueued,
            QueueEvent::ItemCancelled(_) => EventKind::ItemCancelled,
            QueueEvent::ProcessingStarted(_) => EventKind::ProcessingStarted,
            QueueEvent::ProcessingCompleted(_) => EventKind::ProcessingCompleted,
            QueueEvent::ProcessingFailed(_) => EventKind::ProcessingFailed,
            QueueEvent::RetryScheduled(_) => EventKind::RetryScheduled,
            QueueEvent::RetryStarted(_) => EventKind::RetryStarted,
            QueueEvent::ChainStarted(_) => EventKind::ChainStarted,
            QueueEvent::ChainCompleted(_) => EventKind::ChainCompleted,
            QueueEvent::QueueEmpty => EventKind::QueueEmpty,
            QueueEvent::StateChanged(_) => EventKind::StateChanged,
        }
    }

    /// The item this event is about, if any.
    pub fn item(&self) -> Option<&QueueItem> {
        match self {
            QueueEvent::ItemQueued(item)
            | QueueEvent::ItemCancelled(item)
            | QueueEvent::ProcessingStarted(item)
            | QueueEvent::ProcessingCompleted(item)
            | QueueEvent::ProcessingFailed(item)
            | QueueEvent::RetryScheduled(item)
            | QueueEvent::RetryStarted(item)
            | QueueEvent::ChainStarted(item)
            | QueueEvent::ChainCompleted(item) => Some(item),
            QueueEvent::QueueEmpty | QueueEvent::StateChanged(_) => None,
        }
    }
}
