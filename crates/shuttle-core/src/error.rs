use thiserror::Error;

use crate::domain::{ItemId, Priority};

/// Synchronous rejection of an `enqueue` call. Nothing is inserted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("queue has reached maximum size of {max}")]
    CapacityExceeded { max: usize },

    #[error("parent {0} is neither queued nor part of the active chain")]
    UnknownParent(ItemId),

    #[error("adding a child under {parent} would exceed the maximum chain length of {max}")]
    ChainTooLong { parent: ItemId, max: usize },

    #[error("child priority {child_priority} outranks waiting parent {parent} ({parent_priority})")]
    PriorityInversion {
        parent: ItemId,
        parent_priority: Priority,
        child_priority: Priority,
    },
}
