//! Item status state machine.

use serde::{Deserialize, Serialize};

/// Status of a queue item.
///
/// State transitions:
/// - Pending -> Processing -> Completed
/// - Pending -> Processing -> Failed -> Retrying -> Pending (bounded by the retry limit)
/// - Pending -> Processing -> Failed (retries exhausted)
/// - Pending -> Cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    /// Waiting for the dispatch slot.
    Pending,

    /// Handed to the processor; owns the dispatch slot.
    Processing,

    /// Processor reported success.
    Completed,

    /// Last attempt failed or timed out.
    Failed,

    /// Cancelled before it started.
    Cancelled,

    /// Failed, waiting for the retry delay to elapse.
    Retrying,
}

impl ItemStatus {
    /// Items in these states are removed from the store.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ItemStatus::Completed | ItemStatus::Failed | ItemStatus::Cancelled
        )
    }

    /// Can the scheduler hand this item to the processor?
    pub fn is_dispatchable(self) -> bool {
        matches!(self, ItemStatus::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pending_is_dispatchable() {
        assert!(ItemStatus::Pending.is_dispatchable());
        assert!(!ItemStatus::Retrying.is_dispatchable());
        assert!(!ItemStatus::Processing.is_dispatchable());
    }

    #[test]
    fn retrying_is_not_terminal() {
        assert!(!ItemStatus::Retrying.is_terminal());
        assert!(ItemStatus::Cancelled.is_terminal());
        assert!(ItemStatus::Completed.is_terminal());
    }
}
