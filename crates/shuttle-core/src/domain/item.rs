//! Queue item: caller payload plus scheduling metadata.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::{ItemId, ItemStatus, Priority};

/// One instruction in the queue.
///
/// The scheduler owns all status, timestamp and retry transitions; the store
/// only maintains `child_ids`. The payload and response are opaque JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: ItemId,

    /// Instruction data handed to the processor.
    pub payload: serde_json::Value,

    /// Result payload, set only on successful completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<serde_json::Value>,

    pub priority: Priority,
    pub status: ItemStatus,

    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,

    /// Last failure description; cleared when a retry restarts the item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Completed retry attempts so far.
    pub retry_count: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ItemId>,

    /// Items currently in the store that name this item as parent.
    #[serde(default)]
    pub child_ids: Vec<ItemId>,
}

impl QueueItem {
    pub fn new(
        id: ItemId,
        payload: serde_json::Value,
        priority: Priority,
        parent_id: Option<ItemId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            payload,
            response: None,
            priority,
            status: ItemStatus::Pending,
            created_at: now,
            started_at: None,
            ended_at: None,
            error: None,
            retry_count: 0,
            parent_id,
            child_ids: Vec::new(),
        }
    }

    pub fn start(&mut self, now: DateTime<Utc>) {
        self.status = ItemStatus::Processing;
        self.started_at = Some(now);
    }

    pub fn mark_completed(&mut self, response: Option<serde_json::Value>, now: DateTime<Utc>) {
        self.status = ItemStatus::Completed;
        self.ended_at = Some(now);
        self.response = response;
    }

    pub fn mark_failed(&mut self, error: String, now: DateTime<Utc>) {
        self.status = ItemStatus::Failed;
        self.ended_at = Some(now);
        self.error = Some(error);
    }

    pub fn mark_cancelled(&mut self, now: DateTime<Utc>) {
        self.status = ItemStatus::Cancelled;
        self.ended_at = Some(now);
    }

    /// Failed -> Retrying, consuming one retry attempt.
    pub fn schedule_retry(&mut self) {
        self.retry_count += 1;
        self.status = ItemStatus::Retrying;
    }

    /// Retrying -> Pending with the previous attempt's traces wiped.
    pub fn requeue(&mut self) {
        self.status = ItemStatus::Pending;
        self.started_at = None;
        self.ended_at = None;
        self.error = None;
    }

    /// Wall time between start and end of the latest attempt.
    pub fn processing_time(&self) -> Option<TimeDelta> {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ulid::Ulid;

    fn item() -> QueueItem {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        QueueItem::new(
            ItemId::from_ulid(Ulid::new()),
            serde_json::json!({"type": "say"}),
            Priority::Normal,
            None,
            now,
        )
    }

    #[test]
    fn new_item_is_pending_without_history() {
        let it = item();
        assert_eq!(it.status, ItemStatus::Pending);
        assert_eq!(it.retry_count, 0);
        assert!(it.child_ids.is_empty());
        assert!(it.processing_time().is_none());
    }

    #[test]
    fn retry_cycle_resets_attempt_traces() {
        let mut it = item();
        let t0 = it.created_at;
        it.start(t0);
        it.mark_failed("boom".into(), t0 + TimeDelta::milliseconds(5));
        assert_eq!(it.processing_time(), Some(TimeDelta::milliseconds(5)));

        it.schedule_retry();
        assert_eq!(it.status, ItemStatus::Retrying);
        assert_eq!(it.retry_count, 1);
        assert_eq!(it.error.as_deref(), Some("boom"));

        it.requeue();
        assert_eq!(it.status, ItemStatus::Pending);
        assert!(it.started_at.is_none());
        assert!(it.ended_at.is_none());
        assert!(it.error.is_none());
        assert_eq!(it.retry_count, 1);
    }

    #[test]
    fn completion_stores_response() {
        let mut it = item();
        let t0 = it.created_at;
        it.start(t0);
        it.mark_completed(Some(serde_json::json!({"ok": true})), t0);
        assert_eq!(it.status, ItemStatus::Completed);
        assert_eq!(it.response, Some(serde_json::json!({"ok": true})));
    }
}
