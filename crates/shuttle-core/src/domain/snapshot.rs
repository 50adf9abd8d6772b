use serde::{Deserialize, Serialize};

use super::{ItemId, QueueItem, QueueStats};

/// Read-only copy of the queue, detached from later mutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueState {
    /// Items in dispatch order (priority, then arrival).
    pub items: Vec<QueueItem>,
    pub is_processing: bool,
    pub current_item_id: Option<ItemId>,
    pub last_processed_id: Option<ItemId>,
    /// Ids forming the active dependency chain, in join order.
    pub processing_chain: Vec<ItemId>,
    pub stats: QueueStats,
}

impl QueueState {
    pub fn item(&self, id: ItemId) -> Option<&QueueItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|i| i.id).collect()
    }
}
