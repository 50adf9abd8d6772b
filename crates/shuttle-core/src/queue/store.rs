//! Item store: the priority-ordered collection of live items.
//!
//! Design:
//! - A `Vec` kept in dispatch order; the head is the next candidate.
//! - Insertion is stable: a new item goes before the first item of strictly
//!   lower priority, so equal priorities stay FIFO.
//! - Parent links are kept in sync with insertion and removal, so a parent's
//!   `child_ids` always lists exactly its children still in the store.

use crate::domain::{ItemId, QueueItem};

#[derive(Debug, Default)]
pub(crate) struct ItemStore {
    items: Vec<QueueItem>,
}

impl ItemStore {
    pub(crate) fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn items(&self) -> &[QueueItem] {
        &self.items
    }

    pub(crate) fn head(&self) -> Option<&QueueItem> {
        self.items.first()
    }

    pub(crate) fn contains(&self, id: ItemId) -> bool {
        self.items.iter().any(|i| i.id == id)
    }

    pub(crate) fn get(&self, id: ItemId) -> Option<&QueueItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: ItemId) -> Option<&mut QueueItem> {
        self.items.iter_mut().find(|i| i.id == id)
    }

    /// Does any stored item name `id` as its parent?
    pub(crate) fn has_children_of(&self, id: ItemId) -> bool {
        self.items.iter().any(|i| i.parent_id == Some(id))
    }

    /// Insert in priority order and link into the parent's `child_ids`.
    /// Returns the insertion index.
    pub(crate) fn insert(&mut self, item: QueueItem) -> usize {
        if let Some(parent_id) = item.parent_id
            && let Some(parent) = self.get_mut(parent_id)
        {
            parent.child_ids.push(item.id);
        }

        let index = self
            .items
            .iter()
            .position(|existing| existing.priority < item.priority)
            .unwrap_or(self.items.len());
        self.items.insert(index, item);
        index
    }

    /// Remove an item and unlink it from its parent.
    pub(crate) fn remove(&mut self, id: ItemId) -> Option<QueueItem> {
        let index = self.items.iter().position(|i| i.id == id)?;
        let item = self.items.remove(index);
        if let Some(parent_id) = item.parent_id
            && let Some(parent) = self.get_mut(parent_id)
        {
            parent.child_ids.retain(|c| *c != id);
        }
        Some(item)
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Priority;
    use chrono::Utc;
    use ulid::Ulid;

    fn item(priority: Priority, parent: Option<ItemId>) -> QueueItem {
        QueueItem::new(
            ItemId::from_ulid(Ulid::new()),
            serde_json::json!({}),
            priority,
            parent,
            Utc::now(),
        )
    }

    #[test]
    fn insertion_is_a_stable_priority_sort() {
        let mut store = ItemStore::new();
        let low = item(Priority::Low, None);
        let normal1 = item(Priority::Normal, None);
        let critical = item(Priority::Critical, None);
        let normal2 = item(Priority::Normal, None);
        let high = item(Priority::High, None);
        let ids = [low.id, normal1.id, critical.id, normal2.id, high.id];
        for it in [low, normal1, critical, normal2, high] {
            store.insert(it);
        }

        let order: Vec<ItemId> = store.items().iter().map(|i| i.id).collect();
        assert_eq!(order, vec![ids[2], ids[4], ids[1], ids[3], ids[0]]);
        assert_eq!(store.head().map(|i| i.id), Some(ids[2]));
    }

    #[test]
    fn child_links_follow_insert_and_remove() {
        let mut store = ItemStore::new();
        let parent = item(Priority::Normal, None);
        let pid = parent.id;
        store.insert(parent);

        let child_a = item(Priority::Normal, Some(pid));
        let child_b = item(Priority::Low, Some(pid));
        let (a, b) = (child_a.id, child_b.id);
        store.insert(child_a);
        store.insert(child_b);

        assert_eq!(store.get(pid).unwrap().child_ids, vec![a, b]);
        assert!(store.has_children_of(pid));

        store.remove(a);
        assert_eq!(store.get(pid).unwrap().child_ids, vec![b]);
        store.remove(b);
        assert!(store.get(pid).unwrap().child_ids.is_empty());
        assert!(!store.has_children_of(pid));
    }

    #[test]
    fn child_of_absent_parent_is_stored_unlinked() {
        let mut store = ItemStore::new();
        let orphan = item(Priority::High, Some(ItemId::from_ulid(Ulid::new())));
        let id = orphan.id;
        assert_eq!(store.insert(orphan), 0);
        assert!(store.contains(id));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn remove_missing_is_none() {
        let mut store = ItemStore::new();
        assert!(store.remove(ItemId::from_ulid(Ulid::new())).is_none());
        assert!(store.is_empty());
    }
}
