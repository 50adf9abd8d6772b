//! Active dependency chain.
//!
//! The chain lists items of a parent/child lineage that have started
//! processing, in join order. A member stays in the chain after it leaves the
//! store for as long as something still depends on it:
//! - a store item names it as parent, or
//! - another chain member names it as parent.
//!
//! Each link remembers its parent so lineage walks keep working after the
//! member itself has been removed from the store.

use super::store::ItemStore;
use crate::domain::ItemId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ChainLink {
    id: ItemId,
    parent: Option<ItemId>,
}

#[derive(Debug, Default)]
pub(crate) struct Chain {
    links: Vec<ChainLink>,
}

impl Chain {
    pub(crate) fn new() -> Self {
        Self { links: Vec::new() }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub(crate) fn contains(&self, id: ItemId) -> bool {
        self.links.iter().any(|l| l.id == id)
    }

    pub(crate) fn ids(&self) -> Vec<ItemId> {
        self.links.iter().map(|l| l.id).collect()
    }

    /// Parent of a chain member: `None` if `id` is not in the chain,
    /// `Some(None)` for a root member.
    pub(crate) fn parent_of(&self, id: ItemId) -> Option<Option<ItemId>> {
        self.links.iter().find(|l| l.id == id).map(|l| l.parent)
    }

    /// Append `id` unless already present. Returns true when this join
    /// started a new chain (the chain was empty before).
    pub(crate) fn join(&mut self, id: ItemId, parent: Option<ItemId>) -> bool {
        if self.contains(id) {
            return false;
        }
        let started = self.links.is_empty();
        self.links.push(ChainLink { id, parent });
        started
    }

    /// Drop every member that has left the store and has no remaining
    /// dependents. Repeats until stable so settled ancestors unwind with
    /// their last descendant. Returns the number of members removed.
    pub(crate) fn prune(&mut self, store: &ItemStore) -> usize {
        let mut removed = 0;
        loop {
            let retired = self.links.iter().position(|link| {
                !store.contains(link.id)
                    && !store.has_children_of(link.id)
                    && !self.links.iter().any(|other| other.parent == Some(link.id))
            });
            match retired {
                Some(index) => {
                    self.links.remove(index);
                    removed += 1;
                }
                None => return removed,
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        self.links.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Priority, QueueItem};
    use chrono::Utc;
    use ulid::Ulid;

    fn id() -> ItemId {
        ItemId::from_ulid(Ulid::new())
    }

    fn stored(store: &mut ItemStore, id: ItemId, parent: Option<ItemId>) {
        store.insert(QueueItem::new(
            id,
            serde_json::json!({}),
            Priority::Normal,
            parent,
            Utc::now(),
        ));
    }

    #[test]
    fn first_join_starts_the_chain() {
        let mut chain = Chain::new();
        let (p, c) = (id(), id());
        assert!(chain.join(p, None));
        assert!(!chain.join(c, Some(p)));
        assert!(!chain.join(p, None));
        assert_eq!(chain.ids(), vec![p, c]);
        assert_eq!(chain.parent_of(c), Some(Some(p)));
        assert_eq!(chain.parent_of(p), Some(None));
        assert_eq!(chain.parent_of(id()), None);
    }

    #[test]
    fn settled_parent_waits_for_its_pending_child() {
        let mut store = ItemStore::new();
        let mut chain = Chain::new();
        let (p, c) = (id(), id());
        chain.join(p, None);
        stored(&mut store, c, Some(p));

        // p has left the store but c still depends on it.
        assert_eq!(chain.prune(&store), 0);
        assert!(chain.contains(p));

        store.remove(c);
        assert_eq!(chain.prune(&store), 1);
        assert!(chain.is_empty());
    }

    #[test]
    fn ancestors_unwind_with_last_descendant() {
        let store = ItemStore::new();
        let mut chain = Chain::new();
        let (a, b, c) = (id(), id(), id());
        chain.join(a, None);
        chain.join(b, Some(a));
        chain.join(c, Some(b));

        assert_eq!(chain.prune(&store), 3);
        assert!(chain.is_empty());
    }

    #[test]
    fn member_still_in_store_is_kept() {
        let mut store = ItemStore::new();
        let mut chain = Chain::new();
        let p = id();
        stored(&mut store, p, None);
        chain.join(p, None);
        assert_eq!(chain.prune(&store), 0);
        chain.clear();
        assert!(chain.is_empty());
    }
}
