//! Scheduler: the single-slot state machine behind [`InstructionQueue`].
//!
//! Every method runs under the queue's state lock. Events are published
//! before the lock is released, so their order on the bus is the order of
//! the transitions. The processor is never called from here: a dispatch is
//! parked in `dispatch` and the handle runs it once the lock is dropped.
//!
//! [`InstructionQueue`]: super::InstructionQueue

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use super::chain::Chain;
use super::retry::RetryPolicy;
use super::store::ItemStore;
use super::timers::{Signal, Timers};
use crate::bus::Bus;
use crate::config::QueueConfig;
use crate::domain::{
    ItemId, ItemStatus, Priority, ProcessingError, QueueEvent, QueueItem, QueueState, QueueStats,
};
use crate::error::QueueError;
use crate::ports::{Clock, IdGenerator};

/// The item that owns the dispatch slot. `token` tells this dispatch apart
/// from earlier attempts of the same item.
#[derive(Debug, Clone, Copy)]
struct ActiveSlot {
    item_id: ItemId,
    token: u64,
}

/// A dispatch waiting to be handed to the processor.
pub(crate) struct Dispatch {
    pub(crate) item_id: ItemId,
    pub(crate) token: u64,
    pub(crate) payload: serde_json::Value,
    pub(crate) signals: mpsc::UnboundedSender<Signal>,
}

pub(crate) struct Scheduler {
    config: QueueConfig,
    retry: RetryPolicy,
    store: ItemStore,
    chain: Chain,
    stats: QueueStats,
    timers: Timers,
    bus: Bus,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    active: Option<ActiveSlot>,
    last_processed: Option<ItemId>,
    next_token: u64,
    dispatch: Option<Dispatch>,
}

impl Scheduler {
    pub(crate) fn new(
        config: QueueConfig,
        bus: Bus,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        signals: mpsc::UnboundedSender<Signal>,
    ) -> Self {
        Self {
            retry: RetryPolicy::from_config(&config),
            config,
            store: ItemStore::new(),
            chain: Chain::new(),
            stats: QueueStats::default(),
            timers: Timers::new(signals),
            bus,
            clock,
            ids,
            active: None,
            last_processed: None,
            next_token: 0,
            dispatch: None,
        }
    }

    pub(crate) fn enqueue(
        &mut self,
        payload: serde_json::Value,
        priority: Priority,
        parent_id: Option<ItemId>,
    ) -> Result<QueueItem, QueueError> {
        if self.store.len() >= self.config.max_size {
            warn!(max = self.config.max_size, "enqueue rejected: queue is full");
            return Err(QueueError::CapacityExceeded {
                max: self.config.max_size,
            });
        }
        if let Some(parent) = parent_id {
            self.check_parent(parent, priority)?;
        }

        let id = self.allocate_id();
        let item = QueueItem::new(id, payload, priority, parent_id, self.clock.now());
        let index = self.store.insert(item.clone());
        debug!(item = %id, %priority, index, parent = ?parent_id, "item queued");
        self.emit(QueueEvent::ItemQueued(item.clone()));

        // The active item had no children when it started; it joins now so
        // the new child can become eligible once it settles.
        if let Some(parent) = parent_id
            && self.active_id() == Some(parent)
            && !self.chain.contains(parent)
        {
            let grandparent = self.store.get(parent).and_then(|p| p.parent_id);
            self.join_chain(parent, grandparent);
        }

        self.emit_state_changed();
        self.process_next();
        Ok(item)
    }

    /// Cancel a pending item and, first, all of its pending descendants.
    pub(crate) fn cancel(&mut self, id: ItemId) -> bool {
        let cancelled = self.cancel_tree(id);
        if cancelled {
            self.process_next();
        }
        cancelled
    }

    pub(crate) fn clear(&mut self) {
        let dropped = self.store.len();
        let retries = self.timers.pending_retries();
        self.store.clear();
        self.chain.clear();
        self.timers.cancel_all();
        self.active = None;
        self.dispatch = None;
        info!(dropped, retries, "queue cleared");
        self.emit(QueueEvent::QueueEmpty);
        self.emit_state_changed();
    }

    pub(crate) fn snapshot(&self) -> QueueState {
        QueueState {
            items: self.store.items().to_vec(),
            is_processing: self.active.is_some(),
            current_item_id: self.active_id(),
            last_processed_id: self.last_processed,
            processing_chain: self.chain.ids(),
            stats: self.stats.clone(),
        }
    }

    pub(crate) fn take_dispatch(&mut self) -> Option<Dispatch> {
        self.dispatch.take()
    }

    pub(crate) fn on_signal(&mut self, signal: Signal) {
        match signal {
            Signal::Outcome {
                item_id,
                token,
                outcome,
            } => {
                if !self.is_current(token) {
                    debug!(item = %item_id, token, "ignoring outcome of a stale dispatch");
                    return;
                }
                match outcome {
                    Ok(response) => self.complete(response),
                    Err(error) => self.fail(error),
                }
            }
            Signal::DeadlineElapsed { item_id, token } => {
                if !self.is_current(token) {
                    return;
                }
                warn!(
                    item = %item_id,
                    timeout_ms = self.config.processing_timeout_ms,
                    "processing deadline exceeded"
                );
                self.fail(ProcessingError::Timeout);
            }
            Signal::RetryDue { item_id } => self.start_retry(item_id),
        }
    }

    /// Dispatch the head of the store if the slot is free and the head is
    /// eligible. An ineligible head blocks; nothing behind it is skipped ahead.
    pub(crate) fn process_next(&mut self) {
        if self.active.is_some() {
            return;
        }
        let Some(head) = self.store.head() else {
            return;
        };
        if !head.status.is_dispatchable() {
            trace!(item = %head.id, status = ?head.status, "head is not dispatchable");
            return;
        }
        if let Some(parent) = head.parent_id
            && !self.parent_released(parent)
        {
            trace!(item = %head.id, %parent, "head is waiting for its parent");
            return;
        }

        let id = head.id;
        let parent_id = head.parent_id;
        let has_children = !head.child_ids.is_empty();
        let now = self.clock.now();
        let Some(item) = self.store.get_mut(id) else {
            return;
        };
        item.start(now);
        let item = item.clone();

        self.next_token += 1;
        let token = self.next_token;
        self.active = Some(ActiveSlot { item_id: id, token });

        if parent_id.is_some() || has_children {
            self.join_chain(id, parent_id);
        }

        debug!(item = %id, attempt = item.retry_count + 1, "processing started");
        self.emit(QueueEvent::ProcessingStarted(item.clone()));
        self.emit_state_changed();

        self.timers
            .arm_deadline(id, token, self.config.processing_timeout());
        self.dispatch = Some(Dispatch {
            item_id: id,
            token,
            payload: item.payload,
            signals: self.timers.sender(),
        });
    }

    fn complete(&mut self, response: Option<serde_json::Value>) {
        let Some(slot) = self.active.take() else {
            return;
        };
        self.timers.disarm_deadline();
        let now = self.clock.now();
        let Some(mut item) = self.store.remove(slot.item_id) else {
            return;
        };
        item.mark_completed(response, now);
        self.last_processed = Some(item.id);
        self.stats.record(&item);
        debug!(item = %item.id, retries = item.retry_count, "processing completed");

        self.leave_chain(&item);
        self.emit(QueueEvent::ProcessingCompleted(item));
        self.emit_state_changed();
        self.after_settle();
    }

    fn fail(&mut self, error: ProcessingError) {
        let Some(slot) = self.active.take() else {
            return;
        };
        self.timers.disarm_deadline();
        let now = self.clock.now();
        let Some(item) = self.store.get_mut(slot.item_id) else {
            return;
        };
        item.mark_failed(error.to_string(), now);
        let will_retry = self.retry.should_retry(item.retry_count);
        let failed = item.clone();

        // Counters move only when the item settles for good.
        if !will_retry {
            self.stats.record(&failed);
        }
        warn!(
            item = %failed.id,
            %error,
            retries = failed.retry_count,
            will_retry,
            "processing failed"
        );
        self.emit(QueueEvent::ProcessingFailed(failed.clone()));
        self.emit_state_changed();

        // Dependents of a failed parent never run.
        for child in failed.child_ids.iter().copied() {
            self.cancel_tree(child);
        }

        if will_retry {
            let Some(item) = self.store.get_mut(failed.id) else {
                return;
            };
            item.schedule_retry();
            let retry = item.retry_count;
            let scheduled = item.clone();
            let delay = self.retry.next_delay(retry);
            info!(
                item = %failed.id,
                retry,
                delay_ms = delay.as_millis() as u64,
                "retry scheduled"
            );
            self.emit(QueueEvent::RetryScheduled(scheduled));
            self.emit_state_changed();
            self.timers.schedule_retry(failed.id, delay);
            self.process_next();
        } else {
            let Some(item) = self.store.remove(failed.id) else {
                return;
            };
            self.leave_chain(&item);
            self.after_settle();
        }
    }

    fn start_retry(&mut self, id: ItemId) {
        self.timers.retry_fired(id);
        let Some(item) = self.store.get_mut(id) else {
            return;
        };
        if item.status != ItemStatus::Retrying {
            return;
        }
        item.requeue();
        let item = item.clone();
        debug!(item = %id, retry = item.retry_count, "retry started");
        self.emit(QueueEvent::RetryStarted(item));
        self.emit_state_changed();
        self.process_next();
    }

    fn cancel_tree(&mut self, id: ItemId) -> bool {
        let children = match self.store.get(id) {
            Some(item) if item.status == ItemStatus::Pending => item.child_ids.clone(),
            _ => return false,
        };
        for child in children {
            self.cancel_tree(child);
        }

        let Some(mut item) = self.store.remove(id) else {
            return false;
        };
        item.mark_cancelled(self.clock.now());
        debug!(item = %id, "item cancelled");
        self.emit(QueueEvent::ItemCancelled(item.clone()));
        self.leave_chain(&item);
        self.emit_state_changed();
        true
    }

    fn after_settle(&mut self) {
        if self.store.is_empty() {
            info!(
                processed = self.stats.total_processed,
                failed = self.stats.total_failed,
                "queue drained"
            );
            self.emit(QueueEvent::QueueEmpty);
        } else {
            self.process_next();
        }
    }

    fn join_chain(&mut self, id: ItemId, parent: Option<ItemId>) {
        if self.chain.join(id, parent)
            && let Some(item) = self.store.get(id)
        {
            info!(item = %id, "chain started");
            let item = item.clone();
            self.emit(QueueEvent::ChainStarted(item));
        }
    }

    /// Prune settled members; report completion if that emptied the chain.
    fn leave_chain(&mut self, settled: &QueueItem) {
        if self.chain.prune(&self.store) > 0 && self.chain.is_empty() {
            info!(item = %settled.id, "chain completed");
            self.emit(QueueEvent::ChainCompleted(settled.clone()));
        }
    }

    /// A child may start once its parent has entered the chain and settled.
    fn parent_released(&self, parent: ItemId) -> bool {
        self.chain.contains(parent) && !self.store.contains(parent)
    }

    fn check_parent(&self, parent: ItemId, priority: Priority) -> Result<(), QueueError> {
        let stored = self.store.get(parent);
        if stored.is_none() && !self.chain.contains(parent) {
            return Err(QueueError::UnknownParent(parent));
        }
        // Only a waiting parent can be stuck behind its own child; the
        // active parent settles first either way.
        if let Some(p) = stored
            && p.status != ItemStatus::Processing
            && priority > p.priority
        {
            return Err(QueueError::PriorityInversion {
                parent,
                parent_priority: p.priority,
                child_priority: priority,
            });
        }
        let max = self.config.max_chain_size;
        if self.lineage_len(parent) + 1 > max {
            return Err(QueueError::ChainTooLong { parent, max });
        }
        Ok(())
    }

    /// Number of items from `id` up to its root, inclusive. Stops counting
    /// once past the chain limit.
    fn lineage_len(&self, id: ItemId) -> usize {
        let mut length = 1;
        let mut current = id;
        while let Some(parent) = self.parent_of(current) {
            length += 1;
            current = parent;
            if length > self.config.max_chain_size {
                break;
            }
        }
        length
    }

    fn parent_of(&self, id: ItemId) -> Option<ItemId> {
        match self.store.get(id) {
            Some(item) => item.parent_id,
            None => self.chain.parent_of(id).flatten(),
        }
    }

    fn allocate_id(&self) -> ItemId {
        loop {
            let id = self.ids.generate_item_id();
            if !self.store.contains(id) && !self.chain.contains(id) {
                return id;
            }
        }
    }

    fn active_id(&self) -> Option<ItemId> {
        self.active.map(|slot| slot.item_id)
    }

    fn is_current(&self, token: u64) -> bool {
        self.active.is_some_and(|slot| slot.token == token)
    }

    fn emit(&self, event: QueueEvent) {
        trace!(event = %event.kind(), "emit");
        self.bus.publish(event);
    }

    fn emit_state_changed(&self) {
        self.emit(QueueEvent::StateChanged(Box::new(self.snapshot())));
    }
}
