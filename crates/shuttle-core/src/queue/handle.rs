//! InstructionQueue - the public, cloneable handle to a running queue.
//!
//! # Wiring
//! - `Shared` owns the scheduler behind a tokio `Mutex`, the processor and
//!   the bus.
//! - A driver task drains the signal channel (outcomes, deadlines, retries)
//!   and applies each signal under the lock.
//! - Whoever unlocks after a dispatch was prepared hands it to the processor,
//!   so the processor never runs under the lock.
//!
//! The driver only holds a `Weak` reference; dropping the last handle stops
//! it and aborts pending timers.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};

use tokio::sync::{Mutex, broadcast, mpsc};
use tracing::{debug, error};

use super::scheduler::{Dispatch, Scheduler};
use super::timers::Signal;
use crate::bus::Bus;
use crate::config::{ConfigError, QueueConfig};
use crate::domain::{ItemId, Priority, ProcessingError, QueueEvent, QueueItem, QueueState};
use crate::error::QueueError;
use crate::observability::QueueCounts;
use crate::ports::{Clock, IdGenerator, OutcomeReporter, Processor, SystemClock, UlidGenerator};

/// Handle to a priority instruction queue.
///
/// # Example
/// ```ignore
/// let queue = InstructionQueue::builder(|payload: Value, reporter: OutcomeReporter| {
///     reporter.succeed(Some(payload));
/// })
/// .config(QueueConfig::default().with_retry_attempts(1))
/// .build()?;
///
/// let item = queue.enqueue(json!({"op": "ping"}), Priority::High, None).await?;
/// ```
#[derive(Clone)]
pub struct InstructionQueue {
    shared: Arc<Shared>,
}

struct Shared {
    scheduler: Mutex<Scheduler>,
    processor: Arc<dyn Processor>,
    bus: Bus,
    config: QueueConfig,
}

/// Builder for [`InstructionQueue`]. Clock and id generator default to the
/// system clock and ULIDs.
pub struct QueueBuilder {
    processor: Arc<dyn Processor>,
    config: QueueConfig,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
}

impl QueueBuilder {
    pub fn config(mut self, config: QueueConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Validate the configuration and start the queue.
    ///
    /// # Panics
    /// Must be called from within a tokio runtime: the driver task is
    /// spawned here.
    pub fn build(self) -> Result<InstructionQueue, ConfigError> {
        let config = self.config.validate()?;
        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };
        let ids: Arc<dyn IdGenerator> = match self.ids {
            Some(ids) => ids,
            None => Arc::new(UlidGenerator::new(clock.clone())),
        };
        let bus = Bus::new(config.event_capacity);
        let (tx, rx) = mpsc::unbounded_channel();

        let scheduler = Scheduler::new(config.clone(), bus.clone(), clock, ids, tx);
        let shared = Arc::new(Shared {
            scheduler: Mutex::new(scheduler),
            processor: self.processor,
            bus,
            config,
        });
        tokio::spawn(drive(Arc::downgrade(&shared), rx));
        debug!(
            max_size = shared.config.max_size,
            timeout_ms = shared.config.processing_timeout_ms,
            retries = shared.config.retry_attempts,
            "queue started"
        );
        Ok(InstructionQueue { shared })
    }
}

impl InstructionQueue {
    pub fn builder(processor: impl Processor) -> QueueBuilder {
        QueueBuilder {
            processor: Arc::new(processor),
            config: QueueConfig::default(),
            clock: None,
            ids: None,
        }
    }

    /// Shorthand for `builder(processor).config(config).build()`.
    pub fn new(config: QueueConfig, processor: impl Processor) -> Result<Self, ConfigError> {
        Self::builder(processor).config(config).build()
    }

    /// Add an instruction. The returned copy reflects the item as queued,
    /// before any dispatch this call may have triggered.
    pub async fn enqueue(
        &self,
        payload: serde_json::Value,
        priority: Priority,
        parent_id: Option<ItemId>,
    ) -> Result<QueueItem, QueueError> {
        let (result, dispatch) = {
            let mut scheduler = self.shared.scheduler.lock().await;
            let result = scheduler.enqueue(payload, priority, parent_id);
            (result, scheduler.take_dispatch())
        };
        self.shared.run(dispatch);
        result
    }

    /// Cancel a pending item together with its pending descendants.
    /// Returns false if `id` is unknown or not pending.
    pub async fn cancel(&self, id: ItemId) -> bool {
        let (cancelled, dispatch) = {
            let mut scheduler = self.shared.scheduler.lock().await;
            let cancelled = scheduler.cancel(id);
            (cancelled, scheduler.take_dispatch())
        };
        self.shared.run(dispatch);
        cancelled
    }

    /// Drop every item, the chain and all timers. An outcome still in flight
    /// is ignored when it arrives. Statistics are kept.
    pub async fn clear(&self) {
        self.shared.scheduler.lock().await.clear();
    }

    pub async fn state(&self) -> QueueState {
        self.shared.scheduler.lock().await.snapshot()
    }

    pub async fn counts(&self) -> QueueCounts {
        QueueCounts::from_state(&self.state().await)
    }

    /// Subscribe to lifecycle events emitted from now on.
    ///
    /// Delivery is ordered but lossy: a receiver more than
    /// `event_capacity` events behind gets `RecvError::Lagged` and the
    /// oldest events, possibly `PROCESSING_COMPLETED` or `QUEUE_EMPTY`, are
    /// gone. Re-read [`state`](Self::state) after a lag.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.shared.bus.subscribe()
    }

    /// The validated configuration in effect.
    pub fn config(&self) -> &QueueConfig {
        &self.shared.config
    }
}

impl Shared {
    fn run(&self, dispatch: Option<Dispatch>) {
        let Some(Dispatch {
            item_id,
            token,
            payload,
            signals,
        }) = dispatch
        else {
            return;
        };
        let reporter = OutcomeReporter::new(item_id, token, signals.clone());
        let called = catch_unwind(AssertUnwindSafe(|| {
            self.processor.process(payload, reporter);
        }));
        if let Err(panic) = called {
            let reason = panic_message(&*panic);
            error!(item = %item_id, %reason, "processor panicked");
            let _ = signals.send(Signal::Outcome {
                item_id,
                token,
                outcome: Err(ProcessingError::failure(format!(
                    "processor panicked: {reason}"
                ))),
            });
        }
    }
}

async fn drive(shared: Weak<Shared>, mut signals: mpsc::UnboundedReceiver<Signal>) {
    while let Some(signal) = signals.recv().await {
        let Some(shared) = shared.upgrade() else {
            break;
        };
        let dispatch = {
            let mut scheduler = shared.scheduler.lock().await;
            scheduler.on_signal(signal);
            scheduler.take_dispatch()
        };
        shared.run(dispatch);
    }
    debug!("queue driver stopped");
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
