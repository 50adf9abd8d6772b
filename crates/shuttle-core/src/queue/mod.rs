//! Queue module: the store, the dependency chain, retry timing and the
//! scheduler state machine, behind the [`InstructionQueue`] handle.

mod chain;
mod handle;
mod retry;
mod scheduler;
mod store;
mod timers;

pub use handle::{InstructionQueue, QueueBuilder};
pub use retry::RetryPolicy;

pub(crate) use timers::Signal;
