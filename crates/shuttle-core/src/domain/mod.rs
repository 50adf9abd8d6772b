//! Domain - ID、優先度、アイテム状態、処理結果、統計、イベント

pub mod events;
pub mod ids;
pub mod item;
pub mod outcome;
pub mod priority;
pub mod snapshot;
pub mod stats;
pub mod status;

pub use events::{EventKind, QueueEvent};
pub use ids::ItemId;
pub use item::QueueItem;
pub use outcome::{Outcome, ProcessingError};
pub use priority::Priority;
pub use snapshot::QueueState;
pub use stats::QueueStats;
pub use status::ItemStatus;
