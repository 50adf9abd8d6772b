//! IdGenerator port - ID 生成の抽象化
//!
//! ID は ULID。時刻部分は注入された [`Clock`] から取るので、
//! [`FixedClock`](super::FixedClock) を使うテストでは先頭が固定になる。
//! ランダム部分は `rand` で生成する。
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（本番用）

use std::sync::Arc;

use ulid::Ulid;

use crate::domain::ItemId;
use crate::ports::Clock;

pub trait IdGenerator: Send + Sync {
    fn generate_item_id(&self) -> ItemId;
}

pub struct UlidGenerator {
    clock: Arc<dyn Clock>,
}

impl UlidGenerator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl IdGenerator for UlidGenerator {
    fn generate_item_id(&self) -> ItemId {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        ItemId::from(Ulid::from_parts(timestamp_ms, rand::random()))
    }
}
