//! Typed - 型付き命令、async ハンドラ、ルーティング
//!
//! # 2 つのレイヤー
//! - **Typed**: `Instruction` と `InstructionHandler<T>` で payload 構造体と
//!   ハンドラをコンパイル時に結びつける
//! - **Dyn**: `Handler` は object-safe で生の payload を扱う。
//!   ルーターはこの形でハンドラを保持する
//!
//! `HandlerProcessor` は任意の `Handler`（通常は `InstructionRouter`）を
//! キューの `Processor` として差し込む。
//!
//! # 学習ポイント
//! - 型付き API と型消去 API の 2 層構造
//! - `type` タグによる実行時ディスパッチ

pub mod handler;
pub mod instruction;
pub mod registry;

pub use self::handler::{
    Handler, HandlerProcessor, HandlerResult, InstructionHandler, TypedHandler,
};
pub use self::instruction::{Instruction, TYPE_FIELD, instruction_type};
pub use self::registry::{InstructionRouter, RegistryError};

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use super::instruction::fixtures::Add;
    use super::*;
    use crate::config::QueueConfig;
    use crate::domain::{Priority, QueueEvent};
    use crate::queue::InstructionQueue;

    struct SlowAdd;

    #[async_trait]
    impl InstructionHandler<Add> for SlowAdd {
        async fn handle(&self, add: Add) -> HandlerResult {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(Some(json!(add.a + add.b)))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn routed_handlers_drive_the_queue() {
        let mut router = InstructionRouter::new();
        router.register::<Add, _>(SlowAdd).unwrap();
        let queue =
            InstructionQueue::new(QueueConfig::default(), HandlerProcessor::new(router)).unwrap();
        let mut rx = queue.subscribe();

        let payload = Add { a: 40, b: 2 }.to_payload().unwrap();
        queue.enqueue(payload, Priority::Normal, None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let mut response = None;
        while let Ok(event) = rx.try_recv() {
            if let QueueEvent::ProcessingCompleted(item) = event {
                response = item.response;
            }
        }
        assert_eq!(response, Some(json!(42)));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_handler_hits_the_deadline() {
        let mut router = InstructionRouter::new();
        router.register::<Add, _>(SlowAdd).unwrap();
        let config = QueueConfig::default()
            .with_processing_timeout(Duration::from_millis(5))
            .with_retry_attempts(0);
        let queue = InstructionQueue::new(config, HandlerProcessor::new(router)).unwrap();

        let payload = Add { a: 1, b: 1 }.to_payload().unwrap();
        queue.enqueue(payload, Priority::Normal, None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let stats = queue.state().await.stats;
        assert_eq!(stats.total_processed, 1);
        assert_eq!(stats.total_failed, 1);
    }
}
