//! Handler trait - 命令を実行するハンドラと Processor アダプタ
//!
//! # 学習ポイント
//! - ジェネリック trait (`InstructionHandler<T>`)
//! - Object-safe trait (`Handler`)
//! - Type erasure パターン (`TypedHandler<T, H>` → `Handler`)
//! - 同期コールバック (`Processor`) から async タスクへの橋渡し (`HandlerProcessor`)

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::instruction::Instruction;
use crate::ports::{OutcomeReporter, Processor};

/// 1 件の payload を処理した結果（任意のレスポンス、または失敗理由）
pub type HandlerResult = Result<Option<serde_json::Value>, String>;

/// `T` 型の命令を処理するハンドラ
#[async_trait]
pub trait InstructionHandler<T: Instruction>: Send + Sync {
    async fn handle(&self, instruction: T) -> HandlerResult;
}

/// Object-safe な payload ハンドラ（ルーターが `Arc<dyn Handler>` で保持）
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn handle(&self, payload: serde_json::Value) -> HandlerResult;
}

/// payload を `T` にデコードしてから型付きハンドラを呼ぶ
pub struct TypedHandler<T: Instruction, H: InstructionHandler<T>> {
    handler: H,
    _marker: PhantomData<T>,
}

impl<T: Instruction, H: InstructionHandler<T>> TypedHandler<T, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Instruction, H: InstructionHandler<T> + 'static> Handler for TypedHandler<T, H> {
    async fn handle(&self, payload: serde_json::Value) -> HandlerResult {
        let instruction: T = serde_json::from_value(payload)
            .map_err(|e| format!("decode {}: {e}", T::TYPE))?;
        self.handler.handle(instruction).await
    }
}

/// [`Handler`] をキューの [`Processor`] として動かす
///
/// ディスパッチごとに tokio タスクを 1 つ spawn する。
/// キューが待つ時間はタイムアウトで制限される。
pub struct HandlerProcessor<H> {
    handler: Arc<H>,
}

impl<H: Handler> HandlerProcessor<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }
}

impl<H: Handler> Processor for HandlerProcessor<H> {
    fn process(&self, payload: serde_json::Value, reporter: OutcomeReporter) {
        let handler = self.handler.clone();
        tokio::spawn(async move {
            let item = reporter.item_id();
            let result = handler.handle(payload).await;
            debug!(%item, ok = result.is_ok(), "handler finished");
            reporter.report(result);
        });
    }
}
