//! Processor port - アイテムを 1 件ずつ実行する外部コールバック
//!
//! # 学習ポイント
//! - 所有権で「報告は高々 1 回」を保証する (`OutcomeReporter` は self を消費)

use std::fmt;

use tokio::sync::mpsc;

use crate::domain::{ItemId, Outcome, ProcessingError};
use crate::queue::Signal;

/// 命令 payload を実行する
///
/// `process` はディスパッチごとに 1 回、状態ロックの外で呼ばれる。
/// ブロックしてはいけない。長い処理はタスクに渡し、終わったら
/// [`OutcomeReporter`] で報告する。panic は捕捉され失敗として扱われる。
pub trait Processor: Send + Sync + 'static {
    fn process(&self, payload: serde_json::Value, reporter: OutcomeReporter);
}

impl<F> Processor for F
where
    F: Fn(serde_json::Value, OutcomeReporter) + Send + Sync + 'static,
{
    fn process(&self, payload: serde_json::Value, reporter: OutcomeReporter) {
        self(payload, reporter)
    }
}

/// 1 回のディスパッチの結果を報告するためのワンショットハンドル
///
/// どのメソッドも self を消費するので、報告は高々 1 回になる。
/// タイムアウト後やクリア後に届いた報告はスケジューラが捨てる。
/// 報告せずに drop した場合はタイムアウトでその試行が失敗する。
pub struct OutcomeReporter {
    item_id: ItemId,
    token: u64,
    signals: mpsc::UnboundedSender<Signal>,
}

impl OutcomeReporter {
    pub(crate) fn new(item_id: ItemId, token: u64, signals: mpsc::UnboundedSender<Signal>) -> Self {
        Self {
            item_id,
            token,
            signals,
        }
    }

    /// このディスパッチ対象のアイテム ID
    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    pub fn succeed(self, response: Option<serde_json::Value>) {
        self.send(Ok(response));
    }

    pub fn fail(self, reason: impl Into<String>) {
        self.send(Err(ProcessingError::failure(reason)));
    }

    pub fn report(self, result: Result<Option<serde_json::Value>, String>) {
        self.send(result.map_err(ProcessingError::Failure));
    }

    fn send(self, outcome: Outcome) {
        // A closed channel means the queue is gone; nobody is left to tell.
        let _ = self.signals.send(Signal::Outcome {
            item_id: self.item_id,
            token: self.token,
            outcome,
        });
    }
}

impl fmt::Debug for OutcomeReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutcomeReporter")
            .field("item_id", &self.item_id)
            .field("token", &self.token)
            .finish()
    }
}
