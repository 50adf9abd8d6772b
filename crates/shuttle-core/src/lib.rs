//! shuttle-core - 命令を 1 件ずつ実行する優先度付きキュー
//!
//! 親子チェーン、ディスパッチごとのタイムアウト、回数制限付きリトライを持つ。
//!
//! # モジュール構成
//! - **domain**: アイテム、優先度、ステータス、結果、統計、スナップショット、イベント
//! - **ports**: `Processor` / `Clock` / `IdGenerator` の抽象化
//! - **queue**: `InstructionQueue` の裏にあるスケジューラ状態機械
//! - **typed**: 型付き命令、async ハンドラ、ルーター
//! - **bus**: ライフサイクルイベントを流す broadcast チャネル
//! - **config** / **error**: 設定と enqueue エラー
//! - **observability**: ステータス集計とイベントロガー
//!
//! # 学習ポイント
//! - ハンドル (`Arc` + `Mutex`) と driver タスクの分離
//! - ports による外部依存の差し替え（テストでは `FixedClock`）

pub mod bus;
pub mod config;
pub mod domain;
pub mod error;
pub mod observability;
pub mod ports;
pub mod queue;
pub mod typed;

pub use config::{ConfigError, QueueConfig};
pub use domain::{
    EventKind, ItemId, ItemStatus, Priority, ProcessingError, QueueEvent, QueueItem, QueueState,
    QueueStats,
};
pub use error::QueueError;
pub use observability::QueueCounts;
pub use ports::{OutcomeReporter, Processor};
pub use queue::{InstructionQueue, QueueBuilder, RetryPolicy};
