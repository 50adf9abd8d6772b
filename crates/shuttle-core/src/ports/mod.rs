//! Ports - スケジューラと外部世界の境界
//!
//! - `Processor`: payload を実行して結果を報告する
//! - `Clock` / `IdGenerator`: テストで決定的な実装に差し替えられる
//!
//! # 学習ポイント
//! - Hexagonal Architecture の Port（trait で外部依存を抽象化）

pub mod clock;
pub mod id_generator;
pub mod processor;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::processor::{OutcomeReporter, Processor};
