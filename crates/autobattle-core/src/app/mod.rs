//! App - the automation controller.
//!
//! ports と engine を組み合わせてセッションを回す層。
//!
//! # 主要コンポーネント
//! - **ControllerBuilder**: port のワイヤリングと起動時検証
//! - **AutomationController**: start / pause / resume / stop / status
//! - **worker**: バックグラウンドの capture → decide → act ループ
//! - **Actuator**: Decision をタップ操作に変換
//! - **ErrorPolicy**: 連続エラーとセッション上限の判定

pub mod actuator;
pub mod builder;
pub mod config;
pub mod controller;
pub mod pacing;
pub mod retry;
mod session;
pub mod status;
mod worker;

pub use self::actuator::{ActionOutcome, Actuator};
pub use self::builder::{BuildError, ControllerBuilder};
pub use self::config::{AutomationConfig, ConfigError, LoopTiming};
pub use self::controller::AutomationController;
pub use self::pacing::Pacer;
pub use self::retry::{ErrorPolicy, FailureVerdict, MAX_CONSECUTIVE_ERRORS};
pub use self::status::StatusSnapshot;
