//! Impls - 実装（開発用・テスト用）
//!
//! # 含まれる実装
//! - **SimulatedDevice**: capture / perception / actuation をまとめた疑似端末
//!
//! 実機向けの実装 (adb, 画像認識) はこのクレートの外に置く。

pub mod simulated;

pub use self::simulated::{SimulatedDevice, SimulationScript};
