//! PerceptionPort - screen classification and entity detection.
//!
//! Pixel-level work (template matching, OCR) lives behind this trait. The
//! crate only sees already-classified state and structured entities.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::capture::Frame;
use crate::domain::{BattleState, CardInfo, PortError, ServantState, SkillInfo};

/// Wave and enemy information read from the battle HUD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleInfo {
    /// Current wave, starting at 1.
    pub phase: u32,
    pub enemy_count: u32,
}

impl Default for BattleInfo {
    fn default() -> Self {
        Self {
            phase: 1,
            enemy_count: 0,
        }
    }
}

/// Every call may fail; the controller treats a failure as a failed cycle.
#[async_trait]
pub trait PerceptionPort: Send + Sync {
    async fn classify(&self, frame: &Frame) -> Result<BattleState, PortError>;

    async fn detect_cards(&self, frame: &Frame) -> Result<Vec<CardInfo>, PortError>;

    async fn detect_skills(&self, frame: &Frame) -> Result<Vec<SkillInfo>, PortError>;

    async fn detect_servant_states(&self, frame: &Frame) -> Result<Vec<ServantState>, PortError>;

    async fn read_battle_info(&self, frame: &Frame) -> Result<BattleInfo, PortError>;

    /// Whether a result screen shows a victory.
    async fn detect_victory(&self, frame: &Frame) -> Result<bool, PortError>;
}
