//! Status - point-in-time view of a session.

use serde::{Deserialize, Serialize};

use crate::domain::{AutomationState, AutomationStats, SessionId, Team};
use crate::ports::FrameInfo;

/// Returned by `AutomationController::status()`.
///
/// `runtime_ms` is measured from `start()` and stops advancing once the loop
/// exits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub session_id: Option<SessionId>,
    pub state: AutomationState,
    pub is_initialized: bool,
    pub current_team: Option<Team>,
    pub runtime_ms: u64,
    pub stats: AutomationStats,
    pub consecutive_errors: u32,
    pub last_frame: Option<FrameInfo>,
}

impl StatusSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
