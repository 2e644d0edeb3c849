//! Decision model: the single next action chosen for a screen.
//!
//! `Decision` is a closed enum. Every consumer (actuation, logging, history)
//! matches it exhaustively, so adding a variant is a compile-time breaking change.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Named recovery routine dispatched by the actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    HandleApRecovery,
    RestartBattle,
    ScreenshotAnalysis,
}

impl RecoveryAction {
    pub fn as_str(self) -> &'static str {
        match self {
            RecoveryAction::HandleApRecovery => "handle_ap_recovery",
            RecoveryAction::RestartBattle => "restart_battle",
            RecoveryAction::ScreenshotAnalysis => "screenshot_analysis",
        }
    }
}

impl fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecoveryAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "handle_ap_recovery" => Ok(RecoveryAction::HandleApRecovery),
            "restart_battle" => Ok(RecoveryAction::RestartBattle),
            "screenshot_analysis" => Ok(RecoveryAction::ScreenshotAnalysis),
            other => Err(format!("unknown recovery routine: {other}")),
        }
    }
}

/// The next action to take on the current screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Decision {
    /// Play three cards, in this order. Values are the cards' detection indices.
    CardSelection { indices: [u8; 3], reasoning: String },

    /// Use a skill. `servant_index` is `None` for master skills.
    SkillUsage {
        servant_index: Option<u8>,
        skill_index: u8,
        target_index: Option<u8>,
        reasoning: String,
    },

    /// Fire a servant's noble phantasm.
    NpUsage { servant_index: u8, reasoning: String },

    Wait { duration_ms: u64, reasoning: String },

    ErrorRecovery {
        action: RecoveryAction,
        reasoning: String,
    },

    NoAction,
}

impl Decision {
    pub fn wait(duration_ms: u64, reasoning: impl Into<String>) -> Self {
        Decision::Wait {
            duration_ms,
            reasoning: reasoning.into(),
        }
    }

    pub fn recovery(action: RecoveryAction, reasoning: impl Into<String>) -> Self {
        Decision::ErrorRecovery {
            action,
            reasoning: reasoning.into(),
        }
    }

    /// Short variant name, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Decision::CardSelection { .. } => "card_selection",
            Decision::SkillUsage { .. } => "skill_usage",
            Decision::NpUsage { .. } => "np_usage",
            Decision::Wait { .. } => "wait",
            Decision::ErrorRecovery { .. } => "error_recovery",
            Decision::NoAction => "no_action",
        }
    }

    pub fn reasoning(&self) -> Option<&str> {
        match self {
            Decision::CardSelection { reasoning, .. }
            | Decision::SkillUsage { reasoning, .. }
            | Decision::NpUsage { reasoning, .. }
            | Decision::Wait { reasoning, .. }
            | Decision::ErrorRecovery { reasoning, .. } => Some(reasoning),
            Decision::NoAction => None,
        }
    }

    pub fn is_no_action(&self) -> bool {
        matches!(self, Decision::NoAction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_is_tagged_by_kind() {
        let d = Decision::CardSelection {
            indices: [0, 2, 4],
            reasoning: "Brave chain".to_string(),
        };
        let v: serde_json::Value = serde_json::to_value(&d).unwrap();
        assert_eq!(v["kind"], "card_selection");
        assert_eq!(v["indices"], serde_json::json!([0, 2, 4]));

        let v = serde_json::to_value(Decision::NoAction).unwrap();
        assert_eq!(v["kind"], "no_action");
    }

    #[test]
    fn recovery_action_names_round_trip_through_from_str() {
        for action in [
            RecoveryAction::HandleApRecovery,
            RecoveryAction::RestartBattle,
            RecoveryAction::ScreenshotAnalysis,
        ] {
            assert_eq!(action.as_str().parse::<RecoveryAction>(), Ok(action));
        }
        assert!("reboot".parse::<RecoveryAction>().is_err());
    }

    #[test]
    fn reasoning_is_exposed_for_every_variant_but_no_action() {
        assert_eq!(Decision::wait(500, "no cards detected").reasoning(), Some("no cards detected"));
        assert_eq!(Decision::NoAction.reasoning(), None);
        assert_eq!(
            Decision::recovery(RecoveryAction::RestartBattle, "boom").kind(),
            "error_recovery"
        );
    }
}
