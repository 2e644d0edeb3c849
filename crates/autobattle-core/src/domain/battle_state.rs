//! Screen classification produced by the perception port each cycle.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Classification of the current game screen.
///
/// Produced externally once per cycle and never held longer than that cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleState {
    QuestSelection,
    SupportSelection,
    BattleStart,
    CommandSelection,
    SkillSelection,
    NpSelection,
    BattleResult,
    ApRecovery,
    Error,
    Unknown,
}

impl BattleState {
    /// Screens where the engine has a tactical choice to make.
    pub fn needs_decision(self) -> bool {
        matches!(
            self,
            BattleState::CommandSelection | BattleState::SkillSelection | BattleState::NpSelection
        )
    }

    /// Stable name used in logs and serialized records.
    pub fn as_str(self) -> &'static str {
        match self {
            BattleState::QuestSelection => "quest_selection",
            BattleState::SupportSelection => "support_selection",
            BattleState::BattleStart => "battle_start",
            BattleState::CommandSelection => "command_selection",
            BattleState::SkillSelection => "skill_selection",
            BattleState::NpSelection => "np_selection",
            BattleState::BattleResult => "battle_result",
            BattleState::ApRecovery => "ap_recovery",
            BattleState::Error => "error",
            BattleState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for BattleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_snake_case() {
        let s = serde_json::to_string(&BattleState::CommandSelection).unwrap();
        assert_eq!(s, "\"command_selection\"");

        let back: BattleState = serde_json::from_str("\"ap_recovery\"").unwrap();
        assert_eq!(back, BattleState::ApRecovery);
    }

    #[test]
    fn display_matches_serde_name() {
        for state in [
            BattleState::QuestSelection,
            BattleState::NpSelection,
            BattleState::Unknown,
        ] {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json.trim_matches('"'), state.to_string());
        }
    }

    #[test]
    fn only_battle_menus_need_decisions() {
        assert!(BattleState::CommandSelection.needs_decision());
        assert!(BattleState::NpSelection.needs_decision());
        assert!(!BattleState::BattleResult.needs_decision());
        assert!(!BattleState::Unknown.needs_decision());
    }
}
