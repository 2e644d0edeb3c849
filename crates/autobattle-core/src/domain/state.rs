//! AutomationState - lifecycle of an automation session.

use std::fmt;

use serde::{Deserialize, Serialize};

/// AutomationState is the single authoritative session state.
///
/// # 状態遷移
/// - Idle --initialize--> Initializing --> Idle (or Error on failure)
/// - Idle --start--> Running
/// - Running <--pause/resume--> Paused
/// - Running/Paused --stop--> Stopping --> Idle
/// - Running --3 consecutive failures--> Error
/// - Running --AP depleted / battle cap--> Completed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutomationState {
    #[default]
    Idle,
    Initializing,
    Running,
    Paused,
    Stopping,
    Error,
    Completed,
}

impl AutomationState {
    /// The loop task keeps cycling in these states.
    pub fn is_active(self) -> bool {
        matches!(self, AutomationState::Running | AutomationState::Paused)
    }

    /// Session ended on its own; only `start()` (or `stop()`) leaves these.
    pub fn is_terminal(self) -> bool {
        matches!(self, AutomationState::Error | AutomationState::Completed)
    }

    /// States from which a new session may be started.
    pub fn can_start(self) -> bool {
        matches!(
            self,
            AutomationState::Idle | AutomationState::Error | AutomationState::Completed
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AutomationState::Idle => "idle",
            AutomationState::Initializing => "initializing",
            AutomationState::Running => "running",
            AutomationState::Paused => "paused",
            AutomationState::Stopping => "stopping",
            AutomationState::Error => "error",
            AutomationState::Completed => "completed",
        }
    }
}

impl fmt::Display for AutomationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::idle(AutomationState::Idle, true)]
    #[case::error(AutomationState::Error, true)]
    #[case::completed(AutomationState::Completed, true)]
    #[case::running(AutomationState::Running, false)]
    #[case::paused(AutomationState::Paused, false)]
    #[case::stopping(AutomationState::Stopping, false)]
    #[case::initializing(AutomationState::Initializing, false)]
    fn start_is_allowed_only_from_resting_states(
        #[case] state: AutomationState,
        #[case] allowed: bool,
    ) {
        assert_eq!(state.can_start(), allowed);
    }

    #[test]
    fn active_and_terminal_are_disjoint() {
        for state in [
            AutomationState::Idle,
            AutomationState::Initializing,
            AutomationState::Running,
            AutomationState::Paused,
            AutomationState::Stopping,
            AutomationState::Error,
            AutomationState::Completed,
        ] {
            assert!(!(state.is_active() && state.is_terminal()));
        }
    }
}
