use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Session counters. Only ever incremented while a session runs; reset at `start()`.
///
/// `total_runtime_ms` and `average_battle_time_ms` are derived when a snapshot is taken.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationStats {
    pub battles_completed: u64,
    pub battles_won: u64,
    pub battles_lost: u64,
    pub screenshots_taken: u64,
    pub decisions_executed: u64,
    pub errors_encountered: u64,
    pub total_runtime_ms: u64,
    pub average_battle_time_ms: u64,
}

impl AutomationStats {
    pub fn record_battle(&mut self, victory: bool) {
        self.battles_completed += 1;
        if victory {
            self.battles_won += 1;
        } else {
            self.battles_lost += 1;
        }
    }

    /// Copy with the derived timing fields filled in for `runtime`.
    pub fn snapshot(&self, runtime: Duration) -> Self {
        let total_runtime_ms = u64::try_from(runtime.as_millis()).unwrap_or(u64::MAX);
        let average_battle_time_ms = total_runtime_ms
            .checked_div(self.battles_completed)
            .unwrap_or(0);
        Self {
            total_runtime_ms,
            average_battle_time_ms,
            ..self.clone()
        }
    }
}
