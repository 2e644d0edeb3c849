//! Team input supplied at `start()`.
//!
//! The controller does not interpret servant or craft essence identifiers; it
//! only reads the strategy, objective and skill plan.

use serde::{Deserialize, Serialize};

use super::context::Objective;
use super::skill::SkillUsageRule;

/// How much of a turn the engine plans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Only pick command cards on the command screen.
    #[default]
    CardsOnly,
    /// Use the best skill and NP before picking cards.
    FullTurn,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
    #[serde(default)]
    pub servants: Vec<String>,
    #[serde(default)]
    pub craft_essences: Vec<String>,
    #[serde(default)]
    pub strategy: Strategy,
    #[serde(default)]
    pub objective: Objective,
    #[serde(default)]
    pub skill_plan: Vec<SkillUsageRule>,
}

impl Team {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_servants(mut self, servants: &[&str]) -> Self {
        self.servants = servants.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_objective(mut self, objective: Objective) -> Self {
        self.objective = objective;
        self
    }

    pub fn with_rule(mut self, rule: SkillUsageRule) -> Self {
        self.skill_plan.push(rule);
        self
    }
}
