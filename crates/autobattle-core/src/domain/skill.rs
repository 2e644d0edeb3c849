//! Skills (servant and master) and the team's scheduled usage rules.

use serde::{Deserialize, Serialize};

/// Who owns a skill slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillOwner {
    Servant(u8),
    Master,
}

/// Identifies one skill slot: owner + slot 0–2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SkillKey {
    pub owner: SkillOwner,
    pub slot: u8,
}

impl SkillKey {
    pub fn servant(servant_index: u8, slot: u8) -> Self {
        Self {
            owner: SkillOwner::Servant(servant_index),
            slot,
        }
    }

    pub fn master(slot: u8) -> Self {
        Self {
            owner: SkillOwner::Master,
            slot,
        }
    }
}

/// A detected skill slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillInfo {
    pub owner: SkillOwner,
    pub slot: u8,
    /// Remaining cooldown in turns; 0 means usable.
    pub cooldown_turns: u32,
    pub needs_target: bool,
}

impl SkillInfo {
    pub fn servant(servant_index: u8, slot: u8) -> Self {
        Self {
            owner: SkillOwner::Servant(servant_index),
            slot,
            cooldown_turns: 0,
            needs_target: false,
        }
    }

    pub fn master(slot: u8) -> Self {
        Self {
            owner: SkillOwner::Master,
            slot,
            cooldown_turns: 0,
            needs_target: false,
        }
    }

    pub fn with_cooldown(mut self, turns: u32) -> Self {
        self.cooldown_turns = turns;
        self
    }

    pub fn targeted(mut self) -> Self {
        self.needs_target = true;
        self
    }

    pub fn key(&self) -> SkillKey {
        SkillKey {
            owner: self.owner,
            slot: self.slot,
        }
    }
}

/// Explicit "use this skill on turn/wave N" instruction from the team plan.
///
/// `None` for `turn` or `phase` matches any value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillUsageRule {
    pub owner: SkillOwner,
    pub slot: u8,
    #[serde(default)]
    pub turn: Option<u32>,
    #[serde(default)]
    pub phase: Option<u32>,
    #[serde(default)]
    pub target: Option<u8>,
    #[serde(default = "SkillUsageRule::default_priority")]
    pub priority: f32,
}

impl SkillUsageRule {
    pub const MIN_PRIORITY: f32 = 0.9;

    fn default_priority() -> f32 {
        0.95
    }

    pub fn new(key: SkillKey) -> Self {
        Self {
            owner: key.owner,
            slot: key.slot,
            turn: None,
            phase: None,
            target: None,
            priority: Self::default_priority(),
        }
    }

    pub fn on_turn(mut self, turn: u32) -> Self {
        self.turn = Some(turn);
        self
    }

    pub fn on_phase(mut self, phase: u32) -> Self {
        self.phase = Some(phase);
        self
    }

    pub fn with_target(mut self, target: u8) -> Self {
        self.target = Some(target);
        self
    }

    /// Rule priorities always rank above the situational rules.
    pub fn effective_priority(&self) -> f32 {
        if self.priority.is_finite() {
            self.priority.clamp(Self::MIN_PRIORITY, 1.0)
        } else {
            Self::MIN_PRIORITY
        }
    }

    pub fn matches(&self, key: SkillKey, turn: u32, phase: u32) -> bool {
        self.owner == key.owner
            && self.slot == key.slot
            && self.turn.is_none_or(|t| t == turn)
            && self.phase.is_none_or(|p| p == phase)
    }
}
