//! Per-servant battle state as reported by perception.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServantState {
    /// Front-line position, 0–2.
    pub index: u8,
    pub is_alive: bool,
    /// 0.0–1.0
    pub health_percentage: f32,
    /// 0–100
    pub np_gauge: u8,
    #[serde(default)]
    pub buffs: Vec<String>,
    #[serde(default)]
    pub debuffs: Vec<String>,
    pub skills_available: [bool; 3],
}

impl ServantState {
    /// A living servant at full health with all skills ready and an empty gauge.
    pub fn ready(index: u8) -> Self {
        Self {
            index,
            is_alive: true,
            health_percentage: 1.0,
            np_gauge: 0,
            buffs: Vec::new(),
            debuffs: Vec::new(),
            skills_available: [true; 3],
        }
    }

    /// Placeholder for an empty or fallen slot.
    pub fn fallen(index: u8) -> Self {
        Self {
            index,
            is_alive: false,
            health_percentage: 0.0,
            np_gauge: 0,
            buffs: Vec::new(),
            debuffs: Vec::new(),
            skills_available: [false; 3],
        }
    }

    pub fn with_health(mut self, health_percentage: f32) -> Self {
        self.health_percentage = health_percentage;
        self
    }

    pub fn with_np_gauge(mut self, np_gauge: u8) -> Self {
        self.np_gauge = np_gauge;
        self
    }

    pub fn with_skills_available(mut self, skills_available: [bool; 3]) -> Self {
        self.skills_available = skills_available;
        self
    }

    pub fn np_ready(&self) -> bool {
        self.is_alive && self.np_gauge >= 100
    }
}
