//! Per-cycle battle snapshot handed to the decision engine.
//!
//! A `BattleContext` is built fresh each cycle from perception output and is
//! immutable afterwards: the builder is the only way in, and it validates and
//! normalises what perception reported.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::card::CardInfo;
use super::errors::ContextError;
use super::servant::ServantState;
use super::skill::{SkillInfo, SkillKey};

pub const PARTY_SIZE: usize = 3;
pub const MAX_CARDS: usize = 5;
pub const MAX_NP_GAUGE: u8 = 100;

/// Tactical goal of a session; biases card scoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    #[default]
    Farming,
    Challenge,
    Story,
    Event,
    Daily,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BattleContext {
    turn: u32,
    phase: u32,
    enemy_count: u32,
    servant_states: [ServantState; PARTY_SIZE],
    available_cards: Vec<CardInfo>,
    np_gauges: [u8; PARTY_SIZE],
    skill_cooldowns: HashMap<SkillKey, u32>,
    objective: Objective,
}

impl BattleContext {
    pub fn builder() -> BattleContextBuilder {
        BattleContextBuilder::default()
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn phase(&self) -> u32 {
        self.phase
    }

    pub fn enemy_count(&self) -> u32 {
        self.enemy_count
    }

    pub fn servant_states(&self) -> &[ServantState; PARTY_SIZE] {
        &self.servant_states
    }

    pub fn servant(&self, index: u8) -> Option<&ServantState> {
        self.servant_states.get(usize::from(index))
    }

    pub fn available_cards(&self) -> &[CardInfo] {
        &self.available_cards
    }

    pub fn np_gauges(&self) -> [u8; PARTY_SIZE] {
        self.np_gauges
    }

    pub fn skill_cooldown(&self, key: SkillKey) -> u32 {
        self.skill_cooldowns.get(&key).copied().unwrap_or(0)
    }

    pub fn skill_cooldowns(&self) -> &HashMap<SkillKey, u32> {
        &self.skill_cooldowns
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }
}

#[derive(Debug, Clone)]
pub struct BattleContextBuilder {
    turn: u32,
    phase: u32,
    enemy_count: u32,
    servants: Vec<ServantState>,
    cards: Vec<CardInfo>,
    skills: Vec<SkillInfo>,
    objective: Objective,
}

impl Default for BattleContextBuilder {
    fn default() -> Self {
        Self {
            turn: 1,
            phase: 1,
            enemy_count: 0,
            servants: Vec::new(),
            cards: Vec::new(),
            skills: Vec::new(),
            objective: Objective::default(),
        }
    }
}

impl BattleContextBuilder {
    pub fn turn(mut self, turn: u32) -> Self {
        self.turn = turn;
        self
    }

    pub fn phase(mut self, phase: u32) -> Self {
        self.phase = phase;
        self
    }

    pub fn enemy_count(mut self, enemy_count: u32) -> Self {
        self.enemy_count = enemy_count;
        self
    }

    pub fn servants(mut self, servants: Vec<ServantState>) -> Self {
        self.servants = servants;
        self
    }

    pub fn cards(mut self, cards: Vec<CardInfo>) -> Self {
        self.cards = cards;
        self
    }

    /// Cooldowns are taken from the detected skills.
    pub fn skills(mut self, skills: &[SkillInfo]) -> Self {
        self.skills = skills.to_vec();
        self
    }

    pub fn objective(mut self, objective: Objective) -> Self {
        self.objective = objective;
        self
    }

    pub fn build(self) -> Result<BattleContext, ContextError> {
        if self.turn == 0 {
            return Err(ContextError::InvalidTurn);
        }
        if self.phase == 0 {
            return Err(ContextError::InvalidPhase);
        }

        let servant_states = normalize_servants(self.servants)?;
        validate_cards(&self.cards)?;

        let mut np_gauges = [0u8; PARTY_SIZE];
        for (gauge, servant) in np_gauges.iter_mut().zip(servant_states.iter()) {
            *gauge = servant.np_gauge;
        }

        let skill_cooldowns = self
            .skills
            .iter()
            .map(|skill| (skill.key(), skill.cooldown_turns))
            .collect();

        Ok(BattleContext {
            turn: self.turn,
            phase: self.phase,
            enemy_count: self.enemy_count,
            servant_states,
            available_cards: self.cards,
            np_gauges,
            skill_cooldowns,
            objective: self.objective,
        })
    }
}

/// Places each reported servant in its slot, fills empty slots with fallen
/// placeholders and clamps NP gauges to 100.
fn normalize_servants(
    servants: Vec<ServantState>,
) -> Result<[ServantState; PARTY_SIZE], ContextError> {
    let mut slots: [Option<ServantState>; PARTY_SIZE] = [None, None, None];

    for mut servant in servants {
        let slot = usize::from(servant.index);
        if slot >= PARTY_SIZE {
            return Err(ContextError::ServantIndexOutOfRange(servant.index));
        }
        if !(0.0..=1.0).contains(&servant.health_percentage) {
            return Err(ContextError::InvalidHealth {
                servant: servant.index,
                value: servant.health_percentage,
            });
        }
        if slots[slot].is_some() {
            return Err(ContextError::DuplicateServant(servant.index));
        }
        servant.np_gauge = servant.np_gauge.min(MAX_NP_GAUGE);
        slots[slot] = Some(servant);
    }

    let [a, b, c] = slots;
    Ok([
        a.unwrap_or_else(|| ServantState::fallen(0)),
        b.unwrap_or_else(|| ServantState::fallen(1)),
        c.unwrap_or_else(|| ServantState::fallen(2)),
    ])
}

pub(crate) fn validate_cards(cards: &[CardInfo]) -> Result<(), ContextError> {
    if cards.len() > MAX_CARDS {
        return Err(ContextError::TooManyCards(cards.len()));
    }
    for (i, card) in cards.iter().enumerate() {
        if usize::from(card.servant_index) >= PARTY_SIZE {
            return Err(ContextError::ServantIndexOutOfRange(card.servant_index));
        }
        if !card.effectiveness.is_finite() || card.effectiveness <= 0.0 {
            return Err(ContextError::InvalidEffectiveness {
                card: card.index,
                value: card.effectiveness,
            });
        }
        if cards[..i].iter().any(|other| other.index == card.index) {
            return Err(ContextError::DuplicateCardIndex(card.index));
        }
    }
    Ok(())
}
