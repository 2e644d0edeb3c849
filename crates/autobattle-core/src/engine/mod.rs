//! Decision engine: battle snapshot in, one `Decision` out.
//!
//! # 構成
//! - **cards**: 3-card combination scoring (brave / colour chains, objective weighting)
//! - **skills**: skill prioritisation rules
//! - **np**: noble phantasm prioritisation rules
//! - **history**: bounded decision log
//!
//! The engine never fails. Bad input and panics inside the scoring code turn
//! into `Decision::ErrorRecovery { action: RestartBattle, .. }`.

pub mod cards;
pub mod history;
pub mod np;
pub mod skills;

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use thiserror::Error;

pub use self::cards::{CardPick, ComboScore};
pub use self::history::{DecisionHistory, DecisionRecord};

use crate::domain::context::validate_cards;
use crate::domain::{
    BattleContext, BattleState, CardInfo, ContextError, Decision, RecoveryAction, SkillInfo,
    SkillUsageRule, Team,
};
use crate::ports::{Clock, Decider, SystemClock};

pub const NO_CARDS_WAIT_MS: u64 = 500;
pub const QUEST_SELECTION_WAIT_MS: u64 = 1000;
pub const SUPPORT_SELECTION_WAIT_MS: u64 = 2000;
pub const BATTLE_START_WAIT_MS: u64 = 1500;
pub const BATTLE_RESULT_WAIT_MS: u64 = 2000;

/// Input the engine refuses to score.
#[derive(Debug, Error)]
pub enum DecisionError {
    #[error("invalid cards: {0}")]
    Cards(#[from] ContextError),

    #[error("skill slot {0} out of range (0-2)")]
    SkillSlot(u8),
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Explicit skill usage rules; they outrank every situational rule.
    pub skill_plan: Vec<SkillUsageRule>,
    /// Gates history retention (the session's `enable_learning`).
    pub record_history: bool,
    pub history_capacity: usize,
}

impl EngineConfig {
    pub fn for_team(team: &Team, record_history: bool) -> Self {
        Self {
            skill_plan: team.skill_plan.clone(),
            record_history,
            ..Self::default()
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            skill_plan: Vec::new(),
            record_history: true,
            history_capacity: history::DEFAULT_HISTORY_CAPACITY,
        }
    }
}

pub struct DecisionEngine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    history: Mutex<DecisionHistory>,
    battle_count: AtomicU32,
}

impl DecisionEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        let history = DecisionHistory::new(config.history_capacity);
        Self {
            config,
            clock,
            history: Mutex::new(history),
            battle_count: AtomicU32::new(0),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Called by the controller when a result screen is handled.
    pub fn record_battle_end(&self) -> u32 {
        self.battle_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn battle_count(&self) -> u32 {
        self.battle_count.load(Ordering::Relaxed)
    }

    /// Zeroes the battle counter and clears the history.
    pub fn reset(&self) {
        self.battle_count.store(0, Ordering::Relaxed);
        self.lock_history().clear();
    }

    /// Snapshot of the history, oldest first.
    pub fn history(&self) -> Vec<DecisionRecord> {
        self.lock_history().to_vec()
    }

    /// A whole turn: best skill, then best NP, then cards. `NoAction`s are dropped.
    pub fn plan_turn(
        &self,
        context: &BattleContext,
        cards: &[CardInfo],
        skills: &[SkillInfo],
    ) -> Vec<Decision> {
        [
            BattleState::SkillSelection,
            BattleState::NpSelection,
            BattleState::CommandSelection,
        ]
        .into_iter()
        .map(|state| self.decide(state, context, cards, skills))
        .filter(|decision| !decision.is_no_action())
        .collect()
    }

    fn try_decide(
        &self,
        state: BattleState,
        context: &BattleContext,
        cards: &[CardInfo],
        skills: &[SkillInfo],
    ) -> Result<Decision, DecisionError> {
        let decision = match state {
            BattleState::CommandSelection => self.decide_cards(context, cards)?,
            BattleState::SkillSelection => self.decide_skill(context, skills)?,
            BattleState::NpSelection => decide_np(context),
            BattleState::QuestSelection => {
                Decision::wait(QUEST_SELECTION_WAIT_MS, "waiting on quest selection")
            }
            BattleState::SupportSelection => {
                Decision::wait(SUPPORT_SELECTION_WAIT_MS, "waiting on support selection")
            }
            BattleState::BattleStart => Decision::wait(BATTLE_START_WAIT_MS, "battle starting"),
            BattleState::BattleResult => Decision::wait(BATTLE_RESULT_WAIT_MS, "battle finished"),
            BattleState::ApRecovery => {
                Decision::recovery(RecoveryAction::HandleApRecovery, "AP depleted")
            }
            BattleState::Error => {
                Decision::recovery(RecoveryAction::ScreenshotAnalysis, "game reported an error")
            }
            BattleState::Unknown => Decision::NoAction,
        };
        Ok(decision)
    }

    fn decide_cards(
        &self,
        context: &BattleContext,
        cards: &[CardInfo],
    ) -> Result<Decision, DecisionError> {
        if cards.is_empty() {
            return Ok(Decision::wait(NO_CARDS_WAIT_MS, "no cards detected"));
        }
        validate_cards(cards)?;

        Ok(match cards::select_cards(cards, context.objective()) {
            Some(pick) => Decision::CardSelection {
                indices: pick.indices,
                reasoning: pick.reasoning,
            },
            None => Decision::wait(NO_CARDS_WAIT_MS, "not enough cards detected"),
        })
    }

    fn decide_skill(
        &self,
        context: &BattleContext,
        skill_list: &[SkillInfo],
    ) -> Result<Decision, DecisionError> {
        if let Some(bad) = skill_list.iter().find(|s| s.slot > 2) {
            return Err(DecisionError::SkillSlot(bad.slot));
        }

        let ranked = skills::rank_skills(context, skill_list, &self.config.skill_plan);
        Ok(match ranked.first() {
            Some(top) => Decision::SkillUsage {
                servant_index: top.servant_index(),
                skill_index: top.skill.slot,
                target_index: top.target,
                reasoning: format!("{} (priority {:.2})", top.reason, top.priority),
            },
            None => Decision::NoAction,
        })
    }

    fn record(&self, state: BattleState, decision: &Decision, started: Instant) {
        if !self.config.record_history {
            return;
        }
        let record = DecisionRecord {
            timestamp: self.clock.now(),
            battle_state: state,
            decision: decision.clone(),
            processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
            battle_count: self.battle_count(),
        };
        self.lock_history().push(record);
    }

    fn lock_history(&self) -> MutexGuard<'_, DecisionHistory> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn decide_np(context: &BattleContext) -> Decision {
    match np::best_np(context) {
        Some(best) => Decision::NpUsage {
            servant_index: best.servant_index,
            reasoning: format!("{} (priority {:.2})", best.reason, best.priority),
        },
        None => Decision::NoAction,
    }
}

impl Decider for DecisionEngine {
    fn decide(
        &self,
        state: BattleState,
        context: &BattleContext,
        cards: &[CardInfo],
        skills: &[SkillInfo],
    ) -> Decision {
        let started = Instant::now();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.try_decide(state, context, cards, skills)
        }));
        let decision = match outcome {
            Ok(Ok(decision)) => decision,
            Ok(Err(err)) => {
                tracing::warn!(%state, error = %err, "decision failed, requesting restart");
                Decision::recovery(RecoveryAction::RestartBattle, err.to_string())
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(%state, %message, "decision panicked, requesting restart");
                Decision::recovery(RecoveryAction::RestartBattle, message)
            }
        };

        tracing::debug!(%state, decision = decision.kind(), reasoning = ?decision.reasoning(), "decided");
        self.record(state, &decision, started);
        decision
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
