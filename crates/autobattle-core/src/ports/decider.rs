//! Decider port - screen + battle snapshot in, one Decision out.

use crate::domain::{BattleContext, BattleState, CardInfo, Decision, SkillInfo};

/// Decider chooses the next action for a screen.
///
/// # 設計原則
/// - Pure with respect to its inputs: the same arguments always give the same decision.
/// - Never fails: internal problems come back as `Decision::ErrorRecovery`.
/// - Executing the decision is the controller's job, not the decider's.
pub trait Decider: Send + Sync {
    fn decide(
        &self,
        state: BattleState,
        context: &BattleContext,
        cards: &[CardInfo],
        skills: &[SkillInfo],
    ) -> Decision;
}
