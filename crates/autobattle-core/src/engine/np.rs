//! Noble phantasm prioritisation.

use crate::domain::{BattleContext, Objective};

pub const DISCARD_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NpCandidate {
    pub servant_index: u8,
    pub priority: f32,
    pub reason: &'static str,
}

/// The highest-priority ready NP. Ties keep the lower servant index.
pub fn best_np(context: &BattleContext) -> Option<NpCandidate> {
    let mut best: Option<NpCandidate> = None;
    for candidate in candidates(context) {
        if best.is_none_or(|top| candidate.priority > top.priority) {
            best = Some(candidate);
        }
    }
    best
}

/// Every servant with a full gauge, scored; low priorities already dropped.
pub fn candidates(context: &BattleContext) -> impl Iterator<Item = NpCandidate> + '_ {
    let gauges = context.np_gauges();
    context
        .servant_states()
        .iter()
        .zip(gauges)
        .filter(|(servant, gauge)| servant.is_alive && *gauge >= 100)
        .map(move |(servant, _)| {
            let (priority, reason) = if servant.health_percentage < 0.3 {
                (1.0, "emergency: servant at low health")
            } else if context.enemy_count() >= 3 {
                (0.9, "AoE against 3+ enemies")
            } else if context.turn() >= 3 {
                (0.8, "late turn")
            } else if context.objective() == Objective::Farming {
                (0.7, "farming clear")
            } else {
                (0.6, "NP ready")
            };
            NpCandidate {
                servant_index: servant.index,
                priority,
                reason,
            }
        })
        .filter(|candidate| candidate.priority > DISCARD_THRESHOLD)
}
