//! Skill prioritisation.
//!
//! Each usable skill gets one priority in [0, 1] from the first matching rule:
//!
//! | rule | applies to | priority |
//! |---|---|---|
//! | team plan names this skill for this turn/wave | any | 0.9–1.0 |
//! | turn 1, first skill | servant | 0.8 |
//! | more than two enemies, second skill | servant | 0.7 |
//! | turn 3 or later, third skill | servant | 0.9 |
//! | by slot | master | 0.6 / 0.4 / 0.3 |
//! | otherwise | servant | 0.5 |
//!
//! Skills at or below 0.3 are dropped.

use crate::domain::{BattleContext, SkillInfo, SkillOwner, SkillUsageRule};

pub const DISCARD_THRESHOLD: f32 = 0.3;
const MASTER_SLOT_PRIORITY: [f32; 3] = [0.6, 0.4, 0.3];

#[derive(Debug, Clone, PartialEq)]
pub struct SkillCandidate {
    pub skill: SkillInfo,
    pub target: Option<u8>,
    pub priority: f32,
    pub reason: &'static str,
}

impl SkillCandidate {
    pub fn servant_index(&self) -> Option<u8> {
        match self.skill.owner {
            SkillOwner::Servant(index) => Some(index),
            SkillOwner::Master => None,
        }
    }
}

/// Usable skills above the discard threshold, best first.
///
/// The sort is stable, so equal priorities keep detection order.
pub fn rank_skills(
    context: &BattleContext,
    skills: &[SkillInfo],
    plan: &[SkillUsageRule],
) -> Vec<SkillCandidate> {
    let mut ranked: Vec<SkillCandidate> = skills
        .iter()
        .filter(|skill| is_usable(context, skill))
        .map(|skill| evaluate(context, skill, plan))
        .filter(|candidate| candidate.priority > DISCARD_THRESHOLD)
        .collect();
    ranked.sort_by(|a, b| b.priority.total_cmp(&a.priority));
    ranked
}

fn is_usable(context: &BattleContext, skill: &SkillInfo) -> bool {
    if skill.slot > 2 || skill.cooldown_turns > 0 || context.skill_cooldown(skill.key()) > 0 {
        return false;
    }
    match skill.owner {
        SkillOwner::Servant(index) => context
            .servant(index)
            .is_some_and(|s| s.is_alive && s.skills_available[usize::from(skill.slot)]),
        SkillOwner::Master => true,
    }
}

fn evaluate(context: &BattleContext, skill: &SkillInfo, plan: &[SkillUsageRule]) -> SkillCandidate {
    let turn = context.turn();

    if let Some(rule) = plan
        .iter()
        .find(|rule| rule.matches(skill.key(), turn, context.phase()))
    {
        return SkillCandidate {
            skill: *skill,
            target: rule.target.or_else(|| default_target(context, skill)),
            priority: rule.effective_priority(),
            reason: "scheduled by team plan",
        };
    }

    let (priority, reason) = match skill.owner {
        SkillOwner::Servant(_) => {
            if turn == 1 && skill.slot == 0 {
                (0.8, "opening skill on turn 1")
            } else if context.enemy_count() > 2 && skill.slot == 1 {
                (0.7, "crowd of enemies")
            } else if turn >= 3 && skill.slot == 2 {
                (0.9, "late-battle skill")
            } else {
                (0.5, "available")
            }
        }
        SkillOwner::Master => (MASTER_SLOT_PRIORITY[usize::from(skill.slot)], "master skill"),
    };

    SkillCandidate {
        skill: *skill,
        target: default_target(context, skill),
        priority,
        reason,
    }
}

/// Self for targeted servant skills, weakest living ally for targeted master skills.
fn default_target(context: &BattleContext, skill: &SkillInfo) -> Option<u8> {
    if !skill.needs_target {
        return None;
    }
    match skill.owner {
        SkillOwner::Servant(index) => Some(index),
        SkillOwner::Master => context
            .servant_states()
            .iter()
            .filter(|s| s.is_alive)
            .min_by(|a, b| a.health_percentage.total_cmp(&b.health_percentage))
            .map(|s| s.index),
    }
}
