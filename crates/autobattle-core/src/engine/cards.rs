//! Card combination scoring.
//!
//! Every 3-combination of the dealt cards is scored; the best one wins, and
//! ties go to the combination generated first (ascending index order).

use crate::domain::{CardInfo, CardType, Objective};

pub const BRAVE_CHAIN_BONUS: f32 = 1.4;

/// Per-card weight applied to the card type the objective focuses on.
pub const FOCUS_WEIGHT: f32 = 0.5;

/// Per-distinct-type weight for objectives without a focus colour.
pub const BALANCE_WEIGHT: f32 = 0.2;

/// All 3-combinations of `0..n` in lexicographic order.
///
/// Yields C(n, 3) strictly ascending triples; nothing when n < 3.
pub fn combinations(n: usize) -> impl Iterator<Item = [usize; 3]> {
    (0..n).flat_map(move |i| (i + 1..n).flat_map(move |j| (j + 1..n).map(move |k| [i, j, k])))
}

/// Score breakdown for one combination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComboScore {
    /// Servant index when all three cards belong to one servant.
    pub brave: Option<u8>,
    /// Card type when all three cards share it.
    pub color: Option<CardType>,
    /// Effectiveness sum plus brave and colour bonuses.
    pub chain: f32,
    /// Objective weighting.
    pub objective: f32,
    pub total: f32,
}

pub fn score_combination(combo: &[CardInfo; 3], objective: Objective) -> ComboScore {
    let [a, b, c] = combo;
    let mut chain: f32 = combo.iter().map(|card| card.effectiveness).sum();

    let brave = (a.servant_index == b.servant_index && b.servant_index == c.servant_index)
        .then_some(a.servant_index);
    if brave.is_some() {
        chain += BRAVE_CHAIN_BONUS;
    }

    let color = (a.card_type == b.card_type && b.card_type == c.card_type).then_some(a.card_type);
    if let Some(card_type) = color {
        chain += card_type.color_chain_bonus();
    }

    let objective = objective_weight(combo, objective);

    ComboScore {
        brave,
        color,
        chain,
        objective,
        total: chain + objective,
    }
}

fn objective_weight(combo: &[CardInfo; 3], objective: Objective) -> f32 {
    let count = |card_type: CardType| combo.iter().filter(|c| c.card_type == card_type).count();
    match objective {
        Objective::Farming => FOCUS_WEIGHT * count(CardType::Buster) as f32,
        Objective::Challenge => FOCUS_WEIGHT * count(CardType::Arts) as f32,
        Objective::Story | Objective::Event | Objective::Daily => {
            let mut distinct: Vec<CardType> = Vec::with_capacity(3);
            for card in combo {
                if !distinct.contains(&card.card_type) {
                    distinct.push(card.card_type);
                }
            }
            BALANCE_WEIGHT * distinct.len() as f32
        }
    }
}

/// The winning combination.
#[derive(Debug, Clone, PartialEq)]
pub struct CardPick {
    /// Card `index` values, in play order.
    pub indices: [u8; 3],
    pub score: ComboScore,
    pub reasoning: String,
}

/// Picks the best combination, or `None` when fewer than three cards are dealt.
pub fn select_cards(cards: &[CardInfo], objective: Objective) -> Option<CardPick> {
    let mut ordered = cards.to_vec();
    ordered.sort_by_key(|card| card.index);

    let mut best: Option<([CardInfo; 3], ComboScore)> = None;
    for [i, j, k] in combinations(ordered.len()) {
        let combo = [ordered[i], ordered[j], ordered[k]];
        let score = score_combination(&combo, objective);
        // strict improvement only: the first generated combination wins ties
        if best.as_ref().is_none_or(|(_, top)| score.total > top.total) {
            best = Some((combo, score));
        }
    }

    best.map(|(combo, score)| CardPick {
        indices: [combo[0].index, combo[1].index, combo[2].index],
        reasoning: reasoning(&score, objective),
        score,
    })
}

fn reasoning(score: &ComboScore, objective: Objective) -> String {
    let mut parts = Vec::with_capacity(3);
    if let Some(servant) = score.brave {
        parts.push(format!("Brave chain (servant {servant})"));
    }
    if let Some(card_type) = score.color {
        parts.push(format!("{card_type:?} chain"));
    }
    if score.objective > 0.0 {
        parts.push(match objective {
            Objective::Farming => "Buster focus for farming".to_string(),
            Objective::Challenge => "Arts focus for challenge".to_string(),
            Objective::Story | Objective::Event | Objective::Daily => {
                "Balanced card mix".to_string()
            }
        });
    }
    if parts.is_empty() {
        parts.push("No bonus".to_string());
    }
    format!("{} (score {:.2})", parts.join(" + "), score.total)
}
