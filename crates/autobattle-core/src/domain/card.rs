//! Command cards dealt each turn.

use serde::{Deserialize, Serialize};

/// Card colour. `Np` is a noble phantasm card dealt alongside the command cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardType {
    Buster,
    Arts,
    Quick,
    #[serde(rename = "NP")]
    Np,
}

impl CardType {
    /// Bonus added when all three selected cards share this colour.
    pub fn color_chain_bonus(self) -> f32 {
        match self {
            CardType::Buster => 1.3,
            CardType::Arts => 1.5,
            CardType::Quick => 1.2,
            CardType::Np => 2.0,
        }
    }
}

/// A detected command card.
///
/// `index` is the detection order and is unique within one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CardInfo {
    pub index: u8,
    pub card_type: CardType,
    pub servant_index: u8,
    pub effectiveness: f32,
}

impl CardInfo {
    pub fn new(index: u8, card_type: CardType, servant_index: u8, effectiveness: f32) -> Self {
        Self {
            index,
            card_type,
            servant_index,
            effectiveness,
        }
    }
}
