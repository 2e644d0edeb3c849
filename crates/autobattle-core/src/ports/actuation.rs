//! ActuationPort - physical input (taps, delays).
//!
//! Target coordinates are a UI layout concern owned by the implementation;
//! the controller asks the port for its `ScreenLayout` and taps the points it names.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::PortError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Tap targets on the battle screens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenLayout {
    pub card_slots: [Point; 5],
    pub np_slots: [Point; 3],
    /// `[servant][skill]`
    pub skill_slots: [[Point; 3]; 3],
    pub master_menu: Point,
    pub master_skill_slots: [Point; 3],
    pub target_slots: [Point; 3],
    pub dismiss: Point,
    pub ap_dialog_close: Point,
    pub retreat: Point,
}

impl ScreenLayout {
    pub fn card_slot(&self, index: u8) -> Option<Point> {
        self.card_slots.get(usize::from(index)).copied()
    }

    pub fn np_slot(&self, servant: u8) -> Option<Point> {
        self.np_slots.get(usize::from(servant)).copied()
    }

    pub fn skill_slot(&self, servant: u8, skill: u8) -> Option<Point> {
        self.skill_slots
            .get(usize::from(servant))
            .and_then(|row| row.get(usize::from(skill)))
            .copied()
    }

    pub fn master_skill_slot(&self, skill: u8) -> Option<Point> {
        self.master_skill_slots.get(usize::from(skill)).copied()
    }

    pub fn target_slot(&self, servant: u8) -> Option<Point> {
        self.target_slots.get(usize::from(servant)).copied()
    }
}

impl Default for ScreenLayout {
    /// Reference 1920x1080 landscape layout.
    fn default() -> Self {
        Self {
            card_slots: [
                Point::new(190, 800),
                Point::new(580, 800),
                Point::new(960, 800),
                Point::new(1340, 800),
                Point::new(1730, 800),
            ],
            np_slots: [Point::new(620, 300), Point::new(960, 300), Point::new(1300, 300)],
            skill_slots: [
                [Point::new(100, 880), Point::new(230, 880), Point::new(360, 880)],
                [Point::new(580, 880), Point::new(710, 880), Point::new(840, 880)],
                [Point::new(1060, 880), Point::new(1190, 880), Point::new(1320, 880)],
            ],
            master_menu: Point::new(1800, 460),
            master_skill_slots: [Point::new(1360, 460), Point::new(1500, 460), Point::new(1640, 460)],
            target_slots: [Point::new(490, 700), Point::new(960, 700), Point::new(1430, 700)],
            dismiss: Point::new(960, 980),
            ap_dialog_close: Point::new(960, 920),
            retreat: Point::new(1800, 960),
        }
    }
}

#[async_trait]
pub trait ActuationPort: Send + Sync {
    async fn tap(&self, point: Point) -> Result<(), PortError>;

    async fn tap_sequence(&self, points: &[Point], inter_tap_delay: Duration) -> Result<(), PortError>;

    async fn delay(&self, duration: Duration) -> Result<(), PortError>;

    fn layout(&self) -> ScreenLayout {
        ScreenLayout::default()
    }
}
