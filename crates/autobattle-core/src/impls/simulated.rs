//! SimulatedDevice - 開発用の疑似ゲーム端末
//!
//! # 学習ポイント
//! - 1 つの構造体で 3 つの port (capture / perception / actuation) を実装
//! - 画面遷移はタップに反応する (カード 3 枚で次のターン、結果画面は dismiss で次のバトル)
//! - 乱数は seed 固定の StdRng なので、同じ script なら同じ手札が出る
//!
//! # 画面遷移
//! QuestSelection → SupportSelection → BattleStart → CommandSelection × turns
//! → BattleResult → (AP 切れなら ApRecovery、そうでなければ QuestSelection)

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::domain::{
    BattleState, CardInfo, CardType, PortError, ServantState, SkillInfo, SkillKey, SkillOwner,
};
use crate::ports::{
    ActuationPort, BattleInfo, CapturePort, Clock, Frame, PerceptionPort, Point, ScreenLayout,
    SystemClock,
};

const SCREEN_WIDTH: u32 = 1920;
const SCREEN_HEIGHT: u32 = 1080;
const NP_CHARGE_PER_TURN: u8 = 35;
const DAMAGE_PER_TURN: f32 = 0.12;
const SKILL_COOLDOWN: u32 = 3;

/// Shape of the simulated quest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationScript {
    /// Command turns before each battle ends.
    pub turns_per_battle: u32,
    /// AP runs out after this many battles; `None` never runs out.
    pub ap_battles: Option<u32>,
    /// Every n-th battle is lost.
    pub lose_every: Option<u32>,
    pub seed: u64,
    /// Multiplier applied to actuation delays; 0.0 makes gestures instant.
    pub time_scale: f64,
}

impl Default for SimulationScript {
    fn default() -> Self {
        Self {
            turns_per_battle: 3,
            ap_battles: Some(3),
            lose_every: None,
            seed: 7,
            time_scale: 0.0,
        }
    }
}

struct SimState {
    screen: BattleState,
    /// Screen shown in the last captured frame.
    shown: BattleState,
    frame_id: u64,
    battles: u32,
    turn: u32,
    hand: Vec<CardInfo>,
    servants: [ServantState; 3],
    cooldowns: Vec<(SkillKey, u32)>,
    taps: u64,
    rng: StdRng,
}

impl SimState {
    fn new(seed: u64) -> Self {
        Self {
            screen: BattleState::QuestSelection,
            shown: BattleState::QuestSelection,
            frame_id: 0,
            battles: 0,
            turn: 0,
            hand: Vec::new(),
            servants: fresh_party(),
            cooldowns: Vec::new(),
            taps: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn deal(&mut self) {
        const TYPES: [CardType; 3] = [CardType::Buster, CardType::Arts, CardType::Quick];
        self.hand = (0..5u8)
            .map(|index| {
                let card_type = TYPES[self.rng.gen_range(0..TYPES.len())];
                let servant = self.rng.gen_range(0..3u8);
                let effectiveness = self.rng.gen_range(0.8f32..1.2);
                CardInfo::new(index, card_type, servant, effectiveness)
            })
            .collect();
    }

    fn begin_battle(&mut self) {
        self.turn = 1;
        self.servants = fresh_party();
        self.cooldowns.clear();
        self.deal();
        self.screen = BattleState::CommandSelection;
    }

    fn end_turn(&mut self, turns_per_battle: u32) {
        for servant in &mut self.servants {
            servant.np_gauge = servant.np_gauge.saturating_add(NP_CHARGE_PER_TURN).min(100);
            servant.health_percentage = (servant.health_percentage - DAMAGE_PER_TURN).max(0.05);
        }
        for (_, turns) in &mut self.cooldowns {
            *turns = turns.saturating_sub(1);
        }
        self.cooldowns.retain(|(_, turns)| *turns > 0);

        if self.turn >= turns_per_battle {
            self.screen = BattleState::BattleResult;
        } else {
            self.turn += 1;
            self.deal();
        }
    }

    fn cooldown(&self, key: SkillKey) -> u32 {
        self.cooldowns
            .iter()
            .find(|(k, _)| *k == key)
            .map_or(0, |(_, turns)| *turns)
    }
}

fn fresh_party() -> [ServantState; 3] {
    [ServantState::ready(0), ServantState::ready(1), ServantState::ready(2)]
}

/// Scripted stand-in for a real device: screen capture, recognition and
/// input injection in one.
pub struct SimulatedDevice {
    script: SimulationScript,
    layout: ScreenLayout,
    clock: Arc<dyn Clock>,
    state: Mutex<SimState>,
}

impl SimulatedDevice {
    pub fn new(script: SimulationScript) -> Self {
        Self::with_clock(script, Arc::new(SystemClock))
    }

    pub fn with_clock(script: SimulationScript, clock: Arc<dyn Clock>) -> Self {
        let state = SimState::new(script.seed);
        Self {
            script,
            layout: ScreenLayout::default(),
            clock,
            state: Mutex::new(state),
        }
    }

    pub fn script(&self) -> &SimulationScript {
        &self.script
    }

    /// Battles whose result screen has been dismissed.
    pub fn battles_finished(&self) -> u32 {
        self.lock().battles
    }

    pub fn taps(&self) -> u64 {
        self.lock().taps
    }

    pub fn screen(&self) -> BattleState {
        self.lock().screen
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn on_tap(&self, state: &mut SimState, point: Point) {
        state.taps += 1;
        if point == self.layout.dismiss && state.screen == BattleState::BattleResult {
            state.battles += 1;
            let out_of_ap = self
                .script
                .ap_battles
                .is_some_and(|limit| state.battles >= limit);
            state.screen = if out_of_ap {
                BattleState::ApRecovery
            } else {
                BattleState::QuestSelection
            };
            return;
        }
        if state.screen != BattleState::CommandSelection {
            return;
        }
        if let Some(servant) = self.layout.np_slots.iter().position(|p| *p == point) {
            state.servants[servant].np_gauge = 0;
            return;
        }
        for (servant, row) in self.layout.skill_slots.iter().enumerate() {
            if let Some(slot) = row.iter().position(|p| *p == point) {
                let key = SkillKey::servant(servant as u8, slot as u8);
                state.cooldowns.push((key, SKILL_COOLDOWN));
                return;
            }
        }
        if let Some(slot) = self.layout.master_skill_slots.iter().position(|p| *p == point) {
            state.cooldowns.push((SkillKey::master(slot as u8), SKILL_COOLDOWN));
        }
    }
}

#[async_trait]
impl CapturePort for SimulatedDevice {
    async fn capture(&self) -> Result<Frame, PortError> {
        let mut state = self.lock();
        state.frame_id += 1;
        let screen = state.screen;
        state.shown = screen;
        match screen {
            BattleState::QuestSelection => state.screen = BattleState::SupportSelection,
            BattleState::SupportSelection => state.screen = BattleState::BattleStart,
            BattleState::BattleStart => state.begin_battle(),
            _ => {}
        }
        Ok(Frame::new(
            state.frame_id,
            self.clock.now(),
            SCREEN_WIDTH,
            SCREEN_HEIGHT,
            Arc::from(Vec::new()),
        ))
    }
}

#[async_trait]
impl PerceptionPort for SimulatedDevice {
    async fn classify(&self, _frame: &Frame) -> Result<BattleState, PortError> {
        Ok(self.lock().shown)
    }

    async fn detect_cards(&self, _frame: &Frame) -> Result<Vec<CardInfo>, PortError> {
        Ok(self.lock().hand.clone())
    }

    async fn detect_skills(&self, _frame: &Frame) -> Result<Vec<SkillInfo>, PortError> {
        let state = self.lock();
        let owners = (0..3u8).map(SkillOwner::Servant).chain([SkillOwner::Master]);
        Ok(owners
            .flat_map(|owner| (0..3u8).map(move |slot| SkillKey { owner, slot }))
            .map(|key| SkillInfo {
                owner: key.owner,
                slot: key.slot,
                cooldown_turns: state.cooldown(key),
                needs_target: key.owner == SkillOwner::Master && key.slot == 1,
            })
            .collect())
    }

    async fn detect_servant_states(&self, _frame: &Frame) -> Result<Vec<ServantState>, PortError> {
        Ok(self.lock().servants.to_vec())
    }

    async fn read_battle_info(&self, _frame: &Frame) -> Result<BattleInfo, PortError> {
        let state = self.lock();
        let phase = state.turn.clamp(1, 3);
        Ok(BattleInfo {
            phase,
            enemy_count: if phase < 3 { 3 } else { 1 },
        })
    }

    async fn detect_victory(&self, _frame: &Frame) -> Result<bool, PortError> {
        let battle = self.lock().battles + 1;
        Ok(self.script.lose_every.is_none_or(|n| n == 0 || battle % n != 0))
    }
}

#[async_trait]
impl ActuationPort for SimulatedDevice {
    async fn tap(&self, point: Point) -> Result<(), PortError> {
        let mut state = self.lock();
        self.on_tap(&mut state, point);
        Ok(())
    }

    async fn tap_sequence(&self, points: &[Point], inter_tap_delay: Duration) -> Result<(), PortError> {
        let is_card_pick = points.len() == 3 && points.iter().all(|p| self.layout.card_slots.contains(p));
        {
            let mut state = self.lock();
            state.taps += points.len() as u64;
            if is_card_pick && state.screen == BattleState::CommandSelection {
                state.end_turn(self.script.turns_per_battle);
            }
        }
        self.delay(inter_tap_delay * 2).await
    }

    async fn delay(&self, duration: Duration) -> Result<(), PortError> {
        if self.script.time_scale > 0.0 {
            tokio::time::sleep(duration.mul_f64(self.script.time_scale)).await;
        }
        Ok(())
    }

    fn layout(&self) -> ScreenLayout {
        self.layout.clone()
    }
}
