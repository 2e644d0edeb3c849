use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use autobattle_core::app::{AutomationConfig, ControllerBuilder, LoopTiming};
use autobattle_core::domain::{
    AutomationState, BattleState, CardInfo, CardType, ControllerError, PortError, ServantState,
    SkillInfo, Strategy, Team,
};
use autobattle_core::impls::{SimulatedDevice, SimulationScript};
use autobattle_core::ports::{
    ActuationPort, BattleInfo, CapturePort, Frame, PerceptionPort, Point,
};
use autobattle_core::{AutomationController, StatusSnapshot};
use chrono::Utc;

const PATIENCE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy)]
enum Step {
    Screen(BattleState),
    CaptureFails,
    Panics,
}

/// Plays `steps` once, then repeats `fallback` forever.
struct ScriptedDevice {
    steps: Mutex<VecDeque<Step>>,
    fallback: Step,
    current: Mutex<BattleState>,
    frames: AtomicU64,
    taps: AtomicU64,
    slow_perception: Option<Duration>,
}

impl ScriptedDevice {
    fn new(steps: impl IntoIterator<Item = Step>, fallback: Step) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            fallback,
            current: Mutex::new(BattleState::Unknown),
            frames: AtomicU64::new(0),
            taps: AtomicU64::new(0),
            slow_perception: None,
        }
    }

    fn repeating(step: Step) -> Self {
        Self::new([], step)
    }

    fn with_slow_perception(mut self, delay: Duration) -> Self {
        self.slow_perception = Some(delay);
        self
    }

    fn taps(&self) -> u64 {
        self.taps.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CapturePort for ScriptedDevice {
    async fn capture(&self) -> Result<Frame, PortError> {
        let step = self.steps.lock().unwrap().pop_front().unwrap_or(self.fallback);
        match step {
            Step::Screen(screen) => {
                *self.current.lock().unwrap() = screen;
                let id = self.frames.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(Frame::empty(id, Utc::now()))
            }
            Step::CaptureFails => Err(PortError::Capture("device offline".into())),
            Step::Panics => panic!("capture driver crashed"),
        }
    }
}

#[async_trait]
impl PerceptionPort for ScriptedDevice {
    async fn classify(&self, _frame: &Frame) -> Result<BattleState, PortError> {
        Ok(*self.current.lock().unwrap())
    }

    async fn detect_cards(&self, _frame: &Frame) -> Result<Vec<CardInfo>, PortError> {
        if let Some(delay) = self.slow_perception {
            tokio::time::sleep(delay).await;
        }
        Ok(vec![
            CardInfo::new(0, CardType::Buster, 0, 1.0),
            CardInfo::new(1, CardType::Buster, 0, 1.0),
            CardInfo::new(2, CardType::Arts, 1, 1.0),
            CardInfo::new(3, CardType::Buster, 0, 1.0),
            CardInfo::new(4, CardType::Quick, 2, 1.0),
        ])
    }

    async fn detect_skills(&self, _frame: &Frame) -> Result<Vec<SkillInfo>, PortError> {
        Ok(vec![SkillInfo::servant(0, 0), SkillInfo::master(0)])
    }

    async fn detect_servant_states(&self, _frame: &Frame) -> Result<Vec<ServantState>, PortError> {
        Ok(vec![
            ServantState::ready(0).with_np_gauge(100),
            ServantState::ready(1),
            ServantState::ready(2),
        ])
    }

    async fn read_battle_info(&self, _frame: &Frame) -> Result<BattleInfo, PortError> {
        Ok(BattleInfo::default())
    }

    async fn detect_victory(&self, _frame: &Frame) -> Result<bool, PortError> {
        Ok(true)
    }
}

#[async_trait]
impl ActuationPort for ScriptedDevice {
    async fn tap(&self, _point: Point) -> Result<(), PortError> {
        self.taps.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn tap_sequence(&self, points: &[Point], _inter_tap_delay: Duration) -> Result<(), PortError> {
        self.taps.fetch_add(points.len() as u64, Ordering::SeqCst);
        Ok(())
    }

    async fn delay(&self, _duration: Duration) -> Result<(), PortError> {
        Ok(())
    }
}

fn fast_config() -> AutomationConfig {
    AutomationConfig {
        screenshot_interval_ms: 1,
        ..AutomationConfig::default()
    }
}

fn controller_with(device: Arc<ScriptedDevice>, config: AutomationConfig) -> AutomationController {
    ControllerBuilder::new()
        .capture(device.clone())
        .perception(device.clone())
        .actuation(device)
        .config(config)
        .timing(LoopTiming::uniform(Duration::from_millis(1)))
        .build()
        .unwrap()
}

async fn ready_controller(device: Arc<ScriptedDevice>, config: AutomationConfig) -> AutomationController {
    let controller = controller_with(device, config);
    controller.initialize().await.unwrap();
    controller
}

async fn wait_for(controller: &AutomationController, target: AutomationState) {
    tokio::time::timeout(PATIENCE, controller.wait_for_state(|s| s == target))
        .await
        .unwrap_or_else(|_| panic!("state never became {target}, stuck at {}", controller.state()));
}

async fn wait_until_status(
    controller: &AutomationController,
    pred: impl Fn(&StatusSnapshot) -> bool,
) -> StatusSnapshot {
    tokio::time::timeout(PATIENCE, async {
        loop {
            let status = controller.status().await;
            if pred(&status) {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("status condition never met")
}

fn farming_team() -> Team {
    Team::new("farming").with_servants(&["caster", "archer", "saber"])
}

#[tokio::test]
async fn start_requires_initialize() {
    let device = Arc::new(ScriptedDevice::repeating(Step::Screen(BattleState::Unknown)));
    let controller = controller_with(device, fast_config());

    let err = controller.start(farming_team()).await.unwrap_err();
    assert!(matches!(err, ControllerError::NotInitialized));
    assert_eq!(controller.state(), AutomationState::Idle);
}

#[tokio::test]
async fn failed_probe_puts_controller_in_error() {
    let device = Arc::new(ScriptedDevice::repeating(Step::CaptureFails));
    let controller = controller_with(device, fast_config());

    let err = controller.initialize().await.unwrap_err();
    assert!(matches!(err, ControllerError::InitializationFailed(msg) if msg.contains("device offline")));
    assert_eq!(controller.state(), AutomationState::Error);
    assert!(!controller.is_initialized());
}

#[tokio::test]
async fn initialize_leaves_controller_idle() {
    let device = Arc::new(ScriptedDevice::repeating(Step::Screen(BattleState::Unknown)));
    let controller = ready_controller(device, fast_config()).await;

    assert_eq!(controller.state(), AutomationState::Idle);
    let status = controller.status().await;
    assert!(status.is_initialized);
    assert!(status.session_id.is_none());
    assert!(status.current_team.is_none());
}

#[tokio::test]
async fn three_consecutive_failures_enter_error() {
    let device = Arc::new(ScriptedDevice::new(
        [Step::Screen(BattleState::Unknown)],
        Step::CaptureFails,
    ));
    let controller = ready_controller(device, fast_config()).await;

    controller.start(farming_team()).await.unwrap();
    wait_for(&controller, AutomationState::Error).await;

    let status = controller.status().await;
    assert_eq!(status.stats.errors_encountered, 3);
    assert_eq!(status.consecutive_errors, 3);
}

#[tokio::test]
async fn success_resets_consecutive_errors() {
    let device = Arc::new(ScriptedDevice::new(
        [
            Step::Screen(BattleState::Unknown),
            Step::CaptureFails,
            Step::CaptureFails,
            Step::Screen(BattleState::QuestSelection),
            Step::CaptureFails,
            Step::CaptureFails,
        ],
        Step::Screen(BattleState::ApRecovery),
    ));
    let controller = ready_controller(device, fast_config()).await;

    controller.start(farming_team()).await.unwrap();
    wait_for(&controller, AutomationState::Completed).await;

    let status = controller.status().await;
    assert_eq!(status.stats.errors_encountered, 4);
    assert_eq!(status.consecutive_errors, 0);
}

#[tokio::test]
async fn session_error_cap_completes_without_error() {
    let device = Arc::new(ScriptedDevice::new(
        [
            Step::Screen(BattleState::Unknown),
            Step::CaptureFails,
            Step::Screen(BattleState::QuestSelection),
            Step::CaptureFails,
        ],
        Step::Screen(BattleState::QuestSelection),
    ));
    let config = AutomationConfig {
        max_errors: 2,
        ..fast_config()
    };
    let controller = ready_controller(device, config).await;

    controller.start(farming_team()).await.unwrap();
    wait_for(&controller, AutomationState::Completed).await;

    let status = controller.status().await;
    assert_eq!(status.stats.errors_encountered, 2);
    assert_eq!(status.consecutive_errors, 1);
}

#[tokio::test]
async fn scattered_failures_never_enter_error() {
    // F F S repeated: eight failures, never three in a row
    let mut steps = vec![Step::Screen(BattleState::Unknown)];
    for _ in 0..4 {
        steps.extend([
            Step::CaptureFails,
            Step::CaptureFails,
            Step::Screen(BattleState::QuestSelection),
        ]);
    }
    let device = Arc::new(ScriptedDevice::new(steps, Step::Screen(BattleState::QuestSelection)));
    let controller = ready_controller(device, fast_config()).await;

    controller.start(farming_team()).await.unwrap();
    let ended = tokio::time::timeout(PATIENCE, controller.wait_for_state(|s| s.is_terminal()))
        .await
        .expect("session never ended");
    assert_eq!(ended, AutomationState::Completed);

    let status = controller.status().await;
    assert_eq!(status.stats.errors_encountered, 5);
    assert!(status.consecutive_errors < 3);
}

#[tokio::test]
async fn unknown_screens_are_neutral() {
    let device = Arc::new(ScriptedDevice::repeating(Step::Screen(BattleState::Unknown)));
    let controller = ready_controller(device, fast_config()).await;

    controller.start(farming_team()).await.unwrap();
    let status = wait_until_status(&controller, |s| s.stats.screenshots_taken >= 5).await;

    assert_eq!(status.state, AutomationState::Running);
    assert_eq!(status.stats.errors_encountered, 0);
    assert_eq!(status.stats.decisions_executed, 0);
    controller.stop().await.unwrap();
}

#[tokio::test]
async fn full_battle_then_ap_depletion_completes() {
    let device = Arc::new(ScriptedDevice::new(
        [
            Step::Screen(BattleState::Unknown),
            Step::Screen(BattleState::QuestSelection),
            Step::Screen(BattleState::SupportSelection),
            Step::Screen(BattleState::BattleStart),
            Step::Screen(BattleState::CommandSelection),
            Step::Screen(BattleState::BattleResult),
        ],
        Step::Screen(BattleState::ApRecovery),
    ));
    let controller = ready_controller(device.clone(), fast_config()).await;

    controller.start(farming_team()).await.unwrap();
    wait_for(&controller, AutomationState::Completed).await;

    let status = controller.status().await;
    assert_eq!(status.stats.battles_completed, 1);
    assert_eq!(status.stats.battles_won, 1);
    assert_eq!(status.stats.decisions_executed, 1);
    assert_eq!(status.stats.screenshots_taken, 6);
    assert_eq!(status.stats.errors_encountered, 0);
    assert!(status.last_frame.is_some());
    // three card taps plus the result dismiss
    assert_eq!(device.taps(), 4);

    let history = controller.decision_history().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].battle_state, BattleState::CommandSelection);
    assert_eq!(history[0].decision.kind(), "card_selection");
}

#[tokio::test]
async fn battle_limit_completes_session() {
    let device = Arc::new(ScriptedDevice::repeating(Step::Screen(BattleState::BattleResult)));
    let config = AutomationConfig {
        max_battles: 2,
        ..fast_config()
    };
    let controller = ready_controller(device, config).await;

    controller.start(farming_team()).await.unwrap();
    wait_for(&controller, AutomationState::Completed).await;

    let status = controller.status().await;
    assert_eq!(status.stats.battles_completed, 2);
    assert_eq!(controller.engine_battle_count().await, 2);
}

#[tokio::test]
async fn error_screen_counts_as_failure_and_is_dismissed() {
    let device = Arc::new(ScriptedDevice::repeating(Step::Screen(BattleState::Error)));
    let controller = ready_controller(device.clone(), fast_config()).await;

    controller.start(farming_team()).await.unwrap();
    wait_for(&controller, AutomationState::Error).await;

    assert_eq!(controller.status().await.stats.errors_encountered, 3);
    assert_eq!(device.taps(), 3);
}

#[tokio::test]
async fn panicking_cycle_is_contained() {
    let device = Arc::new(ScriptedDevice::new(
        [Step::Screen(BattleState::Unknown)],
        Step::Panics,
    ));
    let controller = ready_controller(device, fast_config()).await;

    controller.start(farming_team()).await.unwrap();
    wait_for(&controller, AutomationState::Error).await;

    assert_eq!(controller.status().await.stats.errors_encountered, 3);
    // the controller is still usable
    controller.stop().await.unwrap();
    assert_eq!(controller.state(), AutomationState::Idle);
}

#[tokio::test]
async fn slow_perception_times_out() {
    let device = Arc::new(
        ScriptedDevice::repeating(Step::Screen(BattleState::CommandSelection))
            .with_slow_perception(Duration::from_millis(200)),
    );
    let config = AutomationConfig {
        decision_timeout_ms: 5,
        ..fast_config()
    };
    let controller = ready_controller(device.clone(), config).await;

    controller.start(farming_team()).await.unwrap();
    wait_for(&controller, AutomationState::Error).await;

    let status = controller.status().await;
    assert_eq!(status.stats.errors_encountered, 3);
    assert_eq!(status.stats.decisions_executed, 0);
    assert_eq!(device.taps(), 0);
}

#[tokio::test]
async fn stop_is_idempotent_and_joins_the_loop() {
    let device = Arc::new(ScriptedDevice::repeating(Step::Screen(BattleState::QuestSelection)));
    let controller = ready_controller(device, fast_config()).await;

    controller.stop().await.unwrap();
    assert_eq!(controller.state(), AutomationState::Idle);

    controller.start(farming_team()).await.unwrap();
    assert_eq!(controller.state(), AutomationState::Running);

    controller.stop().await.unwrap();
    assert_eq!(controller.state(), AutomationState::Idle);
    let status = controller.status().await;
    assert!(status.current_team.is_none());
    assert!(status.session_id.is_none());

    controller.stop().await.unwrap();
    assert_eq!(controller.state(), AutomationState::Idle);
}

#[tokio::test]
async fn stop_during_long_wait_returns_promptly() {
    let device = Arc::new(ScriptedDevice::repeating(Step::Screen(BattleState::QuestSelection)));
    let controller = ControllerBuilder::new()
        .capture(device.clone())
        .perception(device.clone())
        .actuation(device)
        .config(fast_config())
        .timing(LoopTiming::uniform(Duration::from_secs(30)))
        .build()
        .unwrap();
    controller.initialize().await.unwrap();

    controller.start(farming_team()).await.unwrap();
    wait_until_status(&controller, |s| s.stats.screenshots_taken >= 1).await;

    tokio::time::timeout(Duration::from_secs(2), controller.stop())
        .await
        .expect("stop waited out the transition delay")
        .unwrap();
    assert_eq!(controller.state(), AutomationState::Idle);
    assert_eq!(controller.status().await.stats.errors_encountered, 0);
}

#[tokio::test]
async fn pause_and_resume() {
    let device = Arc::new(ScriptedDevice::repeating(Step::Screen(BattleState::QuestSelection)));
    let controller = ready_controller(device, fast_config()).await;

    let err = controller.pause().unwrap_err();
    assert!(matches!(
        err,
        ControllerError::InvalidTransition { from: AutomationState::Idle, action: "pause" }
    ));

    controller.start(farming_team()).await.unwrap();
    assert!(controller.resume().is_err());

    controller.pause().unwrap();
    assert_eq!(controller.state(), AutomationState::Paused);

    // let an in-flight cycle drain
    tokio::time::sleep(Duration::from_millis(30)).await;
    let frozen = controller.status().await.stats.screenshots_taken;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(controller.status().await.stats.screenshots_taken, frozen);

    controller.resume().unwrap();
    assert_eq!(controller.state(), AutomationState::Running);
    wait_until_status(&controller, |s| s.stats.screenshots_taken > frozen).await;

    controller.stop().await.unwrap();
}

#[tokio::test]
async fn start_rejects_an_active_session() {
    let device = Arc::new(ScriptedDevice::repeating(Step::Screen(BattleState::Unknown)));
    let controller = ready_controller(device, fast_config()).await;

    controller.start(farming_team()).await.unwrap();
    let err = controller.start(farming_team()).await.unwrap_err();
    assert!(matches!(err, ControllerError::AlreadyActive(AutomationState::Running)));

    controller.pause().unwrap();
    let err = controller.start(farming_team()).await.unwrap_err();
    assert!(matches!(err, ControllerError::AlreadyActive(AutomationState::Paused)));

    controller.stop().await.unwrap();
}

#[tokio::test]
async fn restart_after_completion_resets_stats() {
    let device = Arc::new(ScriptedDevice::new(
        [
            Step::Screen(BattleState::Unknown),
            Step::Screen(BattleState::BattleResult),
            Step::Screen(BattleState::ApRecovery),
        ],
        Step::Screen(BattleState::Unknown),
    ));
    let controller = ready_controller(device, fast_config()).await;

    let first = controller.start(farming_team()).await.unwrap();
    wait_for(&controller, AutomationState::Completed).await;
    assert_eq!(controller.status().await.stats.battles_completed, 1);

    let second = controller.start(farming_team()).await.unwrap();
    assert_ne!(first, second);
    let status = controller.status().await;
    assert_eq!(status.session_id, Some(second));
    assert_eq!(status.stats.battles_completed, 0);

    controller.stop().await.unwrap();
}

#[tokio::test]
async fn reset_clears_tracking_but_not_stats() {
    let device = Arc::new(ScriptedDevice::new(
        [
            Step::Screen(BattleState::Unknown),
            Step::Screen(BattleState::CommandSelection),
            Step::Screen(BattleState::BattleResult),
            Step::Screen(BattleState::ApRecovery),
        ],
        Step::Screen(BattleState::Unknown),
    ));
    let controller = ready_controller(device, fast_config()).await;

    controller.start(farming_team()).await.unwrap();
    wait_for(&controller, AutomationState::Completed).await;
    assert_eq!(controller.engine_battle_count().await, 1);
    assert_eq!(controller.decision_history().await.len(), 1);

    controller.reset().await;

    assert_eq!(controller.engine_battle_count().await, 0);
    assert!(controller.decision_history().await.is_empty());
    let status = controller.status().await;
    assert_eq!(status.stats.battles_completed, 1);
    assert_eq!(status.stats.decisions_executed, 1);
}

#[tokio::test]
async fn learning_disabled_keeps_no_history() {
    let device = Arc::new(ScriptedDevice::new(
        [
            Step::Screen(BattleState::Unknown),
            Step::Screen(BattleState::CommandSelection),
        ],
        Step::Screen(BattleState::ApRecovery),
    ));
    let config = AutomationConfig {
        enable_learning: false,
        ..fast_config()
    };
    let controller = ready_controller(device, config).await;

    controller.start(farming_team()).await.unwrap();
    wait_for(&controller, AutomationState::Completed).await;

    assert_eq!(controller.status().await.stats.decisions_executed, 1);
    assert!(controller.decision_history().await.is_empty());
}

#[tokio::test]
async fn full_turn_strategy_uses_skills_and_np() {
    let device = Arc::new(ScriptedDevice::new(
        [
            Step::Screen(BattleState::Unknown),
            Step::Screen(BattleState::CommandSelection),
        ],
        Step::Screen(BattleState::ApRecovery),
    ));
    let controller = ready_controller(device, fast_config()).await;

    let team = farming_team().with_strategy(Strategy::FullTurn);
    controller.start(team).await.unwrap();
    wait_for(&controller, AutomationState::Completed).await;

    let kinds: Vec<&str> = controller
        .decision_history()
        .await
        .iter()
        .map(|record| record.decision.kind())
        .collect();
    assert_eq!(kinds, vec!["skill_usage", "np_usage", "card_selection"]);
    assert_eq!(controller.status().await.stats.decisions_executed, 3);
}

#[tokio::test]
async fn simulated_device_runs_to_completion() {
    let device = Arc::new(SimulatedDevice::new(SimulationScript {
        turns_per_battle: 2,
        ap_battles: Some(2),
        lose_every: Some(2),
        ..SimulationScript::default()
    }));
    let controller = ControllerBuilder::new()
        .capture(device.clone())
        .perception(device.clone())
        .actuation(device.clone())
        .config(fast_config())
        .timing(LoopTiming::uniform(Duration::from_millis(1)))
        .build()
        .unwrap();
    controller.initialize().await.unwrap();

    let team = farming_team().with_strategy(Strategy::FullTurn);
    controller.start(team).await.unwrap();
    wait_for(&controller, AutomationState::Completed).await;

    let status = controller.status().await;
    assert_eq!(status.stats.battles_completed, 2);
    assert_eq!(status.stats.battles_won, 1);
    assert_eq!(status.stats.battles_lost, 1);
    assert_eq!(status.stats.errors_encountered, 0);
    assert_eq!(device.battles_finished(), 2);

    let json = status.to_json().unwrap();
    assert!(json.contains("\"state\": \"completed\""));
}
