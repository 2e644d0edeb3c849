//! The automation loop: capture → classify → decide → act, until told to stop.
//!
//! # フロー (1 cycle)
//! 1. CapturePort::capture() で frame 取得
//! 2. PerceptionPort::classify() で画面判定
//! 3. 画面ごとに処理 (command selection: perceive → decide → act)
//! 4. 成功なら連続エラーをリセット、失敗なら ErrorPolicy に従う
//!
//! Each cycle runs in its own task so a panic inside it is reported as a
//! failed cycle instead of killing the loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::app::actuator::{ActionOutcome, Actuator};
use crate::app::config::{AutomationConfig, LoopTiming};
use crate::app::retry::{ErrorPolicy, FailureVerdict};
use crate::app::session::SessionShared;
use crate::domain::{
    AutomationState, BattleContext, BattleState, CycleError, Decision, SessionId, Strategy, Team,
};
use crate::engine::{DecisionEngine, panic_message};
use crate::ports::{CapturePort, Decider, Frame, PerceptionPort};

/// Handle to a running loop task.
/// - `request_shutdown` は新しい cycle を始めないよう伝えるだけ
/// - `shutdown_and_join` で実行中の cycle の終了まで待つ
pub(crate) struct LoopHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl LoopHandle {
    pub(crate) fn spawn(automation: AutomationLoop) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let automation = Arc::new(automation);
        let join = tokio::spawn(async move {
            automation.run(shutdown_rx).await;
        });
        Self { shutdown_tx, join }
    }

    pub(crate) fn request_shutdown(&self) {
        // ignore send error: the loop may already have exited
        let _ = self.shutdown_tx.send(true);
    }

    pub(crate) async fn shutdown_and_join(self) {
        self.request_shutdown();
        if let Err(err) = self.join.await {
            tracing::error!(error = %err, "automation loop task failed");
        }
    }
}

/// How a cycle that did not fail ended.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CycleOutcome {
    /// Counts as a success: resets the consecutive error streak.
    Progress,
    /// Unrecognised screen; neither a success nor a failure.
    Neutral,
    /// The session is over.
    Finished(String),
}

pub(crate) struct AutomationLoop {
    pub(crate) session_id: SessionId,
    pub(crate) team: Team,
    pub(crate) config: AutomationConfig,
    pub(crate) timing: LoopTiming,
    pub(crate) policy: ErrorPolicy,
    pub(crate) capture: Arc<dyn CapturePort>,
    pub(crate) perception: Arc<dyn PerceptionPort>,
    pub(crate) actuator: Actuator,
    pub(crate) engine: Arc<DecisionEngine>,
    pub(crate) shared: Arc<SessionShared>,
}

impl AutomationLoop {
    async fn run(self: Arc<Self>, mut shutdown_rx: watch::Receiver<bool>) {
        tracing::info!(session_id = %self.session_id, team = %self.team.name, "automation loop started");

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            match self.shared.state() {
                AutomationState::Running => {}
                AutomationState::Paused => {
                    if sleep_or_shutdown(self.timing.pause_poll, &mut shutdown_rx).await {
                        break;
                    }
                    continue;
                }
                _ => break,
            }

            if let Some(reason) = self.battle_limit_reached().await {
                self.finish(AutomationState::Completed, &reason);
                break;
            }

            match self.spawn_cycle(shutdown_rx.clone()).await {
                Ok(CycleOutcome::Progress) => self.shared.record_success(),
                Ok(CycleOutcome::Neutral) => {}
                Ok(CycleOutcome::Finished(reason)) => {
                    self.shared.record_success();
                    self.finish(AutomationState::Completed, &reason);
                    break;
                }
                Err(err) => {
                    // a cycle cut short by shutdown is not an error
                    if *shutdown_rx.borrow() {
                        tracing::debug!(error = %err, "cycle failed during shutdown");
                        break;
                    }
                    let (consecutive, total) = self.shared.record_failure().await;
                    tracing::warn!(
                        error = %err,
                        kind = ?err.kind(),
                        consecutive,
                        total,
                        "cycle failed"
                    );
                    match self.policy.on_failure(consecutive, total) {
                        FailureVerdict::Backoff(delay) => {
                            if sleep_or_shutdown(delay, &mut shutdown_rx).await {
                                break;
                            }
                        }
                        FailureVerdict::Abort(reason) => {
                            self.finish(AutomationState::Error, &reason);
                            break;
                        }
                        FailureVerdict::Exhausted(reason) => {
                            self.finish(AutomationState::Completed, &reason);
                            break;
                        }
                    }
                }
            }

            if sleep_or_shutdown(self.config.screenshot_interval(), &mut shutdown_rx).await {
                break;
            }
        }

        self.shared.end().await;
        tracing::info!(session_id = %self.session_id, state = %self.shared.state(), "automation loop exited");
    }

    async fn spawn_cycle(
        self: &Arc<Self>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Result<CycleOutcome, CycleError> {
        let this = Arc::clone(self);
        let cycle = tokio::spawn(async move { this.run_cycle(shutdown_rx).await });
        match cycle.await {
            Ok(outcome) => outcome,
            Err(err) if err.is_panic() => {
                Err(CycleError::Panicked(panic_message(err.into_panic().as_ref())))
            }
            Err(err) => Err(CycleError::Panicked(err.to_string())),
        }
    }

    fn finish(&self, to: AutomationState, reason: &str) {
        let moved = self.shared.transition(
            &[AutomationState::Running, AutomationState::Paused],
            to,
        );
        if !moved {
            return;
        }
        match to {
            AutomationState::Error => {
                tracing::error!(session_id = %self.session_id, reason, "automation stopped on errors")
            }
            _ => tracing::info!(session_id = %self.session_id, reason, "automation completed"),
        }
    }

    async fn battle_limit_reached(&self) -> Option<String> {
        let limit = self.config.battle_limit()?;
        let completed = self.shared.stats().await.battles_completed;
        (completed >= limit).then(|| format!("battle limit reached ({completed}/{limit})"))
    }

    async fn run_cycle(
        &self,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> Result<CycleOutcome, CycleError> {
        let frame = self.capture.capture().await?;
        self.shared.set_last_frame(frame.clone()).await;

        let state = self.perception.classify(&frame).await?;
        self.shared
            .update_stats(|stats| stats.screenshots_taken += 1)
            .await;
        tracing::debug!(frame = frame.id, %state, "screen classified");

        match state {
            BattleState::CommandSelection => self.play_turn(&frame).await,
            BattleState::BattleResult => self.finish_battle(&frame).await,
            BattleState::ApRecovery => Ok(CycleOutcome::Finished("AP depleted".to_string())),
            BattleState::QuestSelection
            | BattleState::SupportSelection
            | BattleState::BattleStart => {
                sleep_or_shutdown(self.timing.transition_wait, &mut shutdown_rx).await;
                Ok(CycleOutcome::Progress)
            }
            BattleState::SkillSelection | BattleState::NpSelection => {
                sleep_or_shutdown(self.timing.menu_wait, &mut shutdown_rx).await;
                Ok(CycleOutcome::Progress)
            }
            BattleState::Error => {
                if let Err(err) = self.actuator.dismiss().await {
                    tracing::warn!(error = %err, "failed to dismiss error dialog");
                }
                Err(CycleError::ErrorScreen)
            }
            BattleState::Unknown => {
                sleep_or_shutdown(self.timing.unknown_wait, &mut shutdown_rx).await;
                Ok(CycleOutcome::Neutral)
            }
        }
    }

    async fn play_turn(&self, frame: &Frame) -> Result<CycleOutcome, CycleError> {
        let decisions = tokio::time::timeout(self.config.decision_timeout(), self.perceive_and_decide(frame))
            .await
            .map_err(|_| CycleError::DecisionTimeout(self.config.decision_timeout_ms))??;

        for decision in &decisions {
            tracing::info!(
                kind = decision.kind(),
                reasoning = decision.reasoning().unwrap_or(""),
                "executing decision"
            );
            if self.actuator.execute(decision).await? == ActionOutcome::Executed {
                self.shared
                    .update_stats(|stats| stats.decisions_executed += 1)
                    .await;
            }
            if matches!(decision, Decision::CardSelection { .. }) {
                self.shared.advance_turn();
            }
        }
        Ok(CycleOutcome::Progress)
    }

    async fn perceive_and_decide(&self, frame: &Frame) -> Result<Vec<Decision>, CycleError> {
        let cards = self.perception.detect_cards(frame).await?;
        let skills = self.perception.detect_skills(frame).await?;
        let servants = self.perception.detect_servant_states(frame).await?;
        let info = self.perception.read_battle_info(frame).await?;

        let context = BattleContext::builder()
            .turn(self.shared.turn())
            .phase(info.phase)
            .enemy_count(info.enemy_count)
            .servants(servants)
            .cards(cards.clone())
            .skills(&skills)
            .objective(self.team.objective)
            .build()?;

        Ok(match self.team.strategy {
            Strategy::CardsOnly => vec![self.engine.decide(
                BattleState::CommandSelection,
                &context,
                &cards,
                &skills,
            )],
            Strategy::FullTurn => self.engine.plan_turn(&context, &cards, &skills),
        })
    }

    async fn finish_battle(&self, frame: &Frame) -> Result<CycleOutcome, CycleError> {
        let victory = self.perception.detect_victory(frame).await?;
        self.shared
            .update_stats(|stats| stats.record_battle(victory))
            .await;
        self.shared.reset_turns();
        let battle = self.engine.record_battle_end();
        tracing::info!(battle, victory, "battle finished");

        self.actuator.dismiss().await?;
        Ok(CycleOutcome::Progress)
    }
}

/// Sleeps for `duration` unless shutdown is requested first. Returns `true` on shutdown.
async fn sleep_or_shutdown(duration: Duration, shutdown_rx: &mut watch::Receiver<bool>) -> bool {
    if *shutdown_rx.borrow() {
        return true;
    }
    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        changed = shutdown_rx.changed() => changed.is_err() || *shutdown_rx.borrow(),
    }
}
