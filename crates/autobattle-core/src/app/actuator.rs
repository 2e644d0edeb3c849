//! Actuator - turns a `Decision` into gestures on the actuation port.
//!
//! Every delay goes through `ActuationPort::delay` (or the inter-tap delay of
//! `tap_sequence`), so a fake port can make gestures instant in tests.

use std::sync::Arc;
use std::time::Duration;

use crate::app::pacing::Pacer;
use crate::domain::{Decision, PortError, RecoveryAction};
use crate::ports::{ActuationPort, Point, ScreenLayout};

pub const INTER_TAP_DELAY: Duration = Duration::from_millis(200);
pub const MASTER_MENU_DELAY: Duration = Duration::from_millis(500);
pub const TARGET_DELAY: Duration = Duration::from_millis(300);
pub const AP_RECOVERY_DELAY: Duration = Duration::from_millis(1000);
pub const RESTART_BATTLE_DELAY: Duration = Duration::from_millis(3000);
pub const SCREENSHOT_ANALYSIS_DELAY: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Executed,
    /// Nothing was sent: `NoAction`, or recovery while recovery is disabled.
    Skipped,
}

pub struct Actuator {
    port: Arc<dyn ActuationPort>,
    layout: ScreenLayout,
    pacer: Pacer,
    enable_recovery: bool,
}

impl Actuator {
    pub fn new(port: Arc<dyn ActuationPort>, pacer: Pacer, enable_recovery: bool) -> Self {
        let layout = port.layout();
        Self {
            port,
            layout,
            pacer,
            enable_recovery,
        }
    }

    pub async fn execute(&self, decision: &Decision) -> Result<ActionOutcome, PortError> {
        match decision {
            Decision::CardSelection { indices, .. } => {
                let points = indices
                    .iter()
                    .map(|&i| slot(self.layout.card_slot(i), "card", i))
                    .collect::<Result<Vec<Point>, PortError>>()?;
                self.port
                    .tap_sequence(&points, self.pacer.pace(INTER_TAP_DELAY))
                    .await?;
            }
            Decision::SkillUsage {
                servant_index,
                skill_index,
                target_index,
                ..
            } => {
                let point = match servant_index {
                    Some(servant) => slot(
                        self.layout.skill_slot(*servant, *skill_index),
                        "skill",
                        *skill_index,
                    )?,
                    None => {
                        self.port.tap(self.layout.master_menu).await?;
                        self.pause(MASTER_MENU_DELAY).await?;
                        slot(
                            self.layout.master_skill_slot(*skill_index),
                            "master skill",
                            *skill_index,
                        )?
                    }
                };
                self.port.tap(point).await?;
                if let Some(target) = target_index {
                    let target_point = slot(self.layout.target_slot(*target), "target", *target)?;
                    self.pause(TARGET_DELAY).await?;
                    self.port.tap(target_point).await?;
                }
            }
            Decision::NpUsage { servant_index, .. } => {
                let point = slot(self.layout.np_slot(*servant_index), "NP", *servant_index)?;
                self.port.tap(point).await?;
            }
            Decision::Wait { duration_ms, .. } => {
                self.pause(Duration::from_millis(*duration_ms)).await?;
            }
            Decision::ErrorRecovery { action, reasoning } => {
                if !self.enable_recovery {
                    tracing::info!(%action, reasoning = %reasoning, "recovery disabled, skipping");
                    return Ok(ActionOutcome::Skipped);
                }
                self.recover(*action).await?;
            }
            Decision::NoAction => return Ok(ActionOutcome::Skipped),
        }
        Ok(ActionOutcome::Executed)
    }

    /// Taps through a result or error dialog.
    pub async fn dismiss(&self) -> Result<(), PortError> {
        self.port.tap(self.layout.dismiss).await
    }

    async fn recover(&self, action: RecoveryAction) -> Result<(), PortError> {
        tracing::info!(%action, "running recovery routine");
        match action {
            RecoveryAction::HandleApRecovery => {
                self.port.tap(self.layout.ap_dialog_close).await?;
                self.pause(AP_RECOVERY_DELAY).await
            }
            RecoveryAction::RestartBattle => {
                self.port.tap(self.layout.retreat).await?;
                self.pause(RESTART_BATTLE_DELAY).await
            }
            RecoveryAction::ScreenshotAnalysis => self.pause(SCREENSHOT_ANALYSIS_DELAY).await,
        }
    }

    async fn pause(&self, base: Duration) -> Result<(), PortError> {
        self.port.delay(self.pacer.pace(base)).await
    }
}

fn slot(point: Option<Point>, what: &str, index: u8) -> Result<Point, PortError> {
    point.ok_or_else(|| PortError::Actuation(format!("no {what} slot for index {index}")))
}
