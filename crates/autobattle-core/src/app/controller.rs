//! AutomationController - lifecycle of automation sessions.
//!
//! # 設計原則
//! - 状態は `SessionShared` の watch が唯一の真実
//! - start / stop / initialize は `lifecycle` ロックで直列化する
//! - pause / resume / status はロックを待たない (loop の cycle 中でも即応)
//! - 戻った時点で状態遷移は完了している (stop は loop の終了まで待つ)

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, watch};

use crate::app::actuator::Actuator;
use crate::app::config::{AutomationConfig, LoopTiming};
use crate::app::pacing::Pacer;
use crate::app::retry::ErrorPolicy;
use crate::app::session::SessionShared;
use crate::app::status::StatusSnapshot;
use crate::app::worker::{AutomationLoop, LoopHandle};
use crate::domain::{AutomationState, ControllerError, SessionId, Team};
use crate::engine::{DecisionEngine, DecisionRecord, EngineConfig};
use crate::ports::{ActuationPort, CapturePort, Clock, PerceptionPort, SessionIdGenerator};

/// The team and engine of the current (or last finished) session.
struct ActiveSession {
    id: SessionId,
    team: Team,
    engine: Arc<DecisionEngine>,
}

pub struct AutomationController {
    config: AutomationConfig,
    timing: LoopTiming,
    capture: Arc<dyn CapturePort>,
    perception: Arc<dyn PerceptionPort>,
    actuation: Arc<dyn ActuationPort>,
    clock: Arc<dyn Clock>,
    id_generator: Arc<dyn SessionIdGenerator>,
    shared: Arc<SessionShared>,
    initialized: AtomicBool,
    lifecycle: Mutex<Option<LoopHandle>>,
    session: Mutex<Option<ActiveSession>>,
}

impl AutomationController {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        config: AutomationConfig,
        timing: LoopTiming,
        capture: Arc<dyn CapturePort>,
        perception: Arc<dyn PerceptionPort>,
        actuation: Arc<dyn ActuationPort>,
        clock: Arc<dyn Clock>,
        id_generator: Arc<dyn SessionIdGenerator>,
    ) -> Self {
        Self {
            config,
            timing,
            capture,
            perception,
            actuation,
            clock,
            id_generator,
            shared: Arc::new(SessionShared::new()),
            initialized: AtomicBool::new(false),
            lifecycle: Mutex::new(None),
            session: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &AutomationConfig {
        &self.config
    }

    pub fn state(&self) -> AutomationState {
        self.shared.state()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// State change notifications.
    pub fn subscribe(&self) -> watch::Receiver<AutomationState> {
        self.shared.subscribe()
    }

    /// Validates the configuration and probes the capture port once.
    ///
    /// Idle → Initializing → Idle on success, → Error on failure. Also allowed
    /// after a session ended in `Error` or `Completed`.
    pub async fn initialize(&self) -> Result<(), ControllerError> {
        let mut slot = self.lifecycle.lock().await;
        let current = self.state();
        if !current.can_start() {
            return Err(ControllerError::InvalidTransition {
                from: current,
                action: "initialize",
            });
        }

        if let Some(finished) = slot.take() {
            finished.shutdown_and_join().await;
        }
        *self.session.lock().await = None;
        self.shared.clear_window().await;

        self.shared.set_state(AutomationState::Initializing);
        match self.probe().await {
            Ok(()) => {
                self.initialized.store(true, Ordering::Release);
                self.shared.set_state(AutomationState::Idle);
                tracing::info!("controller initialized");
                Ok(())
            }
            Err(err) => {
                self.initialized.store(false, Ordering::Release);
                self.shared.set_state(AutomationState::Error);
                tracing::error!(error = %err, "initialization failed");
                Err(err)
            }
        }
    }

    async fn probe(&self) -> Result<(), ControllerError> {
        self.config.validate()?;
        let frame = self
            .capture
            .capture()
            .await
            .map_err(|err| ControllerError::InitializationFailed(err.to_string()))?;
        tracing::debug!(frame = frame.id, width = frame.width, height = frame.height, "capture probe ok");
        Ok(())
    }

    /// Starts a new session for `team` and returns its id.
    ///
    /// Stats, the consecutive error count and the turn counter are reset; the
    /// loop task is running when this returns.
    pub async fn start(&self, team: Team) -> Result<SessionId, ControllerError> {
        let mut slot = self.lifecycle.lock().await;
        if !self.is_initialized() {
            return Err(ControllerError::NotInitialized);
        }
        let current = self.state();
        if !current.can_start() {
            return Err(ControllerError::AlreadyActive(current));
        }

        // reap the loop of a session that ended on its own
        if let Some(finished) = slot.take() {
            finished.shutdown_and_join().await;
        }

        let engine = Arc::new(DecisionEngine::with_clock(
            EngineConfig::for_team(&team, self.config.enable_learning),
            Arc::clone(&self.clock),
        ));
        let id = self.id_generator.generate_session_id();

        self.shared.begin().await;
        *self.session.lock().await = Some(ActiveSession {
            id,
            team: team.clone(),
            engine: Arc::clone(&engine),
        });
        self.shared.set_state(AutomationState::Running);

        let automation = AutomationLoop {
            session_id: id,
            team,
            config: self.config.clone(),
            timing: self.timing.clone(),
            policy: ErrorPolicy::new(self.timing.error_backoff, self.config.max_errors),
            capture: Arc::clone(&self.capture),
            perception: Arc::clone(&self.perception),
            actuator: Actuator::new(
                Arc::clone(&self.actuation),
                Pacer::new(self.config.human_like_timing),
                self.config.enable_recovery,
            ),
            engine,
            shared: Arc::clone(&self.shared),
        };
        *slot = Some(LoopHandle::spawn(automation));

        tracing::info!(session_id = %id, "automation started");
        Ok(id)
    }

    /// Running → Paused. The in-flight cycle finishes first.
    pub fn pause(&self) -> Result<(), ControllerError> {
        self.move_state(AutomationState::Running, AutomationState::Paused, "pause")
    }

    /// Paused → Running.
    pub fn resume(&self) -> Result<(), ControllerError> {
        self.move_state(AutomationState::Paused, AutomationState::Running, "resume")
    }

    fn move_state(
        &self,
        from: AutomationState,
        to: AutomationState,
        action: &'static str,
    ) -> Result<(), ControllerError> {
        if self.shared.transition(&[from], to) {
            tracing::info!(state = %to, "automation {action}d");
            Ok(())
        } else {
            Err(ControllerError::InvalidTransition {
                from: self.state(),
                action,
            })
        }
    }

    /// Stops the session and waits for the loop to exit; the state is `Idle`
    /// on return. No-op when already idle.
    pub async fn stop(&self) -> Result<(), ControllerError> {
        let mut slot = self.lifecycle.lock().await;
        if self.state() == AutomationState::Idle && slot.is_none() {
            return Ok(());
        }

        self.shared.set_state(AutomationState::Stopping);
        if let Some(handle) = slot.take() {
            handle.shutdown_and_join().await;
        }

        *self.session.lock().await = None;
        self.shared.clear_window().await;
        self.shared.set_state(AutomationState::Idle);
        tracing::info!("automation stopped");
        Ok(())
    }

    /// Zeroes the turn counter and the engine's battle counter and history.
    /// Session stats are left alone.
    pub async fn reset(&self) {
        self.shared.reset_turns();
        if let Some(session) = self.session.lock().await.as_ref() {
            session.engine.reset();
        }
        tracing::debug!("battle tracking reset");
    }

    pub async fn status(&self) -> StatusSnapshot {
        let (session_id, current_team) = match self.session.lock().await.as_ref() {
            Some(session) => (Some(session.id), Some(session.team.clone())),
            None => (None, None),
        };
        let runtime = self.shared.runtime().await;
        StatusSnapshot {
            session_id,
            state: self.state(),
            is_initialized: self.is_initialized(),
            current_team,
            runtime_ms: u64::try_from(runtime.as_millis()).unwrap_or(u64::MAX),
            stats: self.shared.stats().await.snapshot(runtime),
            consecutive_errors: self.shared.consecutive_errors(),
            last_frame: self.shared.last_frame().await.map(|frame| frame.info()),
        }
    }

    /// Decisions of the current session, oldest first. Empty with
    /// `enable_learning = false` or no session.
    pub async fn decision_history(&self) -> Vec<DecisionRecord> {
        match self.session.lock().await.as_ref() {
            Some(session) => session.engine.history(),
            None => Vec::new(),
        }
    }

    /// Battles the engine has counted since the last `reset()`.
    pub async fn engine_battle_count(&self) -> u32 {
        match self.session.lock().await.as_ref() {
            Some(session) => session.engine.battle_count(),
            None => 0,
        }
    }

    /// Waits until the state satisfies `f`, returning the state that did.
    pub async fn wait_for_state(&self, f: impl Fn(AutomationState) -> bool) -> AutomationState {
        let mut rx = self.subscribe();
        match rx.wait_for(|state| f(*state)).await {
            Ok(state) => *state,
            // the sender lives as long as `self`
            Err(_) => self.state(),
        }
    }
}

impl Drop for AutomationController {
    fn drop(&mut self) {
        if let Some(handle) = self.lifecycle.get_mut().as_ref() {
            handle.request_shutdown();
        }
    }
}
