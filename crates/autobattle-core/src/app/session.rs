//! Session state shared between the controller and its loop task.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, watch};

use crate::domain::{AutomationState, AutomationStats};
use crate::ports::Frame;

/// Single source of truth for the session state plus the counters the loop
/// updates.
///
/// # 設計原則
/// - state は `watch` で保持: 読み手はロック不要、変更通知は subscribe で受け取る
/// - 状態遷移は `transition` (compare-and-set) のみ。loop 側が `Stopping` を上書きしない
/// - 非同期ロックは await を跨いで保持しない
pub(crate) struct SessionShared {
    state: watch::Sender<AutomationState>,
    consecutive_errors: AtomicU32,
    turns_completed: AtomicU32,
    stats: Mutex<AutomationStats>,
    last_frame: Mutex<Option<Frame>>,
    window: Mutex<RunWindow>,
}

#[derive(Debug, Default, Clone, Copy)]
struct RunWindow {
    started_at: Option<Instant>,
    ended_at: Option<Instant>,
}

impl SessionShared {
    pub(crate) fn new() -> Self {
        let (state, _) = watch::channel(AutomationState::Idle);
        Self {
            state,
            consecutive_errors: AtomicU32::new(0),
            turns_completed: AtomicU32::new(0),
            stats: Mutex::new(AutomationStats::default()),
            last_frame: Mutex::new(None),
            window: Mutex::new(RunWindow::default()),
        }
    }

    pub(crate) fn state(&self) -> AutomationState {
        *self.state.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<AutomationState> {
        self.state.subscribe()
    }

    pub(crate) fn set_state(&self, to: AutomationState) {
        let from = self.state.send_replace(to);
        if from != to {
            tracing::debug!(%from, %to, "state changed");
        }
    }

    /// Moves to `to` only when the current state is one of `from`.
    pub(crate) fn transition(&self, from: &[AutomationState], to: AutomationState) -> bool {
        let mut previous = None;
        let changed = self.state.send_if_modified(|current| {
            if from.contains(current) {
                previous = Some(*current);
                *current = to;
                true
            } else {
                false
            }
        });
        if let Some(from) = previous {
            tracing::debug!(%from, %to, "state changed");
        }
        changed
    }

    /// Zeroes everything for a new session.
    pub(crate) async fn begin(&self) {
        self.consecutive_errors.store(0, Ordering::Relaxed);
        self.turns_completed.store(0, Ordering::Relaxed);
        *self.stats.lock().await = AutomationStats::default();
        *self.last_frame.lock().await = None;
        *self.window.lock().await = RunWindow {
            started_at: Some(Instant::now()),
            ended_at: None,
        };
    }

    pub(crate) async fn end(&self) {
        let mut window = self.window.lock().await;
        if window.ended_at.is_none() {
            window.ended_at = Some(Instant::now());
        }
    }

    pub(crate) async fn clear_window(&self) {
        *self.window.lock().await = RunWindow::default();
    }

    pub(crate) async fn runtime(&self) -> Duration {
        let window = *self.window.lock().await;
        match window.started_at {
            Some(started) => window.ended_at.unwrap_or_else(Instant::now) - started,
            None => Duration::ZERO,
        }
    }

    pub(crate) fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors.load(Ordering::Relaxed)
    }

    pub(crate) fn record_success(&self) {
        self.consecutive_errors.store(0, Ordering::Relaxed);
    }

    /// Returns `(consecutive, total)` including this failure.
    pub(crate) async fn record_failure(&self) -> (u32, u64) {
        let consecutive = self.consecutive_errors.fetch_add(1, Ordering::Relaxed) + 1;
        let mut stats = self.stats.lock().await;
        stats.errors_encountered += 1;
        (consecutive, stats.errors_encountered)
    }

    pub(crate) fn turn(&self) -> u32 {
        self.turns_completed.load(Ordering::Relaxed) + 1
    }

    pub(crate) fn advance_turn(&self) {
        self.turns_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn reset_turns(&self) {
        self.turns_completed.store(0, Ordering::Relaxed);
    }

    pub(crate) async fn update_stats(&self, f: impl FnOnce(&mut AutomationStats)) {
        f(&mut *self.stats.lock().await);
    }

    pub(crate) async fn stats(&self) -> AutomationStats {
        self.stats.lock().await.clone()
    }

    pub(crate) async fn set_last_frame(&self, frame: Frame) {
        *self.last_frame.lock().await = Some(frame);
    }

    pub(crate) async fn last_frame(&self) -> Option<Frame> {
        self.last_frame.lock().await.clone()
    }
}
