//! Error policy: what to do after a failed cycle.

use std::time::Duration;

/// Consecutive failed cycles that end a session.
pub const MAX_CONSECUTIVE_ERRORS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureVerdict {
    /// Sleep, then try another cycle.
    Backoff(Duration),
    /// Stop the loop and put the session into `Error`.
    Abort(String),
    /// Session error budget spent; stop the loop as `Completed`.
    Exhausted(String),
}

/// Failure policy for the automation loop.
///
/// Two independent limits:
/// - `MAX_CONSECUTIVE_ERRORS` in a row (any success resets the streak) → `Error`
/// - `max_session_errors` in total for the session (`max_errors` in the config)
///   → the session ends, but not in `Error`
#[derive(Debug, Clone)]
pub struct ErrorPolicy {
    pub backoff: Duration,
    pub max_session_errors: u32,
}

impl ErrorPolicy {
    pub fn new(backoff: Duration, max_session_errors: u32) -> Self {
        Self {
            backoff,
            max_session_errors,
        }
    }

    /// # Arguments
    /// * `consecutive` - failures in a row, including this one
    /// * `total` - failures this session, including this one
    pub fn on_failure(&self, consecutive: u32, total: u64) -> FailureVerdict {
        if consecutive >= MAX_CONSECUTIVE_ERRORS {
            FailureVerdict::Abort(format!(
                "{consecutive} consecutive failed cycles (limit {MAX_CONSECUTIVE_ERRORS})"
            ))
        } else if total >= u64::from(self.max_session_errors) {
            FailureVerdict::Exhausted(format!(
                "{total} failed cycles this session (limit {})",
                self.max_session_errors
            ))
        } else {
            FailureVerdict::Backoff(self.backoff)
        }
    }
}

impl Default for ErrorPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(5000), 5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::first(1, 1)]
    #[case::second(2, 2)]
    #[case::streak_reset_earlier(2, 4)]
    fn backs_off_below_limits(#[case] consecutive: u32, #[case] total: u64) {
        let policy = ErrorPolicy::default();
        assert_eq!(
            policy.on_failure(consecutive, total),
            FailureVerdict::Backoff(Duration::from_secs(5))
        );
    }

    #[test]
    fn third_consecutive_failure_aborts() {
        let policy = ErrorPolicy::default();
        assert!(matches!(policy.on_failure(3, 3), FailureVerdict::Abort(reason) if reason.contains("consecutive")));
    }

    #[test]
    fn session_cap_exhausts_without_aborting() {
        let policy = ErrorPolicy::new(Duration::from_millis(1), 5);
        assert!(matches!(policy.on_failure(1, 5), FailureVerdict::Exhausted(reason) if reason.contains("this session")));
        assert!(matches!(policy.on_failure(2, 9), FailureVerdict::Exhausted(_)));
    }

    #[test]
    fn streak_wins_over_session_cap() {
        let policy = ErrorPolicy::new(Duration::from_millis(1), 3);
        assert!(matches!(policy.on_failure(3, 3), FailureVerdict::Abort(reason) if reason.contains("consecutive")));
    }

    #[test]
    fn session_cap_above_threshold_does_not_mask_streak() {
        let policy = ErrorPolicy::new(Duration::from_millis(1), 100);
        assert!(matches!(policy.on_failure(3, 3), FailureVerdict::Abort(_)));
        assert!(matches!(policy.on_failure(2, 99), FailureVerdict::Backoff(_)));
    }
}
