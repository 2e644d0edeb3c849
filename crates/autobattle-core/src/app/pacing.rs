//! Human-like timing: random jitter on actuation delays.

use std::time::Duration;

use rand::Rng;

pub const MAX_JITTER: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, Copy)]
pub struct Pacer {
    jitter: Option<Duration>,
}

impl Pacer {
    pub fn new(human_like: bool) -> Self {
        Self {
            jitter: human_like.then_some(MAX_JITTER),
        }
    }

    /// `base` plus 0..=150ms when human-like timing is on; `base` otherwise.
    pub fn pace(&self, base: Duration) -> Duration {
        match self.jitter {
            Some(max) => {
                let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
                base + Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
            }
            None => base,
        }
    }
}
