//! SessionIdGenerator port - id generation.
//!
//! Abstracted behind a trait so tests can pin the timestamp half of the id.

use std::sync::Arc;

use ulid::Ulid;

use crate::domain::SessionId;
use crate::ports::Clock;

pub trait SessionIdGenerator: Send + Sync {
    fn generate_session_id(&self) -> SessionId;
}

/// ULID generator: timestamp from the clock, random tail.
pub struct UlidGenerator {
    clock: Arc<dyn Clock>,
}

impl UlidGenerator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl SessionIdGenerator for UlidGenerator {
    fn generate_session_id(&self) -> SessionId {
        let timestamp_ms = u64::try_from(self.clock.now().timestamp_millis()).unwrap_or(0);
        SessionId::from(Ulid::from_parts(timestamp_ms, rand::random()))
    }
}
