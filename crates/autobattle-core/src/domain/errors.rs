//! Errors - error types and their operational classification.

use thiserror::Error;

use super::state::AutomationState;

/// ErrorKind classifies failures by how the controller reacts to them.
///
/// - PerceptionFailure / ActionExecutionFailure: recoverable, counted toward the consecutive threshold
/// - DecisionFailure: converted into an `ErrorRecovery` decision, never re-thrown
/// - FatalThreshold: consecutive threshold reached, session enters `Error`
/// - ResourceExhaustion: AP depleted, session enters `Completed` (not an error)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    PerceptionFailure,
    ActionExecutionFailure,
    DecisionFailure,
    FatalThreshold,
    ResourceExhaustion,
}

/// Failure reported by one of the external ports.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortError {
    #[error("capture failed: {0}")]
    Capture(String),

    #[error("perception failed: {0}")]
    Perception(String),

    #[error("actuation failed: {0}")]
    Actuation(String),
}

/// A perception result that cannot form a valid battle context.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContextError {
    #[error("turn must be >= 1")]
    InvalidTurn,

    #[error("phase must be >= 1")]
    InvalidPhase,

    #[error("servant index {0} out of range (0-2)")]
    ServantIndexOutOfRange(u8),

    #[error("servant {0} reported twice")]
    DuplicateServant(u8),

    #[error("servant {servant} health {value} outside 0.0-1.0")]
    InvalidHealth { servant: u8, value: f32 },

    #[error("{0} cards detected, at most 5 expected")]
    TooManyCards(usize),

    #[error("card index {0} detected twice")]
    DuplicateCardIndex(u8),

    #[error("card {card} effectiveness {value} must be positive")]
    InvalidEffectiveness { card: u8, value: f32 },
}

/// Why a single loop cycle failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CycleError {
    #[error(transparent)]
    Port(#[from] PortError),

    #[error("invalid battle context: {0}")]
    Context(#[from] ContextError),

    #[error("perception and decision exceeded {0} ms")]
    DecisionTimeout(u64),

    #[error("game reported an error screen")]
    ErrorScreen,

    #[error("cycle panicked: {0}")]
    Panicked(String),
}

impl CycleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CycleError::Port(PortError::Actuation(_)) => ErrorKind::ActionExecutionFailure,
            // the timeout bounds the perception calls as well as the decision
            CycleError::Port(_)
            | CycleError::Context(_)
            | CycleError::ErrorScreen
            | CycleError::DecisionTimeout(_) => ErrorKind::PerceptionFailure,
            CycleError::Panicked(_) => ErrorKind::ActionExecutionFailure,
        }
    }
}

/// Misuse of the controller API.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("controller is not initialized")]
    NotInitialized,

    #[error("a session is already active (state={0})")]
    AlreadyActive(AutomationState),

    #[error("cannot {action} while {from}")]
    InvalidTransition {
        from: AutomationState,
        action: &'static str,
    },

    #[error("initialization failed: {0}")]
    InitializationFailed(String),

    #[error(transparent)]
    Config(#[from] crate::app::config::ConfigError),
}
