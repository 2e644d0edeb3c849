//! Domain model for the battle automation.
//!
//! Everything here is plain data: built per cycle from perception output,
//! read by the engine, and reported through the controller's status.

pub mod battle_state;
pub mod card;
pub mod context;
pub mod decision;
pub mod errors;
pub mod ids;
pub mod servant;
pub mod skill;
pub mod state;
pub mod stats;
pub mod team;

pub use battle_state::BattleState;
pub use card::{CardInfo, CardType};
pub use context::{BattleContext, BattleContextBuilder, Objective};
pub use decision::{Decision, RecoveryAction};
pub use errors::{ContextError, ControllerError, CycleError, ErrorKind, PortError};
pub use ids::SessionId;
pub use servant::ServantState;
pub use skill::{SkillInfo, SkillKey, SkillOwner, SkillUsageRule};
pub use state::AutomationState;
pub use stats::AutomationStats;
pub use team::{Strategy, Team};
