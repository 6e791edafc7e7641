//! Application handlers.
//!
//! Command handlers for the session service and the reward worker's
//! message handlers.

pub mod rewards;
pub mod session;

pub use rewards::{DailyGoalService, GoalOutcome, SessionEventRouter};
pub use session::{
    CreateSessionCommand, CreateSessionHandler, CreateSessionResult, DeleteSessionCommand,
    DeleteSessionHandler, SetDailyGoalAchievedCommand, SetDailyGoalAchievedHandler,
    SetDailyGoalAchievedResult, UpdateSessionCommand, UpdateSessionHandler, UpdateSessionResult,
};
