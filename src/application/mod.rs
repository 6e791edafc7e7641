//! Application layer - Commands and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.

pub mod handlers;
mod outbox;

pub use handlers::{
    // Session handlers
    CreateSessionCommand, CreateSessionHandler, CreateSessionResult,
    DeleteSessionCommand, DeleteSessionHandler,
    SetDailyGoalAchievedCommand, SetDailyGoalAchievedHandler, SetDailyGoalAchievedResult,
    UpdateSessionCommand, UpdateSessionHandler, UpdateSessionResult,
    // Reward handlers
    DailyGoalService, GoalOutcome, SessionEventRouter,
};
pub use outbox::EventWriter;
