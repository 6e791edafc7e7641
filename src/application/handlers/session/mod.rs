//! Session command handlers.

mod create_session;
mod delete_session;
mod set_daily_goal_achieved;
mod update_session;

pub use create_session::{CreateSessionCommand, CreateSessionHandler, CreateSessionResult};
pub use delete_session::{DeleteSessionCommand, DeleteSessionHandler};
pub use set_daily_goal_achieved::{
    SetDailyGoalAchievedCommand, SetDailyGoalAchievedHandler, SetDailyGoalAchievedResult,
};
pub use update_session::{UpdateSessionCommand, UpdateSessionHandler, UpdateSessionResult};
