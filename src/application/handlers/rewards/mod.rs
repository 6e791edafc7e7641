//! Reward worker handlers: session event routing and daily goal aggregation.

mod daily_goal_service;
mod session_event_router;

pub use daily_goal_service::{DailyGoalService, GoalOutcome};
pub use session_event_router::SessionEventRouter;
