//! Rewards domain - daily focus totals and the one-time daily goal award.

mod events;
mod goal;
mod records;

pub use events::DailyGoalAchieved;
pub use goal::{DailyGoal, GoalProgress};
pub use records::{AchievementInsert, DailyFocusContribution, DailyGoalAchievement};
