//! Events emitted by the reward worker.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    domain_event, CalendarDate, FocusMinutes, SessionId, Timestamp, UserId,
};

/// Published once per user per day, when the day's total first reaches the
/// goal. Consumed by notification services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyGoalAchieved {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub calendar_date: CalendarDate,
    pub total_minutes: FocusMinutes,
    pub achieved_at: Timestamp,
}

domain_event!(
    DailyGoalAchieved,
    event_type = "DailyGoalAchievedEvent",
    aggregate_id = user_id,
    occurred_at = achieved_at
);
