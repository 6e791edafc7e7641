//! Rows owned by the reward worker: per-session daily contributions and the
//! achievement ledger.

use crate::domain::foundation::{CalendarDate, FocusMinutes, SessionId, Timestamp, UserId};

/// One session's contribution to one user's day.
///
/// Natural key: (user_id, calendar_date, session_id). Redelivery of the same
/// update overwrites the row with the same value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyFocusContribution {
    pub user_id: UserId,
    pub calendar_date: CalendarDate,
    pub session_id: SessionId,
    pub duration_minutes: FocusMinutes,
}

impl DailyFocusContribution {
    /// Builds the contribution for a session that started at `start_time`.
    pub fn for_session(
        user_id: UserId,
        session_id: SessionId,
        start_time: &Timestamp,
        duration_minutes: FocusMinutes,
    ) -> Self {
        Self {
            user_id,
            calendar_date: start_time.calendar_date(),
            session_id,
            duration_minutes,
        }
    }
}

/// "This user reached the goal on this day."
///
/// Natural key: (user_id, calendar_date). Never updated, never deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyGoalAchievement {
    pub user_id: UserId,
    pub calendar_date: CalendarDate,
    pub triggering_session_id: SessionId,
    pub achieved_at: Timestamp,
}

/// Result of the uniqueness-guarded achievement insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AchievementInsert {
    Inserted,
    /// Another delivery recorded the achievement first.
    AlreadyRecorded,
}
