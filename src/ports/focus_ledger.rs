//! Daily focus ledger port - the reward worker's own store.
//!
//! Holds per-session contributions to a user's day and the achievement
//! ledger. Both tables carry unique constraints on their natural keys; the
//! aggregator leans on those constraints for idempotence under redelivery
//! and concurrent consumers.

use async_trait::async_trait;

use crate::domain::foundation::{CalendarDate, DomainError, FocusMinutes, SessionId, UserId};
use crate::domain::rewards::{AchievementInsert, DailyFocusContribution, DailyGoalAchievement};

#[async_trait]
pub trait DailyFocusLedger: Send + Sync {
    /// Insert or overwrite the contribution keyed by
    /// (user_id, calendar_date, session_id).
    async fn upsert_contribution(
        &self,
        contribution: &DailyFocusContribution,
    ) -> Result<(), DomainError>;

    /// Sum of all contributions for the user's day; zero when there are none.
    async fn total_for_day(
        &self,
        user_id: &UserId,
        date: CalendarDate,
    ) -> Result<FocusMinutes, DomainError>;

    async fn achievement_exists(
        &self,
        user_id: &UserId,
        date: CalendarDate,
    ) -> Result<bool, DomainError>;

    async fn find_achievement(
        &self,
        user_id: &UserId,
        date: CalendarDate,
    ) -> Result<Option<DailyGoalAchievement>, DomainError>;

    /// Uniqueness-guarded insert.
    ///
    /// Returns `AlreadyRecorded` instead of an error when a row for the same
    /// (user_id, calendar_date) exists.
    async fn record_achievement(
        &self,
        achievement: &DailyGoalAchievement,
    ) -> Result<AchievementInsert, DomainError>;

    /// Delete every contribution of the session. Returns the rows removed.
    async fn remove_session_contributions(
        &self,
        session_id: &SessionId,
    ) -> Result<u64, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time check that trait is object-safe
    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn DailyFocusLedger) {}
}
