//! In-Memory Daily Focus Ledger
//!
//! Mirrors the unique constraints of the relational tables: contributions
//! keyed by (user, day, session), achievements keyed by (user, day).

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::foundation::{CalendarDate, DomainError, FocusMinutes, SessionId, UserId};
use crate::domain::rewards::{AchievementInsert, DailyFocusContribution, DailyGoalAchievement};
use crate::ports::DailyFocusLedger;

type ContributionKey = (UserId, CalendarDate, SessionId);
type DayKey = (UserId, CalendarDate);

#[derive(Debug, Default)]
struct LedgerState {
    contributions: HashMap<ContributionKey, FocusMinutes>,
    achievements: HashMap<DayKey, DailyGoalAchievement>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryFocusLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl InMemoryFocusLedger {
    pub fn new() -> Self {
        Self::default()
    }

    // === Test Helpers ===

    pub async fn contribution_count(&self) -> usize {
        self.state.lock().await.contributions.len()
    }

    pub async fn achievement_count(&self) -> usize {
        self.state.lock().await.achievements.len()
    }
}

#[async_trait]
impl DailyFocusLedger for InMemoryFocusLedger {
    async fn upsert_contribution(
        &self,
        contribution: &DailyFocusContribution,
    ) -> Result<(), DomainError> {
        let key = (
            contribution.user_id.clone(),
            contribution.calendar_date,
            contribution.session_id,
        );
        self.state
            .lock()
            .await
            .contributions
            .insert(key, contribution.duration_minutes);
        Ok(())
    }

    async fn total_for_day(
        &self,
        user_id: &UserId,
        date: CalendarDate,
    ) -> Result<FocusMinutes, DomainError> {
        let state = self.state.lock().await;
        Ok(state
            .contributions
            .iter()
            .filter(|((user, day, _), _)| user == user_id && *day == date)
            .map(|(_, minutes)| *minutes)
            .sum())
    }

    async fn achievement_exists(
        &self,
        user_id: &UserId,
        date: CalendarDate,
    ) -> Result<bool, DomainError> {
        let key = (user_id.clone(), date);
        Ok(self.state.lock().await.achievements.contains_key(&key))
    }

    async fn find_achievement(
        &self,
        user_id: &UserId,
        date: CalendarDate,
    ) -> Result<Option<DailyGoalAchievement>, DomainError> {
        let key = (user_id.clone(), date);
        Ok(self.state.lock().await.achievements.get(&key).cloned())
    }

    async fn record_achievement(
        &self,
        achievement: &DailyGoalAchievement,
    ) -> Result<AchievementInsert, DomainError> {
        let key = (achievement.user_id.clone(), achievement.calendar_date);
        let mut state = self.state.lock().await;
        if state.achievements.contains_key(&key) {
            return Ok(AchievementInsert::AlreadyRecorded);
        }
        state.achievements.insert(key, achievement.clone());
        Ok(AchievementInsert::Inserted)
    }

    async fn remove_session_contributions(
        &self,
        session_id: &SessionId,
    ) -> Result<u64, DomainError> {
        let mut state = self.state.lock().await;
        let before = state.contributions.len();
        state
            .contributions
            .retain(|(_, _, session), _| session != session_id);
        Ok((before - state.contributions.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Timestamp;

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    fn contribution(session_id: SessionId, hundredths: i64) -> DailyFocusContribution {
        DailyFocusContribution::for_session(
            user(),
            session_id,
            &Timestamp::now(),
            FocusMinutes::from_hundredths(hundredths),
        )
    }

    #[tokio::test]
    async fn upsert_overwrites_same_session() {
        let ledger = InMemoryFocusLedger::new();
        let session_id = SessionId::new();
        let today = Timestamp::now().calendar_date();

        ledger
            .upsert_contribution(&contribution(session_id, 3000))
            .await
            .unwrap();
        ledger
            .upsert_contribution(&contribution(session_id, 4500))
            .await
            .unwrap();

        assert_eq!(ledger.contribution_count().await, 1);
        assert_eq!(
            ledger.total_for_day(&user(), today).await.unwrap(),
            FocusMinutes::from_hundredths(4500)
        );
    }

    #[tokio::test]
    async fn total_of_empty_day_is_zero() {
        let ledger = InMemoryFocusLedger::new();
        let total = ledger
            .total_for_day(&user(), Timestamp::now().calendar_date())
            .await
            .unwrap();
        assert_eq!(total, FocusMinutes::ZERO);
    }

    #[tokio::test]
    async fn second_achievement_for_same_day_is_already_recorded() {
        let ledger = InMemoryFocusLedger::new();
        let achievement = DailyGoalAchievement {
            user_id: user(),
            calendar_date: Timestamp::now().calendar_date(),
            triggering_session_id: SessionId::new(),
            achieved_at: Timestamp::now(),
        };

        assert_eq!(
            ledger.record_achievement(&achievement).await.unwrap(),
            AchievementInsert::Inserted
        );
        let mut duplicate = achievement.clone();
        duplicate.triggering_session_id = SessionId::new();
        assert_eq!(
            ledger.record_achievement(&duplicate).await.unwrap(),
            AchievementInsert::AlreadyRecorded
        );

        let stored = ledger
            .find_achievement(&achievement.user_id, achievement.calendar_date)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.triggering_session_id, achievement.triggering_session_id);
    }

    #[tokio::test]
    async fn remove_session_contributions_only_touches_that_session() {
        let ledger = InMemoryFocusLedger::new();
        let gone = SessionId::new();
        ledger.upsert_contribution(&contribution(gone, 6000)).await.unwrap();
        ledger
            .upsert_contribution(&contribution(SessionId::new(), 1000))
            .await
            .unwrap();

        assert_eq!(ledger.remove_session_contributions(&gone).await.unwrap(), 1);
        assert_eq!(ledger.contribution_count().await, 1);
    }
}
