//! DailyGoalService - per-user daily focus aggregation and the one-time award.
//!
//! Every operation is safe under redelivery and concurrent duplicates:
//! - contributions are upserts keyed by (user, day, session)
//! - the day's total is recomputed from stored rows, never incremented
//! - the award goes through a unique-keyed insert
//!
//! Events may arrive in any order; only the stored state matters.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::foundation::{DomainError, FocusMinutes, SerializableDomainEvent, Timestamp};
use crate::domain::rewards::{
    AchievementInsert, DailyFocusContribution, DailyGoal, DailyGoalAchieved, DailyGoalAchievement,
    GoalProgress,
};
use crate::domain::session::{SessionDeleted, SessionUpdated};
use crate::ports::{DailyFocusLedger, MessagePublisher, SessionOfRecord};

/// What processing one `SessionUpdatedEvent` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalOutcome {
    /// Duration was not positive; nothing stored.
    Skipped,
    BelowThreshold,
    /// The day already had an achievement, possibly recorded concurrently.
    AlreadyAchieved,
    /// The threshold was reached but the session service could not be
    /// updated; no achievement was written so a later delivery retries.
    FlagDeferred,
    /// This update crossed the threshold and the achievement was recorded.
    Achieved,
}

pub struct DailyGoalService {
    ledger: Arc<dyn DailyFocusLedger>,
    sessions: Arc<dyn SessionOfRecord>,
    publisher: Arc<dyn MessagePublisher>,
    goal: DailyGoal,
}

impl DailyGoalService {
    pub fn new(
        ledger: Arc<dyn DailyFocusLedger>,
        sessions: Arc<dyn SessionOfRecord>,
        publisher: Arc<dyn MessagePublisher>,
    ) -> Self {
        Self {
            ledger,
            sessions,
            publisher,
            goal: DailyGoal::default(),
        }
    }

    pub fn with_goal(mut self, goal: DailyGoal) -> Self {
        self.goal = goal;
        self
    }

    pub async fn on_session_updated(
        &self,
        event: &SessionUpdated,
    ) -> Result<GoalOutcome, DomainError> {
        info!(
            session_id = %event.session_id,
            user_id = %event.user_id,
            duration_minutes = %event.duration_minutes,
            "Received session update"
        );

        if !event.duration_minutes.is_positive() {
            return Ok(GoalOutcome::Skipped);
        }

        // 1. Record this session's share of its day
        let contribution = DailyFocusContribution::for_session(
            event.user_id.clone(),
            event.session_id,
            &event.start_time,
            event.duration_minutes,
        );
        let date = contribution.calendar_date;
        self.ledger.upsert_contribution(&contribution).await?;

        // 2. Recompute the day from stored rows
        let total = self.ledger.total_for_day(&event.user_id, date).await?;
        let already_achieved = self.ledger.achievement_exists(&event.user_id, date).await?;

        match self.goal.evaluate(total, already_achieved) {
            GoalProgress::BelowThreshold => {
                debug!(user_id = %event.user_id, %date, %total, "Daily goal not reached");
                Ok(GoalOutcome::BelowThreshold)
            }
            GoalProgress::AlreadyAchieved => Ok(GoalOutcome::AlreadyAchieved),
            GoalProgress::ThresholdReached => {
                // 3. Flag the triggering session before writing locally
                if let Err(e) = self.sessions.mark_daily_goal_achieved(&event.session_id).await {
                    warn!(
                        session_id = %event.session_id,
                        error = %e,
                        "Failed to flag session as daily goal achieved"
                    );
                    return Ok(GoalOutcome::FlagDeferred);
                }

                // 4. Unique-keyed insert decides who wins
                let achievement = DailyGoalAchievement {
                    user_id: event.user_id.clone(),
                    calendar_date: date,
                    triggering_session_id: event.session_id,
                    achieved_at: Timestamp::now(),
                };
                match self.ledger.record_achievement(&achievement).await? {
                    AchievementInsert::AlreadyRecorded => {
                        debug!(
                            user_id = %event.user_id,
                            %date,
                            "Achievement recorded by a concurrent delivery"
                        );
                        Ok(GoalOutcome::AlreadyAchieved)
                    }
                    AchievementInsert::Inserted => {
                        info!(
                            user_id = %event.user_id,
                            %date,
                            session_id = %event.session_id,
                            %total,
                            "Daily goal achieved"
                        );
                        self.announce(&achievement, total).await;
                        Ok(GoalOutcome::Achieved)
                    }
                }
            }
        }
    }

    /// Removes the session's contribution. Achievements are never retracted.
    pub async fn on_session_deleted(&self, event: &SessionDeleted) -> Result<(), DomainError> {
        let removed = self
            .ledger
            .remove_session_contributions(&event.session_id)
            .await?;
        if removed > 0 {
            info!(session_id = %event.session_id, "Removed contribution for deleted session");
        }
        Ok(())
    }

    /// Best effort: the achievement row is already committed.
    async fn announce(&self, achievement: &DailyGoalAchievement, total: FocusMinutes) {
        let event = DailyGoalAchieved {
            session_id: achievement.triggering_session_id,
            user_id: achievement.user_id.clone(),
            calendar_date: achievement.calendar_date,
            total_minutes: total,
            achieved_at: achievement.achieved_at,
        };

        let result = match event.to_payload() {
            Ok(payload) => {
                self.publisher
                    .publish(DailyGoalAchieved::EVENT_TYPE, payload.as_bytes())
                    .await
            }
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            warn!(
                session_id = %event.session_id,
                error = %e,
                "Failed to publish DailyGoalAchievedEvent"
            );
        }
    }
}
