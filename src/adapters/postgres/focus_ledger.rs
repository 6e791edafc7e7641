//! PostgreSQL implementation of DailyFocusLedger.
//!
//! Idempotence comes from the tables' unique constraints:
//! - `daily_focus_contributions (user_id, calendar_date, session_id)` backs the upsert
//! - `daily_goal_achievements (user_id, calendar_date)` backs the award insert

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use crate::domain::foundation::{
    CalendarDate, DomainError, ErrorCode, FocusMinutes, SessionId, Timestamp, UserId,
};
use crate::domain::rewards::{AchievementInsert, DailyFocusContribution, DailyGoalAchievement};
use crate::ports::DailyFocusLedger;

#[derive(Clone)]
pub struct PostgresFocusLedger {
    pool: PgPool,
}

impl PostgresFocusLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DailyFocusLedger for PostgresFocusLedger {
    async fn upsert_contribution(
        &self,
        contribution: &DailyFocusContribution,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO daily_focus_contributions (
                user_id, calendar_date, session_id, duration_minutes
            ) VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, calendar_date, session_id)
            DO UPDATE SET duration_minutes = EXCLUDED.duration_minutes,
                          updated_at = now()
            "#,
        )
        .bind(contribution.user_id.as_str())
        .bind(contribution.calendar_date.as_naive())
        .bind(contribution.session_id.as_uuid())
        .bind(contribution.duration_minutes.as_decimal())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("upsert contribution", e))?;

        Ok(())
    }

    async fn total_for_day(
        &self,
        user_id: &UserId,
        date: CalendarDate,
    ) -> Result<FocusMinutes, DomainError> {
        let total: Decimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(duration_minutes), 0)
            FROM daily_focus_contributions
            WHERE user_id = $1 AND calendar_date = $2
            "#,
        )
        .bind(user_id.as_str())
        .bind(date.as_naive())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database("sum contributions", e))?;

        Ok(FocusMinutes::new(total))
    }

    async fn achievement_exists(
        &self,
        user_id: &UserId,
        date: CalendarDate,
    ) -> Result<bool, DomainError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM daily_goal_achievements
                WHERE user_id = $1 AND calendar_date = $2
            )
            "#,
        )
        .bind(user_id.as_str())
        .bind(date.as_naive())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database("check achievement", e))?;

        Ok(exists)
    }

    async fn find_achievement(
        &self,
        user_id: &UserId,
        date: CalendarDate,
    ) -> Result<Option<DailyGoalAchievement>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT user_id, calendar_date, triggering_session_id, achieved_at
            FROM daily_goal_achievements
            WHERE user_id = $1 AND calendar_date = $2
            "#,
        )
        .bind(user_id.as_str())
        .bind(date.as_naive())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("fetch achievement", e))?;

        row.map(row_to_achievement).transpose()
    }

    async fn record_achievement(
        &self,
        achievement: &DailyGoalAchievement,
    ) -> Result<AchievementInsert, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO daily_goal_achievements (
                user_id, calendar_date, triggering_session_id, achieved_at
            ) VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, calendar_date) DO NOTHING
            "#,
        )
        .bind(achievement.user_id.as_str())
        .bind(achievement.calendar_date.as_naive())
        .bind(achievement.triggering_session_id.as_uuid())
        .bind(achievement.achieved_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("insert achievement", e))?;

        if result.rows_affected() == 0 {
            debug!(
                user_id = %achievement.user_id,
                date = %achievement.calendar_date,
                "Achievement insert hit unique constraint"
            );
            return Ok(AchievementInsert::AlreadyRecorded);
        }
        Ok(AchievementInsert::Inserted)
    }

    async fn remove_session_contributions(
        &self,
        session_id: &SessionId,
    ) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM daily_focus_contributions WHERE session_id = $1")
            .bind(session_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database("delete contributions", e))?;

        Ok(result.rows_affected())
    }
}

fn row_to_achievement(row: PgRow) -> Result<DailyGoalAchievement, DomainError> {
    let read = |e: sqlx::Error| DomainError::database("decode achievement row", e);

    let user_id: String = row.try_get("user_id").map_err(read)?;
    let calendar_date: NaiveDate = row.try_get("calendar_date").map_err(read)?;
    let session_id: Uuid = row.try_get("triggering_session_id").map_err(read)?;
    let achieved_at: DateTime<Utc> = row.try_get("achieved_at").map_err(read)?;

    Ok(DailyGoalAchievement {
        user_id: UserId::new(user_id).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
        })?,
        calendar_date: CalendarDate::from_naive(calendar_date),
        triggering_session_id: SessionId::from_uuid(session_id),
        achieved_at: Timestamp::from_datetime(achieved_at),
    })
}
