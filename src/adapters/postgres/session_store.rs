//! PostgreSQL implementation of SessionUnitOfWork.
//!
//! Each unit of work is one database transaction covering the `sessions`
//! table and the `domain_event_outbox` table. Dropping the transaction
//! without committing rolls both back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::domain::foundation::{
    DomainError, ErrorCode, FocusMinutes, SessionId, Timestamp, UserId,
};
use crate::domain::session::FocusSession;
use crate::ports::{NewOutboxEvent, OutboxSink, SessionTransaction, SessionUnitOfWork};

/// PostgreSQL implementation of SessionUnitOfWork.
#[derive(Clone)]
pub struct PostgresSessionStore {
    pool: PgPool,
}

impl PostgresSessionStore {
    /// Creates a new PostgresSessionStore.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionUnitOfWork for PostgresSessionStore {
    async fn begin(&self) -> Result<Box<dyn SessionTransaction>, DomainError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database("begin transaction", e))?;
        Ok(Box::new(PostgresSessionTransaction { tx }))
    }
}

struct PostgresSessionTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl OutboxSink for PostgresSessionTransaction {
    async fn append(&mut self, event: NewOutboxEvent) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO domain_event_outbox (event_type, payload, created_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(&event.event_type)
        .bind(&event.payload)
        .bind(event.created_at.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| DomainError::database("insert outbox event", e))?;

        Ok(())
    }
}

#[async_trait]
impl SessionTransaction for PostgresSessionTransaction {
    async fn find(&mut self, id: &SessionId) -> Result<Option<FocusSession>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, topic, start_time, end_time, duration_minutes,
                   is_daily_goal_achieved
            FROM sessions
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| DomainError::database("fetch session", e))?;

        row.map(row_to_session).transpose()
    }

    async fn insert(&mut self, session: &FocusSession) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (
                id, user_id, topic, start_time, end_time, duration_minutes,
                is_daily_goal_achieved
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(session.id().as_uuid())
        .bind(session.user_id().as_str())
        .bind(session.topic())
        .bind(session.start_time().as_datetime())
        .bind(session.end_time().map(|t| *t.as_datetime()))
        .bind(session.duration_minutes().as_decimal())
        .bind(session.is_daily_goal_achieved())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| DomainError::database("insert session", e))?;

        Ok(())
    }

    async fn update(&mut self, session: &FocusSession) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE sessions SET
                topic = $2,
                end_time = $3,
                duration_minutes = $4,
                is_daily_goal_achieved = $5,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(session.id().as_uuid())
        .bind(session.topic())
        .bind(session.end_time().map(|t| *t.as_datetime()))
        .bind(session.duration_minutes().as_decimal())
        .bind(session.is_daily_goal_achieved())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| DomainError::database("update session", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::SessionNotFound,
                format!("Session not found: {}", session.id()),
            ));
        }

        Ok(())
    }

    async fn delete(&mut self, id: &SessionId) -> Result<(), DomainError> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| DomainError::database("delete session", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::SessionNotFound,
                format!("Session not found: {}", id),
            ));
        }

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        self.tx
            .commit()
            .await
            .map_err(|e| DomainError::database("commit transaction", e))
    }
}

fn row_to_session(row: PgRow) -> Result<FocusSession, DomainError> {
    let read = |e: sqlx::Error| DomainError::database("decode session row", e);

    let id: Uuid = row.try_get("id").map_err(read)?;
    let user_id: String = row.try_get("user_id").map_err(read)?;
    let topic: String = row.try_get("topic").map_err(read)?;
    let start_time: DateTime<Utc> = row.try_get("start_time").map_err(read)?;
    let end_time: Option<DateTime<Utc>> = row.try_get("end_time").map_err(read)?;
    let duration: Decimal = row.try_get("duration_minutes").map_err(read)?;
    let achieved: bool = row.try_get("is_daily_goal_achieved").map_err(read)?;

    let user_id = UserId::new(user_id)
        .map_err(|e| DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e)))?;

    Ok(FocusSession::reconstitute(
        SessionId::from_uuid(id),
        user_id,
        topic,
        Timestamp::from_datetime(start_time),
        end_time.map(Timestamp::from_datetime),
        FocusMinutes::new(duration),
        achieved,
    ))
}
