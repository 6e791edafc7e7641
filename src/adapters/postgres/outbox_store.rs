//! PostgreSQL implementation of OutboxStore.
//!
//! Reads and marks rows of `domain_event_outbox`. Rows are appended by
//! `PostgresSessionStore` inside business transactions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::domain::foundation::{DomainError, OutboxEventId, Timestamp};
use crate::ports::{OutboxEvent, OutboxStore};

#[derive(Clone)]
pub struct PostgresOutboxStore {
    pool: PgPool,
}

impl PostgresOutboxStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OutboxStore for PostgresOutboxStore {
    async fn fetch_unprocessed(&self, limit: u32) -> Result<Vec<OutboxEvent>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, event_type, payload, created_at, processed_at
            FROM domain_event_outbox
            WHERE processed_at IS NULL
            ORDER BY created_at, id
            LIMIT $1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("fetch outbox events", e))?;

        rows.into_iter()
            .map(|row| {
                let read = |e: sqlx::Error| DomainError::database("decode outbox row", e);
                let created_at: DateTime<Utc> = row.try_get("created_at").map_err(read)?;
                let processed_at: Option<DateTime<Utc>> =
                    row.try_get("processed_at").map_err(read)?;
                Ok(OutboxEvent {
                    id: OutboxEventId::new(row.try_get("id").map_err(read)?),
                    event_type: row.try_get("event_type").map_err(read)?,
                    payload: row.try_get("payload").map_err(read)?,
                    created_at: Timestamp::from_datetime(created_at),
                    processed_at: processed_at.map(Timestamp::from_datetime),
                })
            })
            .collect()
    }

    async fn mark_processed(
        &self,
        ids: &[OutboxEventId],
        processed_at: Timestamp,
    ) -> Result<u64, DomainError> {
        let ids: Vec<i64> = ids.iter().map(OutboxEventId::value).collect();
        let result = sqlx::query(
            r#"
            UPDATE domain_event_outbox
            SET processed_at = $2
            WHERE id = ANY($1) AND processed_at IS NULL
            "#,
        )
        .bind(&ids)
        .bind(processed_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("mark outbox events processed", e))?;

        Ok(result.rows_affected())
    }
}
