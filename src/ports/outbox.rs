//! Outbox ports - transactional event persistence.
//!
//! Implements the storage half of the Transactional Outbox Pattern:
//!
//! 1. A command handler stages business changes AND an outbox row in one
//!    database transaction (`OutboxSink`)
//! 2. The transaction commits; the row is now visible
//! 3. `OutboxPublisher` reads unprocessed rows (`OutboxStore`), publishes them
//!    to the broker, and marks them processed
//!
//! Rows are never deleted, only marked.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, OutboxEventId, Timestamp};

/// A stored outbox row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxEvent {
    /// Store-assigned, monotonically increasing id
    pub id: OutboxEventId,

    /// Event type name, used as the broker routing key
    pub event_type: String,

    /// Serialized event body, published verbatim
    pub payload: String,

    /// When the row was staged
    pub created_at: Timestamp,

    /// Set exactly once, after a successful publish
    pub processed_at: Option<Timestamp>,
}

impl OutboxEvent {
    pub fn is_processed(&self) -> bool {
        self.processed_at.is_some()
    }
}

/// A row about to be appended; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOutboxEvent {
    pub event_type: String,
    pub payload: String,
    pub created_at: Timestamp,
}

impl NewOutboxEvent {
    pub fn new(event_type: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            payload: payload.into(),
            created_at: Timestamp::now(),
        }
    }
}

/// The write side of the outbox, bound to an open business transaction.
///
/// Implementations must not make the row visible before the enclosing
/// transaction commits, and must discard it if the transaction rolls back.
#[async_trait]
pub trait OutboxSink: Send {
    /// Stage one row with `processed_at = NULL`.
    async fn append(&mut self, event: NewOutboxEvent) -> Result<(), DomainError>;
}

/// The read/mark side of the outbox, used by the publisher loop.
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Up to `limit` unprocessed rows, oldest first (created_at, then id).
    async fn fetch_unprocessed(&self, limit: u32) -> Result<Vec<OutboxEvent>, DomainError>;

    /// Sets `processed_at` on the given rows.
    ///
    /// Rows that are already processed keep their original timestamp.
    /// Returns the number of rows newly marked.
    async fn mark_processed(
        &self,
        ids: &[OutboxEventId],
        processed_at: Timestamp,
    ) -> Result<u64, DomainError>;
}
