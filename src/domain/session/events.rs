//! Session domain events.
//!
//! Published through the outbox when a focus session changes:
//! - `SessionCreated` - New session started
//! - `SessionUpdated` - Topic or end time changed; carries the recomputed duration
//! - `SessionDeleted` - Session removed by its owner

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{domain_event, FocusMinutes, SessionId, Timestamp, UserId};

// ════════════════════════════════════════════════════════════════════════════
// SessionCreated
// ════════════════════════════════════════════════════════════════════════════

/// Published when a user starts a new focus session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCreated {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub topic: String,
    pub start_time: Timestamp,
}

domain_event!(
    SessionCreated,
    event_type = "SessionCreatedEvent",
    aggregate_id = session_id,
    occurred_at = start_time
);

// ════════════════════════════════════════════════════════════════════════════
// SessionUpdated
// ════════════════════════════════════════════════════════════════════════════

/// Published when a session is edited.
///
/// `duration_minutes` is the full recomputed duration, not a delta, so
/// redelivering the same event always converges on the same contribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUpdated {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub topic: String,
    pub start_time: Timestamp,
    pub end_time: Option<Timestamp>,
    pub duration_minutes: FocusMinutes,
    pub updated_at: Timestamp,
}

domain_event!(
    SessionUpdated,
    event_type = "SessionUpdatedEvent",
    aggregate_id = session_id,
    occurred_at = updated_at
);

// ════════════════════════════════════════════════════════════════════════════
// SessionDeleted
// ════════════════════════════════════════════════════════════════════════════

/// Published when a session is deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDeleted {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub deleted_at: Timestamp,
}

domain_event!(
    SessionDeleted,
    event_type = "SessionDeletedEvent",
    aggregate_id = session_id,
    occurred_at = deleted_at
);
