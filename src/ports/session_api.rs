//! Session-of-record port - the reward worker's synchronous call back into
//! the session service.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::SessionId;

/// Errors from the internal session API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionApiError {
    #[error("session {0} not found")]
    NotFound(SessionId),

    #[error("session API rejected the call with status {0}")]
    Rejected(u16),

    #[error("session API unreachable: {0}")]
    Transport(String),
}

#[async_trait]
pub trait SessionOfRecord: Send + Sync {
    /// Sets `is_daily_goal_achieved` on the session. Idempotent.
    async fn mark_daily_goal_achieved(&self, session_id: &SessionId)
        -> Result<(), SessionApiError>;
}
