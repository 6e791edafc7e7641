//! CreateSessionHandler - Command handler for starting focus sessions.

use std::sync::Arc;

use tracing::info;

use crate::application::EventWriter;
use crate::domain::foundation::{SessionId, Timestamp, UserId};
use crate::domain::session::{FocusSession, SessionError};
use crate::ports::SessionUnitOfWork;

/// Command to start a new session.
#[derive(Debug, Clone)]
pub struct CreateSessionCommand {
    pub user_id: UserId,
    pub topic: String,
    /// Defaults to now.
    pub start_time: Option<Timestamp>,
}

/// Result of successful session creation.
#[derive(Debug, Clone)]
pub struct CreateSessionResult {
    pub session: FocusSession,
}

/// Handler for creating sessions.
pub struct CreateSessionHandler {
    sessions: Arc<dyn SessionUnitOfWork>,
    events: EventWriter,
}

impl CreateSessionHandler {
    pub fn new(sessions: Arc<dyn SessionUnitOfWork>) -> Self {
        Self {
            sessions,
            events: EventWriter::new(),
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateSessionCommand,
    ) -> Result<CreateSessionResult, SessionError> {
        // 1. Build aggregate
        let start_time = cmd.start_time.unwrap_or_else(Timestamp::now);
        let session = FocusSession::start(SessionId::new(), cmd.user_id, cmd.topic, start_time)?;

        // 2. Persist session and stage event in one transaction
        let mut tx = self.sessions.begin().await?;
        tx.insert(&session).await?;
        self.events
            .record(&mut *tx, &session.created_event())
            .await?;
        tx.commit().await?;

        info!(session_id = %session.id(), user_id = %session.user_id(), "Session created");
        Ok(CreateSessionResult { session })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemorySessionStore;

    fn handler() -> (CreateSessionHandler, InMemorySessionStore) {
        let store = InMemorySessionStore::new();
        (CreateSessionHandler::new(Arc::new(store.clone())), store)
    }

    #[tokio::test]
    async fn creates_session_and_stages_created_event() {
        let (handler, store) = handler();

        let result = handler
            .handle(CreateSessionCommand {
                user_id: UserId::new("user-1").unwrap(),
                topic: "Writing".to_string(),
                start_time: None,
            })
            .await
            .unwrap();

        assert!(store.session(result.session.id()).await.is_some());
        let rows = store.outbox_rows().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].event_type, "SessionCreatedEvent");
        assert!(rows[0].processed_at.is_none());
    }

    #[tokio::test]
    async fn invalid_topic_writes_nothing() {
        let (handler, store) = handler();

        let result = handler
            .handle(CreateSessionCommand {
                user_id: UserId::new("user-1").unwrap(),
                topic: "   ".to_string(),
                start_time: None,
            })
            .await;

        assert!(matches!(result, Err(SessionError::ValidationFailed { .. })));
        assert_eq!(store.session_count().await, 0);
        assert!(store.outbox_rows().await.is_empty());
    }
}
