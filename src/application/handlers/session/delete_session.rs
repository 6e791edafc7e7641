//! DeleteSessionHandler - Command handler for removing a session.

use std::sync::Arc;

use tracing::info;

use crate::application::EventWriter;
use crate::domain::foundation::{SessionId, Timestamp, UserId};
use crate::domain::session::SessionError;
use crate::ports::SessionUnitOfWork;

#[derive(Debug, Clone)]
pub struct DeleteSessionCommand {
    pub session_id: SessionId,
    pub user_id: UserId,
}

pub struct DeleteSessionHandler {
    sessions: Arc<dyn SessionUnitOfWork>,
    events: EventWriter,
}

impl DeleteSessionHandler {
    pub fn new(sessions: Arc<dyn SessionUnitOfWork>) -> Self {
        Self {
            sessions,
            events: EventWriter::new(),
        }
    }

    pub async fn handle(&self, cmd: DeleteSessionCommand) -> Result<(), SessionError> {
        let mut tx = self.sessions.begin().await?;

        let session = tx
            .find(&cmd.session_id)
            .await?
            .ok_or_else(|| SessionError::not_found(cmd.session_id))?;
        session.authorize(&cmd.user_id)?;

        tx.delete(session.id()).await?;
        self.events
            .record(&mut *tx, &session.deleted_event(Timestamp::now()))
            .await?;
        tx.commit().await?;

        info!(session_id = %session.id(), "Session deleted");
        Ok(())
    }
}
