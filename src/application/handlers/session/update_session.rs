//! UpdateSessionHandler - Command handler for editing a session.
//!
//! Recomputes the duration from the new end time and emits
//! `SessionUpdatedEvent`, which is what the reward worker aggregates.

use std::sync::Arc;

use tracing::info;

use crate::application::EventWriter;
use crate::domain::foundation::{SessionId, Timestamp, UserId};
use crate::domain::session::{FocusSession, SessionError};
use crate::ports::SessionUnitOfWork;

/// Command to edit a session.
#[derive(Debug, Clone)]
pub struct UpdateSessionCommand {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub topic: String,
    pub end_time: Option<Timestamp>,
}

#[derive(Debug, Clone)]
pub struct UpdateSessionResult {
    pub session: FocusSession,
}

pub struct UpdateSessionHandler {
    sessions: Arc<dyn SessionUnitOfWork>,
    events: EventWriter,
}

impl UpdateSessionHandler {
    pub fn new(sessions: Arc<dyn SessionUnitOfWork>) -> Self {
        Self {
            sessions,
            events: EventWriter::new(),
        }
    }

    pub async fn handle(
        &self,
        cmd: UpdateSessionCommand,
    ) -> Result<UpdateSessionResult, SessionError> {
        let mut tx = self.sessions.begin().await?;

        // 1. Load and authorize
        let mut session = tx
            .find(&cmd.session_id)
            .await?
            .ok_or_else(|| SessionError::not_found(cmd.session_id))?;
        session.authorize(&cmd.user_id)?;

        // 2. Apply edit
        session.update(cmd.topic, cmd.end_time)?;

        // 3. Persist and stage event
        tx.update(&session).await?;
        self.events
            .record(&mut *tx, &session.updated_event(Timestamp::now()))
            .await?;
        tx.commit().await?;

        info!(
            session_id = %session.id(),
            duration_minutes = %session.duration_minutes(),
            "Session updated"
        );
        Ok(UpdateSessionResult { session })
    }
}
