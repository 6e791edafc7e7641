//! SetDailyGoalAchievedHandler - internal command called by the reward worker.
//!
//! Flags the session that pushed its owner's day over the goal. The call is
//! authenticated with a shared key, never with a user identity. It changes
//! no fields the reward worker consumes, so no event is emitted.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;
use tracing::{debug, info};

use crate::domain::foundation::SessionId;
use crate::domain::session::SessionError;
use crate::ports::SessionUnitOfWork;

#[derive(Debug, Clone)]
pub struct SetDailyGoalAchievedCommand {
    pub session_id: SessionId,
    /// Value of the `X-Internal-Api-Key` header, if any.
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetDailyGoalAchievedResult {
    /// `false` when the flag was already set.
    pub changed: bool,
}

pub struct SetDailyGoalAchievedHandler {
    sessions: Arc<dyn SessionUnitOfWork>,
    expected_key: SecretString,
}

impl SetDailyGoalAchievedHandler {
    pub fn new(sessions: Arc<dyn SessionUnitOfWork>, expected_key: SecretString) -> Self {
        Self {
            sessions,
            expected_key,
        }
    }

    pub async fn handle(
        &self,
        cmd: SetDailyGoalAchievedCommand,
    ) -> Result<SetDailyGoalAchievedResult, SessionError> {
        // 1. Authenticate caller
        if !self.key_matches(cmd.api_key.as_deref()) {
            return Err(SessionError::unauthorized());
        }

        // 2. Load and flag
        let mut tx = self.sessions.begin().await?;
        let mut session = tx
            .find(&cmd.session_id)
            .await?
            .ok_or_else(|| SessionError::not_found(cmd.session_id))?;

        if !session.mark_daily_goal_achieved() {
            debug!(session_id = %cmd.session_id, "Daily goal flag already set");
            return Ok(SetDailyGoalAchievedResult { changed: false });
        }

        tx.update(&session).await?;
        tx.commit().await?;

        info!(session_id = %cmd.session_id, "Session flagged as daily goal achieved");
        Ok(SetDailyGoalAchievedResult { changed: true })
    }

    /// An empty configured key rejects every caller.
    fn key_matches(&self, provided: Option<&str>) -> bool {
        let expected = self.expected_key.expose_secret();
        match provided {
            Some(provided) if !expected.is_empty() => {
                bool::from(provided.as_bytes().ct_eq(expected.as_bytes()))
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemorySessionStore;
    use crate::application::handlers::session::{CreateSessionCommand, CreateSessionHandler};
    use crate::domain::foundation::UserId;

    const KEY: &str = "internal-key";

    async fn setup(key: &str) -> (SetDailyGoalAchievedHandler, InMemorySessionStore, SessionId) {
        let store = InMemorySessionStore::new();
        let created = CreateSessionHandler::new(Arc::new(store.clone()))
            .handle(CreateSessionCommand {
                user_id: UserId::new("owner").unwrap(),
                topic: "Study".to_string(),
                start_time: None,
            })
            .await
            .unwrap();
        let handler = SetDailyGoalAchievedHandler::new(
            Arc::new(store.clone()),
            SecretString::new(key.to_string()),
        );
        (handler, store, *created.session.id())
    }

    fn cmd(session_id: SessionId, key: Option<&str>) -> SetDailyGoalAchievedCommand {
        SetDailyGoalAchievedCommand {
            session_id,
            api_key: key.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn valid_key_sets_flag_once() {
        let (handler, store, id) = setup(KEY).await;

        let first = handler.handle(cmd(id, Some(KEY))).await.unwrap();
        let second = handler.handle(cmd(id, Some(KEY))).await.unwrap();

        assert!(first.changed);
        assert!(!second.changed);
        assert!(store.session(&id).await.unwrap().is_daily_goal_achieved());
    }

    #[tokio::test]
    async fn flag_change_emits_no_event() {
        let (handler, store, id) = setup(KEY).await;

        handler.handle(cmd(id, Some(KEY))).await.unwrap();

        assert_eq!(store.outbox_rows().await.len(), 1);
    }

    #[tokio::test]
    async fn wrong_or_missing_key_is_unauthorized() {
        let (handler, store, id) = setup(KEY).await;

        assert!(matches!(
            handler.handle(cmd(id, Some("nope"))).await,
            Err(SessionError::Unauthorized)
        ));
        assert!(matches!(
            handler.handle(cmd(id, None)).await,
            Err(SessionError::Unauthorized)
        ));
        assert!(!store.session(&id).await.unwrap().is_daily_goal_achieved());
    }

    #[tokio::test]
    async fn empty_configured_key_rejects_everything() {
        let (handler, _, id) = setup("").await;

        assert!(matches!(
            handler.handle(cmd(id, Some(""))).await,
            Err(SessionError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let (handler, _, _) = setup(KEY).await;

        assert!(matches!(
            handler.handle(cmd(SessionId::new(), Some(KEY))).await,
            Err(SessionError::NotFound(_))
        ));
    }
}
