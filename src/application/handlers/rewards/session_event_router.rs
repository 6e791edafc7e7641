//! SessionEventRouter - the reward worker's handler for session events.
//!
//! Picks the payload type from the routing key, deserializes, and hands the
//! event to `DailyGoalService`. Bind it for every key in `ROUTING_KEYS`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use super::DailyGoalService;
use crate::domain::session::{SessionCreated, SessionDeleted, SessionUpdated};
use crate::ports::{ConsumeError, MessageHandler};

pub struct SessionEventRouter {
    goals: Arc<DailyGoalService>,
}

impl SessionEventRouter {
    /// Keys the reward worker's queue binds.
    pub const ROUTING_KEYS: [&'static str; 3] = [
        SessionCreated::EVENT_TYPE,
        SessionUpdated::EVENT_TYPE,
        SessionDeleted::EVENT_TYPE,
    ];

    pub fn new(goals: Arc<DailyGoalService>) -> Self {
        Self { goals }
    }
}

fn decode<T: DeserializeOwned>(routing_key: &str, body: &[u8]) -> Result<T, ConsumeError> {
    serde_json::from_slice(body).map_err(|e| ConsumeError::malformed(routing_key, e))
}

#[async_trait]
impl MessageHandler for SessionEventRouter {
    async fn handle(&self, routing_key: &str, body: &[u8]) -> Result<(), ConsumeError> {
        match routing_key {
            SessionCreated::EVENT_TYPE => {
                let event: SessionCreated = decode(routing_key, body)?;
                info!(
                    session_id = %event.session_id,
                    user_id = %event.user_id,
                    topic = %event.topic,
                    "Session created"
                );
            }
            SessionUpdated::EVENT_TYPE => {
                let event: SessionUpdated = decode(routing_key, body)?;
                self.goals.on_session_updated(&event).await?;
            }
            SessionDeleted::EVENT_TYPE => {
                let event: SessionDeleted = decode(routing_key, body)?;
                self.goals.on_session_deleted(&event).await?;
            }
            other => {
                warn!(routing_key = %other, "No route for message, dropping");
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "SessionEventRouter"
    }
}
