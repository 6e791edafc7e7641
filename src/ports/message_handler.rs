//! MessageHandler port - consumer-side processing of one routed message.
//!
//! Handlers see raw bodies and deserialize them themselves; the consumer
//! only routes by key and settles deliveries from the returned outcome.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::DomainError;

/// Why a handler could not process a message.
///
/// Both variants lead to a requeue. A `Malformed` message is dead-lettered
/// once its attempts run out; a `Handler` failure is requeued indefinitely.
#[derive(Debug, Error)]
pub enum ConsumeError {
    /// The body does not deserialize into the type its routing key names.
    #[error("malformed {routing_key} payload: {reason}")]
    Malformed { routing_key: String, reason: String },

    /// Processing failed; a later attempt may succeed.
    #[error("{0}")]
    Handler(#[from] DomainError),
}

impl ConsumeError {
    pub fn malformed(routing_key: impl Into<String>, reason: impl ToString) -> Self {
        Self::Malformed {
            routing_key: routing_key.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }
}

/// Processes one message.
///
/// Implementations must be idempotent: the same message can arrive any
/// number of times, concurrently on several consumers.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, routing_key: &str, body: &[u8]) -> Result<(), ConsumeError>;

    /// Handler name for logging.
    fn name(&self) -> &'static str;
}
