//! EventWriter - stages domain events in the outbox.
//!
//! Called by command handlers with the transaction they already hold. The
//! writer never talks to the broker; the outbox publisher picks rows up after
//! the transaction commits.

use tracing::debug;

use crate::domain::foundation::{DomainError, SerializableDomainEvent};
use crate::ports::{NewOutboxEvent, OutboxSink};

#[derive(Debug, Clone, Copy, Default)]
pub struct EventWriter;

impl EventWriter {
    pub fn new() -> Self {
        Self
    }

    /// Serializes `event` and stages it in `sink` as an unprocessed row.
    ///
    /// A serialization error is returned before anything is staged; the
    /// caller drops its transaction and nothing is written.
    pub async fn record<S, E>(&self, sink: &mut S, event: &E) -> Result<(), DomainError>
    where
        S: OutboxSink + ?Sized,
        E: SerializableDomainEvent,
    {
        let payload = event.to_payload()?;
        let event_type = event.event_type();

        sink.append(NewOutboxEvent::new(event_type, payload)).await?;

        debug!(
            event_type = %event_type,
            aggregate_id = %event.aggregate_id(),
            "Staged outbox event"
        );
        Ok(())
    }
}
