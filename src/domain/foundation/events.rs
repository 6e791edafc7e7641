//! Event infrastructure for domain event publishing.
//!
//! - `DomainEvent` - Trait that all domain events implement
//! - `SerializableDomainEvent` - Blanket extension producing the wire payload
//! - `domain_event!` - Macro to simplify DomainEvent implementations
//!
//! The event type name is also the broker routing key, so consumers can pick
//! a deserializer without opening the payload.

use serde::Serialize;

use super::{DomainError, Timestamp};

/// Trait that all domain events must implement.
pub trait DomainEvent: Send + Sync {
    /// Returns the event type name (e.g., "SessionUpdatedEvent").
    fn event_type(&self) -> &'static str;

    /// Returns the ID of the aggregate that emitted this event.
    fn aggregate_id(&self) -> String;

    /// Returns when the event occurred.
    fn occurred_at(&self) -> Timestamp;
}

/// Extension trait that serializes a domain event into its wire payload.
///
/// Automatically implemented for any type that implements both
/// `DomainEvent` and `Serialize`.
pub trait SerializableDomainEvent: DomainEvent + Serialize {
    /// Serializes the event body as JSON.
    fn to_payload(&self) -> Result<String, DomainError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl<T: DomainEvent + Serialize> SerializableDomainEvent for T {}

/// Macro to implement DomainEvent trait with minimal boilerplate.
///
/// Also adds an `EVENT_TYPE` associated constant so routers can match on
/// the type name without an instance.
///
/// # Example
///
/// ```ignore
/// domain_event!(
///     SessionDeleted,
///     event_type = "SessionDeletedEvent",
///     aggregate_id = session_id,
///     occurred_at = deleted_at
/// );
/// ```
#[macro_export]
macro_rules! domain_event {
    (
        $event_name:ident,
        event_type = $event_type:expr,
        aggregate_id = $agg_id_field:ident,
        occurred_at = $occurred_field:ident
    ) => {
        impl $event_name {
            pub const EVENT_TYPE: &'static str = $event_type;
        }

        impl $crate::domain::foundation::DomainEvent for $event_name {
            fn event_type(&self) -> &'static str {
                $event_type
            }

            fn aggregate_id(&self) -> String {
                self.$agg_id_field.to_string()
            }

            fn occurred_at(&self) -> $crate::domain::foundation::Timestamp {
                self.$occurred_field
            }
        }
    };
}

pub use domain_event;
