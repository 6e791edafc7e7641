//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, and error types that form the
//! vocabulary of the FocusTrack domain.

mod calendar_date;
mod errors;
mod events;
mod ids;
mod minutes;
mod timestamp;

pub use calendar_date::CalendarDate;
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use events::{domain_event, DomainEvent, SerializableDomainEvent};
pub use ids::{OutboxEventId, SessionId, UserId};
pub use minutes::FocusMinutes;
pub use timestamp::Timestamp;
