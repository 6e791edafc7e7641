//! Session domain - the focus session record and the events it emits.

mod aggregate;
mod errors;
mod events;

pub use aggregate::FocusSession;
pub use errors::SessionError;
pub use events::{SessionCreated, SessionDeleted, SessionUpdated};
