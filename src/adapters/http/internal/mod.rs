//! Internal HTTP endpoint of the session service.
//!
//! Not exposed to users. The reward worker calls it to flag the session that
//! completed its owner's daily goal.

mod dto;
mod handlers;
mod routes;

pub use dto::ErrorResponse;
pub use handlers::{InternalSessionHandlers, INTERNAL_API_KEY_HEADER};
pub use routes::internal_routes;
