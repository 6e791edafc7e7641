//! HTTP adapters.
//!
//! - `internal` - The session service's internal endpoint (axum)
//! - `HttpSessionApiClient` - The reward worker's client for it (reqwest)

pub mod internal;
mod session_api_client;

pub use internal::{internal_routes, InternalSessionHandlers};
pub use session_api_client::HttpSessionApiClient;
