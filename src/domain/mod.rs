//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors, event traits)
//! - `session` - Focus session record and its lifecycle events
//! - `rewards` - Daily focus contributions and the daily goal achievement ledger

pub mod foundation;
pub mod rewards;
pub mod session;
