//! PostgreSQL adapters - Database implementations for store ports.
//!
//! - `PostgresSessionStore` - Sessions and outbox rows in one transaction
//! - `PostgresOutboxStore` - Publisher-side outbox reads and marks
//! - `PostgresFocusLedger` - Reward worker contributions and achievements

mod focus_ledger;
mod outbox_store;
mod session_store;

pub use focus_ledger::PostgresFocusLedger;
pub use outbox_store::PostgresOutboxStore;
pub use session_store::PostgresSessionStore;

/// Migrations owned by the session service.
pub static SESSION_MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations/session");

/// Migrations owned by the reward worker.
pub static REWARDS_MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations/rewards");
