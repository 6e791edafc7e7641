//! In-memory store adapters for tests and local development.

mod focus_ledger;
mod session_store;

pub use focus_ledger::InMemoryFocusLedger;
pub use session_store::InMemorySessionStore;
