//! Session repository port (write side, transactional).
//!
//! Every session mutation runs inside one unit of work that also stages the
//! matching outbox row, so a committed change always has its event and a
//! rolled-back change never does.
//!
//! # Design
//!
//! - **One transaction per command**: `begin` opens it, `commit` ends it
//! - **Rollback on drop**: a transaction dropped without `commit` is discarded
//! - **Row locking**: `find` locks the row for the rest of the transaction

use async_trait::async_trait;

use super::OutboxSink;
use crate::domain::foundation::{DomainError, SessionId};
use crate::domain::session::FocusSession;

/// Opens transactions against the session store.
#[async_trait]
pub trait SessionUnitOfWork: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn SessionTransaction>, DomainError>;
}

/// An open transaction over sessions and the outbox.
#[async_trait]
pub trait SessionTransaction: OutboxSink {
    /// Find a session by its ID, locking it until commit.
    ///
    /// Returns `None` if not found.
    async fn find(&mut self, id: &SessionId) -> Result<Option<FocusSession>, DomainError>;

    /// Insert a new session.
    async fn insert(&mut self, session: &FocusSession) -> Result<(), DomainError>;

    /// Update an existing session.
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` if the session doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn update(&mut self, session: &FocusSession) -> Result<(), DomainError>;

    /// Delete a session.
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` if the session doesn't exist
    async fn delete(&mut self, id: &SessionId) -> Result<(), DomainError>;

    /// Make all staged changes, outbox rows included, visible at once.
    async fn commit(self: Box<Self>) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time check that traits are object-safe
    #[allow(dead_code)]
    fn assert_unit_of_work_object_safe(_: &dyn SessionUnitOfWork) {}

    #[allow(dead_code)]
    fn assert_transaction_object_safe(_: Box<dyn SessionTransaction>) {}
}
