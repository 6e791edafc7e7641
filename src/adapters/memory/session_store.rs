//! In-Memory Session Store Adapter
//!
//! Sessions and the outbox behind one lock. A transaction holds the lock
//! from `begin` until it is committed or dropped and works on a private copy,
//! so a dropped transaction leaves no trace. Useful for testing and local
//! development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::foundation::{DomainError, ErrorCode, OutboxEventId, SessionId, Timestamp};
use crate::domain::session::FocusSession;
use crate::ports::{
    NewOutboxEvent, OutboxEvent, OutboxSink, OutboxStore, SessionTransaction, SessionUnitOfWork,
};

#[derive(Debug, Clone, Default)]
struct StoreState {
    sessions: HashMap<SessionId, FocusSession>,
    outbox: Vec<OutboxEvent>,
    next_outbox_id: i64,
}

/// In-memory session store with a transactional outbox.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    // === Test Helpers ===

    pub async fn session(&self, id: &SessionId) -> Option<FocusSession> {
        self.state.lock().await.sessions.get(id).cloned()
    }

    pub async fn session_count(&self) -> usize {
        self.state.lock().await.sessions.len()
    }

    /// All outbox rows, processed or not, in id order.
    pub async fn outbox_rows(&self) -> Vec<OutboxEvent> {
        self.state.lock().await.outbox.clone()
    }

    pub async fn unprocessed_count(&self) -> usize {
        self.state
            .lock()
            .await
            .outbox
            .iter()
            .filter(|row| !row.is_processed())
            .count()
    }
}

#[async_trait]
impl SessionUnitOfWork for InMemorySessionStore {
    async fn begin(&self) -> Result<Box<dyn SessionTransaction>, DomainError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemorySessionTransaction { guard, working }))
    }
}

#[async_trait]
impl OutboxStore for InMemorySessionStore {
    async fn fetch_unprocessed(&self, limit: u32) -> Result<Vec<OutboxEvent>, DomainError> {
        let state = self.state.lock().await;
        let mut rows: Vec<OutboxEvent> = state
            .outbox
            .iter()
            .filter(|row| !row.is_processed())
            .cloned()
            .collect();
        rows.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn mark_processed(
        &self,
        ids: &[OutboxEventId],
        processed_at: Timestamp,
    ) -> Result<u64, DomainError> {
        let mut state = self.state.lock().await;
        let mut marked = 0;
        for row in state.outbox.iter_mut() {
            if row.processed_at.is_none() && ids.contains(&row.id) {
                row.processed_at = Some(processed_at);
                marked += 1;
            }
        }
        Ok(marked)
    }
}

struct InMemorySessionTransaction {
    guard: OwnedMutexGuard<StoreState>,
    working: StoreState,
}

#[async_trait]
impl OutboxSink for InMemorySessionTransaction {
    async fn append(&mut self, event: NewOutboxEvent) -> Result<(), DomainError> {
        self.working.next_outbox_id += 1;
        self.working.outbox.push(OutboxEvent {
            id: OutboxEventId::new(self.working.next_outbox_id),
            event_type: event.event_type,
            payload: event.payload,
            created_at: event.created_at,
            processed_at: None,
        });
        Ok(())
    }
}

#[async_trait]
impl SessionTransaction for InMemorySessionTransaction {
    async fn find(&mut self, id: &SessionId) -> Result<Option<FocusSession>, DomainError> {
        Ok(self.working.sessions.get(id).cloned())
    }

    async fn insert(&mut self, session: &FocusSession) -> Result<(), DomainError> {
        if self.working.sessions.contains_key(session.id()) {
            return Err(DomainError::new(
                ErrorCode::DatabaseError,
                format!("Session {} already exists", session.id()),
            ));
        }
        self.working.sessions.insert(*session.id(), session.clone());
        Ok(())
    }

    async fn update(&mut self, session: &FocusSession) -> Result<(), DomainError> {
        match self.working.sessions.get_mut(session.id()) {
            Some(existing) => {
                *existing = session.clone();
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::SessionNotFound,
                format!("Session not found: {}", session.id()),
            )),
        }
    }

    async fn delete(&mut self, id: &SessionId) -> Result<(), DomainError> {
        self.working.sessions.remove(id).map(|_| ()).ok_or_else(|| {
            DomainError::new(
                ErrorCode::SessionNotFound,
                format!("Session not found: {}", id),
            )
        })
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        let Self { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
