//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the application to external systems:
//! - `events` - Outbox publisher, event consumer and the in-memory broker
//! - `http` - Internal session endpoint and its client
//! - `memory` - In-memory stores for tests and local runs
//! - `postgres` - Session store, outbox store and focus ledger
//! - `redis` - Redis streams broker

pub mod events;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod redis;

pub use events::{
    EventConsumer, EventConsumerConfig, InMemoryBroker, OutboxPublisher, OutboxPublisherConfig,
};
