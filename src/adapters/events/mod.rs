//! Messaging adapters.
//!
//! - `InMemoryBroker` - In-process topic exchange for tests and local runs
//! - `OutboxPublisher` - Background service relaying outbox rows to the broker
//! - `EventConsumer` - Background service draining one durable queue

mod event_consumer;
mod in_memory;
mod outbox_publisher;

pub use event_consumer::{EventConsumer, EventConsumerConfig, Settlement};
pub use in_memory::{DeadLetter, InMemoryBroker};
pub use outbox_publisher::{BatchReport, OutboxPublisher, OutboxPublisherConfig};
