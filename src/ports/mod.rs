//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Outbox Ports
//!
//! - `OutboxSink` - Stages event rows inside a business transaction
//! - `OutboxStore` - Reads and marks rows for the publisher loop
//!
//! ## Messaging Ports
//!
//! - `MessagePublisher` - Publishes to the topic exchange
//! - `MessageSubscriber` / `Subscription` - Durable queue consumption
//! - `MessageHandler` - Processes one routed message
//!
//! ## Storage Ports
//!
//! - `SessionUnitOfWork` - Transactional session persistence
//! - `DailyFocusLedger` - Reward worker contributions and achievements
//!
//! ## Service Ports
//!
//! - `SessionOfRecord` - Internal call back into the session service

mod focus_ledger;
mod message_broker;
mod message_handler;
mod outbox;
mod session_api;
mod session_repository;

pub use focus_ledger::DailyFocusLedger;
pub use message_broker::{
    Delivery, DeliveryTag, MessagePublisher, MessageSubscriber, QueueBinding, Subscription,
};
pub use message_handler::{ConsumeError, MessageHandler};
pub use outbox::{NewOutboxEvent, OutboxEvent, OutboxSink, OutboxStore};
pub use session_api::{SessionApiError, SessionOfRecord};
pub use session_repository::{SessionTransaction, SessionUnitOfWork};
