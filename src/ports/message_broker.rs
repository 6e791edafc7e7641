//! Message broker ports - topic-routed publish and durable queue subscriptions.
//!
//! The broker is an external collaborator. Its delivery semantics shape
//! everything downstream:
//! - at-least-once: a message may arrive more than once
//! - redelivery after `nack(requeue = true)` or a consumer crash
//! - ordering only per queue, never globally

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::foundation::DomainError;

/// Port for publishing raw messages to the topic exchange.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Publish `body` with the given routing key.
    ///
    /// `Ok` means the broker accepted the message durably.
    async fn publish(&self, routing_key: &str, body: &[u8]) -> Result<(), DomainError>;
}

/// A durable queue and the routing keys bound to it.
///
/// Each consuming service owns its own queue, so each sees an independent
/// at-least-once stream of the keys it binds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueBinding {
    pub queue: String,
    pub routing_keys: Vec<String>,
    /// Max unacknowledged deliveries held by one subscription.
    pub prefetch: u16,
}

impl QueueBinding {
    pub fn new(queue: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            routing_keys: Vec::new(),
            prefetch: 1,
        }
    }

    pub fn bind(mut self, routing_key: impl Into<String>) -> Self {
        let key = routing_key.into();
        if !self.routing_keys.contains(&key) {
            self.routing_keys.push(key);
        }
        self
    }

    pub fn with_prefetch(mut self, prefetch: u16) -> Self {
        self.prefetch = prefetch.max(1);
        self
    }
}

/// Broker-assigned handle used to settle a delivery.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeliveryTag(pub String);

/// One message handed to one subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub tag: DeliveryTag,
    pub routing_key: String,
    pub body: Vec<u8>,
    /// 1 on first delivery, incremented on every requeue.
    pub attempt: u32,
}

/// Port for opening durable subscriptions.
#[async_trait]
pub trait MessageSubscriber: Send + Sync {
    /// Declares the queue and its bindings (idempotent) and opens a subscription.
    async fn subscribe(&self, binding: &QueueBinding)
        -> Result<Box<dyn Subscription>, DomainError>;
}

/// An open subscription to one queue.
///
/// Every delivery must be settled exactly once with `ack`, `nack` or
/// `dead_letter`.
#[async_trait]
pub trait Subscription: Send {
    /// Waits up to `wait` for the next delivery; `None` on timeout.
    async fn next_delivery(&mut self, wait: Duration) -> Result<Option<Delivery>, DomainError>;

    /// Removes the message from the queue.
    async fn ack(&mut self, delivery: &Delivery) -> Result<(), DomainError>;

    /// Rejects the message; with `requeue` it is delivered again later.
    async fn nack(&mut self, delivery: &Delivery, requeue: bool) -> Result<(), DomainError>;

    /// Moves the message to the queue's dead-letter destination.
    async fn dead_letter(&mut self, delivery: &Delivery, reason: &str)
        -> Result<(), DomainError>;
}
