//! In-memory message broker for tests and local development.
//!
//! Emulates a topic exchange with durable queues, using the same queue model
//! as `RedisStreamBroker`:
//! - a published message is copied into every queue bound to its routing key
//! - a queue is one FIFO across all its keys, capped per subscription by prefetch
//! - each queue hands a message to one subscription at a time
//! - unacknowledged messages return to the queue when nacked with requeue or
//!   when their subscription is dropped, with the attempt counter bumped
//! - dead-lettered messages are kept per queue for inspection
//!
//! Messages to keys with no bound queue are dropped, as on a real exchange.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::{self, Instant};

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{
    Delivery, DeliveryTag, MessagePublisher, MessageSubscriber, QueueBinding, Subscription,
};

/// A message moved to a queue's dead-letter destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetter {
    pub routing_key: String,
    pub body: Vec<u8>,
    pub attempt: u32,
    pub reason: String,
}

#[derive(Debug, Clone)]
struct QueuedMessage {
    routing_key: String,
    body: Vec<u8>,
    attempt: u32,
}

#[derive(Debug, Default)]
struct QueueState {
    bindings: HashSet<String>,
    ready: VecDeque<QueuedMessage>,
    unacked: HashMap<DeliveryTag, QueuedMessage>,
    dead_letters: Vec<DeadLetter>,
    notify: Arc<Notify>,
}

impl QueueState {
    fn enqueue(&mut self, message: QueuedMessage) {
        self.ready.push_back(message);
        self.notify.notify_one();
    }
}

#[derive(Debug, Default)]
struct BrokerState {
    queues: HashMap<String, QueueState>,
    published: Vec<(String, Vec<u8>)>,
    next_tag: u64,
    unavailable: bool,
}

/// In-memory topic exchange.
///
/// Cheap to clone; clones share the same queues.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

fn lock(state: &Mutex<BrokerState>) -> MutexGuard<'_, BrokerState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn unavailable() -> DomainError {
    DomainError::new(ErrorCode::BrokerError, "Broker unavailable")
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    // === Test Helpers ===

    /// Makes every publish and subscribe fail until called with `false`.
    pub fn set_unavailable(&self, unavailable: bool) {
        lock(&self.state).unavailable = unavailable;
    }

    /// Every accepted publish, in order, bound or not.
    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        lock(&self.state).published.clone()
    }

    pub fn published_with_key(&self, routing_key: &str) -> Vec<Vec<u8>> {
        lock(&self.state)
            .published
            .iter()
            .filter(|(key, _)| key == routing_key)
            .map(|(_, body)| body.clone())
            .collect()
    }

    /// Ready plus unacknowledged messages in `queue`.
    pub fn queue_depth(&self, queue: &str) -> usize {
        lock(&self.state)
            .queues
            .get(queue)
            .map(|q| q.ready.len() + q.unacked.len())
            .unwrap_or(0)
    }

    pub fn dead_letters(&self, queue: &str) -> Vec<DeadLetter> {
        lock(&self.state)
            .queues
            .get(queue)
            .map(|q| q.dead_letters.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MessagePublisher for InMemoryBroker {
    async fn publish(&self, routing_key: &str, body: &[u8]) -> Result<(), DomainError> {
        let mut state = lock(&self.state);
        if state.unavailable {
            return Err(unavailable());
        }

        state.published.push((routing_key.to_string(), body.to_vec()));
        for queue in state.queues.values_mut() {
            if queue.bindings.contains(routing_key) {
                queue.enqueue(QueuedMessage {
                    routing_key: routing_key.to_string(),
                    body: body.to_vec(),
                    attempt: 1,
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl MessageSubscriber for InMemoryBroker {
    async fn subscribe(
        &self,
        binding: &QueueBinding,
    ) -> Result<Box<dyn Subscription>, DomainError> {
        let mut state = lock(&self.state);
        if state.unavailable {
            return Err(unavailable());
        }

        let queue = state.queues.entry(binding.queue.clone()).or_default();
        queue.bindings.extend(binding.routing_keys.iter().cloned());
        let notify = queue.notify.clone();

        Ok(Box::new(InMemorySubscription {
            state: self.state.clone(),
            queue: binding.queue.clone(),
            prefetch: usize::from(binding.prefetch.max(1)),
            held: HashSet::new(),
            notify,
        }))
    }
}

struct InMemorySubscription {
    state: Arc<Mutex<BrokerState>>,
    queue: String,
    prefetch: usize,
    held: HashSet<DeliveryTag>,
    notify: Arc<Notify>,
}

impl InMemorySubscription {
    fn try_take(&mut self) -> Option<Delivery> {
        if self.held.len() >= self.prefetch {
            return None;
        }

        let mut state = lock(&self.state);
        state.next_tag += 1;
        let tag = DeliveryTag(format!("{}-{}", self.queue, state.next_tag));

        let queue = state.queues.get_mut(&self.queue)?;
        let message = queue.ready.pop_front()?;
        queue.unacked.insert(tag.clone(), message.clone());
        self.held.insert(tag.clone());

        Some(Delivery {
            tag,
            routing_key: message.routing_key,
            body: message.body,
            attempt: message.attempt,
        })
    }

    fn settle(&mut self, delivery: &Delivery) -> Result<(MutexGuard<'_, BrokerState>, QueuedMessage), DomainError> {
        if !self.held.remove(&delivery.tag) {
            return Err(DomainError::broker(
                "settle delivery",
                format!("unknown delivery tag {}", delivery.tag.0),
            ));
        }
        let mut state = lock(&self.state);
        let message = state
            .queues
            .get_mut(&self.queue)
            .and_then(|q| q.unacked.remove(&delivery.tag))
            .ok_or_else(|| {
                DomainError::broker("settle delivery", format!("queue {} missing", self.queue))
            })?;
        Ok((state, message))
    }
}

#[async_trait]
impl Subscription for InMemorySubscription {
    async fn next_delivery(&mut self, wait: Duration) -> Result<Option<Delivery>, DomainError> {
        let deadline = Instant::now() + wait;
        loop {
            if lock(&self.state).unavailable {
                return Err(unavailable());
            }
            if let Some(delivery) = self.try_take() {
                return Ok(Some(delivery));
            }
            let notified = self.notify.notified();
            if time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn ack(&mut self, delivery: &Delivery) -> Result<(), DomainError> {
        self.settle(delivery)?;
        Ok(())
    }

    async fn nack(&mut self, delivery: &Delivery, requeue: bool) -> Result<(), DomainError> {
        let queue_name = self.queue.clone();
        let (mut state, mut message) = self.settle(delivery)?;
        if requeue {
            message.attempt += 1;
            if let Some(queue) = state.queues.get_mut(&queue_name) {
                queue.enqueue(message);
            }
        }
        Ok(())
    }

    async fn dead_letter(&mut self, delivery: &Delivery, reason: &str) -> Result<(), DomainError> {
        let queue_name = self.queue.clone();
        let (mut state, message) = self.settle(delivery)?;
        if let Some(queue) = state.queues.get_mut(&queue_name) {
            queue.dead_letters.push(DeadLetter {
                routing_key: message.routing_key,
                body: message.body,
                attempt: message.attempt,
                reason: reason.to_string(),
            });
        }
        Ok(())
    }
}

impl Drop for InMemorySubscription {
    /// Unsettled deliveries go back to the queue, as after a consumer crash.
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        if let Some(queue) = state.queues.get_mut(&self.queue) {
            for tag in self.held.drain() {
                if let Some(mut message) = queue.unacked.remove(&tag) {
                    message.attempt += 1;
                    queue.enqueue(message);
                }
            }
        }
    }
}
