//! EventConsumer - Background service that drains one durable queue.
//!
//! For each delivery:
//! - routing key with a registered handler → handle, then settle
//! - success → ack
//! - handler failure → nack with requeue (retried indefinitely)
//! - malformed payload → nack with requeue until `max_delivery_attempts`,
//!   then dead-letter
//! - no handler for the routing key → warn and ack
//!
//! A delivery is never acked before its handler returned.
//!
//! ## Graceful Shutdown
//!
//! On shutdown the consumer stops taking deliveries. A handler already
//! running gets `shutdown_grace` to finish; if it does not, its delivery is
//! left unsettled and the broker redelivers it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::domain::foundation::DomainError;
use crate::ports::{
    ConsumeError, Delivery, MessageHandler, MessageSubscriber, QueueBinding, Subscription,
};

/// Configuration for the EventConsumer service.
#[derive(Debug, Clone)]
pub struct EventConsumerConfig {
    /// Durable queue (consumer group) name.
    pub queue: String,

    /// Max unacknowledged deliveries.
    pub prefetch: u16,

    /// Attempts after which a malformed message is dead-lettered.
    pub max_delivery_attempts: u32,

    /// How long one receive call waits before re-checking shutdown.
    pub receive_timeout: Duration,

    /// Delay between subscribe attempts while the broker is unreachable.
    pub reconnect_delay: Duration,

    /// Time an in-flight handler gets to finish after shutdown.
    pub shutdown_grace: Duration,
}

impl EventConsumerConfig {
    pub fn new(queue: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            prefetch: 1,
            max_delivery_attempts: 5,
            receive_timeout: Duration::from_secs(1),
            reconnect_delay: Duration::from_secs(5),
            shutdown_grace: Duration::from_secs(10),
        }
    }

    pub fn with_prefetch(mut self, prefetch: u16) -> Self {
        self.prefetch = prefetch;
        self
    }

    pub fn with_max_delivery_attempts(mut self, attempts: u32) -> Self {
        self.max_delivery_attempts = attempts;
        self
    }

    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }
}

/// How a delivery was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Acked,
    Requeued,
    DeadLettered,
    /// No handler for the routing key; acked without processing.
    Dropped,
}

/// Background service that consumes one queue and dispatches by routing key.
pub struct EventConsumer {
    subscriber: Arc<dyn MessageSubscriber>,
    handlers: HashMap<String, Arc<dyn MessageHandler>>,
    config: EventConsumerConfig,
}

impl EventConsumer {
    pub fn new(subscriber: Arc<dyn MessageSubscriber>, config: EventConsumerConfig) -> Self {
        Self {
            subscriber,
            handlers: HashMap::new(),
            config,
        }
    }

    /// Register `handler` for a routing key; the queue binds every
    /// registered key.
    pub fn subscribe(mut self, routing_key: &str, handler: Arc<dyn MessageHandler>) -> Self {
        self.handlers.insert(routing_key.to_string(), handler);
        self
    }

    /// Register the same handler for several routing keys.
    pub fn subscribe_all(mut self, routing_keys: &[&str], handler: Arc<dyn MessageHandler>) -> Self {
        for key in routing_keys {
            self = self.subscribe(key, handler.clone());
        }
        self
    }

    /// Queue declaration derived from the registered handlers.
    pub fn binding(&self) -> QueueBinding {
        let mut keys: Vec<&String> = self.handlers.keys().collect();
        keys.sort();
        keys.into_iter().fold(
            QueueBinding::new(self.config.queue.clone()).with_prefetch(self.config.prefetch),
            |binding, key| binding.bind(key.clone()),
        )
    }

    /// Run the consumer loop until the shutdown signal is received.
    ///
    /// Broker errors are logged and retried; the loop only returns on
    /// shutdown.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let binding = self.binding();
        let Some(mut subscription) = self.connect(&binding, &mut shutdown).await else {
            return;
        };

        info!(
            queue = %binding.queue,
            routing_keys = ?binding.routing_keys,
            prefetch = binding.prefetch,
            "Event consumer started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let next = tokio::select! {
                _ = shutdown_requested(&mut shutdown) => break,
                next = subscription.next_delivery(self.config.receive_timeout) => next,
            };

            match next {
                Ok(Some(delivery)) => {
                    if !self
                        .process_with_grace(subscription.as_mut(), delivery, &mut shutdown)
                        .await
                    {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    error!(queue = %binding.queue, error = %e, "Failed to receive delivery");
                    tokio::select! {
                        _ = shutdown_requested(&mut shutdown) => break,
                        _ = time::sleep(self.config.reconnect_delay) => {}
                    }
                    match self.connect(&binding, &mut shutdown).await {
                        Some(fresh) => subscription = fresh,
                        None => break,
                    }
                }
            }
        }

        info!(queue = %binding.queue, "Event consumer stopped");
    }

    /// Subscribes, retrying until it succeeds or shutdown is requested.
    async fn connect(
        &self,
        binding: &QueueBinding,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Option<Box<dyn Subscription>> {
        loop {
            if *shutdown.borrow() {
                return None;
            }
            match self.subscriber.subscribe(binding).await {
                Ok(subscription) => return Some(subscription),
                Err(e) => {
                    warn!(queue = %binding.queue, error = %e, "Subscribe failed, retrying");
                    tokio::select! {
                        _ = shutdown_requested(shutdown) => return None,
                        _ = time::sleep(self.config.reconnect_delay) => {}
                    }
                }
            }
        }
    }

    /// Returns `false` when shutdown cut the handler off.
    async fn process_with_grace(
        &self,
        subscription: &mut dyn Subscription,
        delivery: Delivery,
        shutdown: &mut watch::Receiver<bool>,
    ) -> bool {
        let outcome = {
            let handling = self.dispatch(&delivery);
            tokio::pin!(handling);

            tokio::select! {
                outcome = &mut handling => outcome,
                _ = shutdown_requested(shutdown) => {
                    match time::timeout(self.config.shutdown_grace, &mut handling).await {
                        Ok(outcome) => outcome,
                        Err(_) => {
                            warn!(
                                routing_key = %delivery.routing_key,
                                "Handler exceeded shutdown grace period, leaving delivery for redelivery"
                            );
                            return false;
                        }
                    }
                }
            }
        };

        if let Err(e) = self.settle(subscription, &delivery, outcome).await {
            warn!(
                routing_key = %delivery.routing_key,
                error = %e,
                "Failed to settle delivery, broker will redeliver"
            );
        }
        true
    }

    /// Runs the handler for one delivery and settles it.
    ///
    /// This method is also useful for testing without running the full loop.
    pub async fn process_delivery(
        &self,
        subscription: &mut dyn Subscription,
        delivery: Delivery,
    ) -> Result<Settlement, DomainError> {
        let outcome = self.dispatch(&delivery).await;
        self.settle(subscription, &delivery, outcome).await
    }

    async fn dispatch(&self, delivery: &Delivery) -> Option<Result<(), ConsumeError>> {
        let handler = self.handlers.get(&delivery.routing_key)?;
        debug!(
            handler = handler.name(),
            routing_key = %delivery.routing_key,
            attempt = delivery.attempt,
            "Dispatching delivery"
        );
        Some(handler.handle(&delivery.routing_key, &delivery.body).await)
    }

    async fn settle(
        &self,
        subscription: &mut dyn Subscription,
        delivery: &Delivery,
        outcome: Option<Result<(), ConsumeError>>,
    ) -> Result<Settlement, DomainError> {
        match outcome {
            None => {
                warn!(routing_key = %delivery.routing_key, "Unknown routing key, dropping message");
                subscription.ack(delivery).await?;
                Ok(Settlement::Dropped)
            }
            Some(Ok(())) => {
                subscription.ack(delivery).await?;
                Ok(Settlement::Acked)
            }
            Some(Err(e)) if e.is_malformed() && delivery.attempt >= self.config.max_delivery_attempts => {
                error!(
                    routing_key = %delivery.routing_key,
                    attempt = delivery.attempt,
                    error = %e,
                    "Malformed message exhausted its attempts, dead-lettering"
                );
                subscription.dead_letter(delivery, &e.to_string()).await?;
                Ok(Settlement::DeadLettered)
            }
            Some(Err(e)) => {
                error!(
                    routing_key = %delivery.routing_key,
                    attempt = delivery.attempt,
                    error = %e,
                    "Error processing message, requeueing"
                );
                subscription.nack(delivery, true).await?;
                Ok(Settlement::Requeued)
            }
        }
    }
}

/// Resolves once shutdown is signalled or the sender is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryBroker;
    use crate::domain::foundation::ErrorCode;
    use crate::ports::MessagePublisher;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const QUEUE: &str = "test-queue";

    enum Behaviour {
        Succeed,
        Fail,
        Malformed,
        Slow(Duration),
    }

    struct TestHandler {
        behaviour: Behaviour,
        calls: AtomicUsize,
    }

    impl TestHandler {
        fn new(behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                behaviour,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MessageHandler for TestHandler {
        async fn handle(&self, routing_key: &str, _body: &[u8]) -> Result<(), ConsumeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behaviour {
                Behaviour::Succeed => Ok(()),
                Behaviour::Fail => {
                    Err(DomainError::new(ErrorCode::DatabaseError, "db down").into())
                }
                Behaviour::Malformed => Err(ConsumeError::malformed(routing_key, "bad json")),
                Behaviour::Slow(delay) => {
                    time::sleep(*delay).await;
                    Ok(())
                }
            }
        }

        fn name(&self) -> &'static str {
            "TestHandler"
        }
    }

    fn consumer(broker: &InMemoryBroker, handler: Arc<TestHandler>) -> EventConsumer {
        EventConsumer::new(
            Arc::new(broker.clone()),
            EventConsumerConfig::new(QUEUE)
                .with_max_delivery_attempts(3)
                .with_receive_timeout(Duration::from_millis(10))
                .with_reconnect_delay(Duration::from_millis(10)),
        )
        .subscribe("Known", handler)
    }

    async fn receive(sub: &mut Box<dyn Subscription>) -> Delivery {
        sub.next_delivery(Duration::from_millis(50))
            .await
            .unwrap()
            .expect("a delivery")
    }

    #[test]
    fn binding_covers_registered_keys() {
        let broker = InMemoryBroker::new();
        let handler = TestHandler::new(Behaviour::Succeed);
        let consumer = EventConsumer::new(
            Arc::new(broker),
            EventConsumerConfig::new(QUEUE).with_prefetch(4),
        )
        .subscribe_all(&["B", "A"], handler);

        let binding = consumer.binding();
        assert_eq!(binding.queue, QUEUE);
        assert_eq!(binding.routing_keys, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(binding.prefetch, 4);
    }

    #[tokio::test]
    async fn successful_handling_acks() {
        let broker = InMemoryBroker::new();
        let handler = TestHandler::new(Behaviour::Succeed);
        let consumer = consumer(&broker, handler.clone());
        let mut sub = broker.subscribe(&consumer.binding()).await.unwrap();
        broker.publish("Known", b"{}").await.unwrap();

        let delivery = receive(&mut sub).await;
        let settlement = consumer.process_delivery(sub.as_mut(), delivery).await.unwrap();

        assert_eq!(settlement, Settlement::Acked);
        assert_eq!(handler.calls(), 1);
        assert_eq!(broker.queue_depth(QUEUE), 0);
    }

    #[tokio::test]
    async fn handler_failure_requeues_without_limit() {
        let broker = InMemoryBroker::new();
        let handler = TestHandler::new(Behaviour::Fail);
        let consumer = consumer(&broker, handler.clone());
        let mut sub = broker.subscribe(&consumer.binding()).await.unwrap();
        broker.publish("Known", b"{}").await.unwrap();

        for attempt in 1..=5 {
            let delivery = receive(&mut sub).await;
            assert_eq!(delivery.attempt, attempt);
            let settlement = consumer.process_delivery(sub.as_mut(), delivery).await.unwrap();
            assert_eq!(settlement, Settlement::Requeued);
        }
        assert!(broker.dead_letters(QUEUE).is_empty());
    }

    #[tokio::test]
    async fn malformed_message_is_dead_lettered_after_max_attempts() {
        let broker = InMemoryBroker::new();
        let handler = TestHandler::new(Behaviour::Malformed);
        let consumer = consumer(&broker, handler.clone());
        let mut sub = broker.subscribe(&consumer.binding()).await.unwrap();
        broker.publish("Known", b"not json").await.unwrap();

        let mut settlements = Vec::new();
        for _ in 0..3 {
            let delivery = receive(&mut sub).await;
            settlements.push(consumer.process_delivery(sub.as_mut(), delivery).await.unwrap());
        }

        assert_eq!(
            settlements,
            vec![Settlement::Requeued, Settlement::Requeued, Settlement::DeadLettered]
        );
        assert_eq!(broker.dead_letters(QUEUE).len(), 1);
        assert_eq!(broker.queue_depth(QUEUE), 0);
    }

    #[tokio::test]
    async fn unknown_routing_key_is_acked_and_dropped() {
        let broker = InMemoryBroker::new();
        let handler = TestHandler::new(Behaviour::Succeed);
        let consumer = consumer(&broker, handler.clone());
        let mut sub = broker
            .subscribe(&consumer.binding().bind("Stray"))
            .await
            .unwrap();
        broker.publish("Stray", b"{}").await.unwrap();

        let delivery = receive(&mut sub).await;
        let settlement = consumer.process_delivery(sub.as_mut(), delivery).await.unwrap();

        assert_eq!(settlement, Settlement::Dropped);
        assert_eq!(handler.calls(), 0);
        assert_eq!(broker.queue_depth(QUEUE), 0);
    }

    #[tokio::test]
    async fn run_processes_until_shutdown() {
        let broker = InMemoryBroker::new();
        let handler = TestHandler::new(Behaviour::Succeed);
        let consumer = Arc::new(consumer(&broker, handler.clone()));
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn({
            let consumer = consumer.clone();
            async move { consumer.run(rx).await }
        });

        // Queue is declared by the consumer; wait for it before publishing
        while broker.queue_depth(QUEUE) == 0 && handler.calls() == 0 {
            broker.publish("Known", b"{}").await.unwrap();
            time::sleep(Duration::from_millis(10)).await;
        }
        time::timeout(Duration::from_secs(1), async {
            while broker.queue_depth(QUEUE) > 0 {
                time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        tx.send(true).unwrap();
        time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
        assert!(handler.calls() >= 1);
    }

    #[tokio::test]
    async fn run_retries_subscribe_while_broker_is_down() {
        let broker = InMemoryBroker::new();
        broker.set_unavailable(true);
        let handler = TestHandler::new(Behaviour::Succeed);
        let consumer = Arc::new(consumer(&broker, handler.clone()));
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn({
            let consumer = consumer.clone();
            async move { consumer.run(rx).await }
        });
        time::sleep(Duration::from_millis(30)).await;
        assert!(!handle.is_finished());

        broker.set_unavailable(false);
        time::timeout(Duration::from_secs(1), async {
            while handler.calls() == 0 {
                if broker.queue_depth(QUEUE) == 0 {
                    broker.publish("Known", b"{}").await.unwrap();
                }
                time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        tx.send(true).unwrap();
        time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn shutdown_interrupts_reconnect_delay_after_receive_error() {
        let broker = InMemoryBroker::new();
        let handler = TestHandler::new(Behaviour::Succeed);
        let consumer = Arc::new(
            EventConsumer::new(
                Arc::new(broker.clone()),
                EventConsumerConfig::new(QUEUE)
                    .with_receive_timeout(Duration::from_millis(10))
                    .with_reconnect_delay(Duration::from_secs(30)),
            )
            .subscribe("Known", handler.clone()),
        );
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn({
            let consumer = consumer.clone();
            async move { consumer.run(rx).await }
        });

        // Wait until the consumer is subscribed and handling
        time::timeout(Duration::from_secs(1), async {
            while handler.calls() == 0 {
                if broker.queue_depth(QUEUE) == 0 {
                    broker.publish("Known", b"{}").await.unwrap();
                }
                time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        broker.set_unavailable(true);
        time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();

        time::timeout(Duration::from_millis(500), handle)
            .await
            .expect("consumer stops without waiting out the reconnect delay")
            .unwrap();
    }

    #[tokio::test]
    async fn slow_handler_past_grace_is_left_for_redelivery() {
        let broker = InMemoryBroker::new();
        let handler = TestHandler::new(Behaviour::Slow(Duration::from_secs(5)));
        let consumer = Arc::new(
            EventConsumer::new(
                Arc::new(broker.clone()),
                EventConsumerConfig::new(QUEUE)
                    .with_receive_timeout(Duration::from_millis(10))
                    .with_shutdown_grace(Duration::from_millis(20)),
            )
            .subscribe("Known", handler.clone()),
        );
        // Declare the queue up front so the publish is routed
        drop(broker.subscribe(&consumer.binding()).await.unwrap());
        broker.publish("Known", b"{}").await.unwrap();

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn({
            let consumer = consumer.clone();
            async move { consumer.run(rx).await }
        });
        time::timeout(Duration::from_secs(1), async {
            while handler.calls() == 0 {
                time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        tx.send(true).unwrap();
        time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();

        // Subscription dropped with the delivery unsettled
        assert_eq!(broker.queue_depth(QUEUE), 1);
    }
}
