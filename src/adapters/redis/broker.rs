//! Redis Streams broker - topic exchange emulated on streams and consumer groups.
//!
//! Layout:
//! - a queue is one stream `{exchange}.q.{queue}` read by the consumer group
//!   of the same name, so the queue is a single FIFO across all its keys
//! - bindings live in the set `{exchange}.bindings.{routing_key}`, holding the
//!   names of the queues bound to that key
//! - publish appends one copy to the stream of every bound queue, atomically
//! - dead letters go to the stream `{exchange}.dlq.{queue}`
//!
//! Settlement maps onto stream commands, each run as one MULTI block:
//! - ack → XACK + XDEL
//! - nack with requeue → XADD a copy with attempt + 1, then XACK + XDEL
//! - nack without requeue → XACK + XDEL
//! - dead-letter → XADD to the dead-letter stream, then XACK + XDEL
//!
//! Settled entries are deleted, so a queue stream only holds messages that
//! are still owed to the queue. Nothing is trimmed by length; a stalled
//! consumer grows the backlog instead of losing it.
//!
//! Entries left pending by a crashed consumer are claimed with XCLAIM once
//! they have been idle for `claim_idle`.
//!
//! Messages to keys with no bound queue are dropped, as on a real exchange.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::streams::{StreamClaimReply, StreamId, StreamPendingCountReply, StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::BrokerConfig;
use crate::domain::foundation::DomainError;
use crate::ports::{
    Delivery, DeliveryTag, MessagePublisher, MessageSubscriber, QueueBinding, Subscription,
};

const FIELD_ROUTING_KEY: &str = "routing_key";
const FIELD_BODY: &str = "body";
const FIELD_ATTEMPT: &str = "attempt";
const FIELD_REASON: &str = "reason";

fn redis_error(context: &'static str) -> impl Fn(redis::RedisError) -> DomainError {
    move |e| DomainError::broker(context, e)
}

/// Key names for one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
struct KeyLayout {
    exchange: String,
}

impl KeyLayout {
    fn queue_stream(&self, queue: &str) -> String {
        format!("{}.q.{}", self.exchange, queue)
    }

    fn bindings(&self, routing_key: &str) -> String {
        format!("{}.bindings.{}", self.exchange, routing_key)
    }

    fn dead_letters(&self, queue: &str) -> String {
        format!("{}.dlq.{}", self.exchange, queue)
    }
}

/// Redis-backed topic exchange for multi-instance deployments.
#[derive(Clone)]
pub struct RedisStreamBroker {
    client: redis::Client,
    conn: MultiplexedConnection,
    keys: KeyLayout,
    claim_idle: Duration,
}

impl RedisStreamBroker {
    /// Open the publishing connection.
    pub async fn connect(config: &BrokerConfig) -> Result<Self, DomainError> {
        let client = redis::Client::open(config.url.as_str())
            .map_err(redis_error("open redis client"))?;
        let conn = client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(redis_error("connect to redis"))?;

        Ok(Self {
            client,
            conn,
            keys: KeyLayout {
                exchange: config.exchange.clone(),
            },
            claim_idle: config.claim_idle(),
        })
    }

    /// Create the consumer group on `stream`; an existing group is kept.
    ///
    /// The group starts at the head of the stream, so entries routed before
    /// the group existed are still delivered.
    async fn declare_group(
        conn: &mut MultiplexedConnection,
        stream: &str,
        group: &str,
    ) -> Result<(), DomainError> {
        let created: Result<(), redis::RedisError> =
            conn.xgroup_create_mkstream(stream, group, "0").await;
        match created {
            Ok(()) => {
                debug!(stream = %stream, group = %group, "Created consumer group");
                Ok(())
            }
            Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
            Err(e) => Err(DomainError::broker("declare consumer group", e)),
        }
    }
}

#[async_trait]
impl MessagePublisher for RedisStreamBroker {
    async fn publish(&self, routing_key: &str, body: &[u8]) -> Result<(), DomainError> {
        let mut conn = self.conn.clone();
        let queues: Vec<String> = conn
            .smembers(self.keys.bindings(routing_key))
            .await
            .map_err(redis_error("look up bindings"))?;
        if queues.is_empty() {
            debug!(routing_key = %routing_key, "No queue bound, message dropped");
            return Ok(());
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        for queue in &queues {
            pipe.xadd(
                self.keys.queue_stream(queue),
                "*",
                &[
                    (FIELD_ROUTING_KEY, routing_key.as_bytes()),
                    (FIELD_BODY, body),
                    (FIELD_ATTEMPT, b"1".as_slice()),
                ],
            )
            .ignore();
        }
        pipe.query_async::<_, ()>(&mut conn)
            .await
            .map_err(redis_error("publish message"))?;
        Ok(())
    }
}

#[async_trait]
impl MessageSubscriber for RedisStreamBroker {
    async fn subscribe(
        &self,
        binding: &QueueBinding,
    ) -> Result<Box<dyn Subscription>, DomainError> {
        // Blocking reads get their own connection
        let mut conn = self
            .client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(redis_error("connect to redis"))?;

        let stream = self.keys.queue_stream(&binding.queue);
        Self::declare_group(&mut conn, &stream, &binding.queue).await?;

        let mut pipe = redis::pipe();
        for routing_key in &binding.routing_keys {
            pipe.sadd(self.keys.bindings(routing_key), &binding.queue).ignore();
        }
        pipe.query_async::<_, ()>(&mut conn)
            .await
            .map_err(redis_error("bind queue"))?;

        let consumer = format!("{}-{}", binding.queue, Uuid::new_v4());
        info!(
            queue = %binding.queue,
            stream = %stream,
            consumer = %consumer,
            "Subscribed to redis stream"
        );

        Ok(Box::new(RedisStreamSubscription {
            conn,
            stream,
            group: binding.queue.clone(),
            consumer,
            dead_letter_stream: self.keys.dead_letters(&binding.queue),
            prefetch: usize::from(binding.prefetch.max(1)),
            claim_idle: self.claim_idle,
            last_claim: None,
            buffer: VecDeque::new(),
            held: HashMap::new(),
        }))
    }
}

struct RedisStreamSubscription {
    conn: MultiplexedConnection,
    stream: String,
    group: String,
    consumer: String,
    dead_letter_stream: String,
    prefetch: usize,
    claim_idle: Duration,
    last_claim: Option<Instant>,
    buffer: VecDeque<Delivery>,
    /// Stream entry id per outstanding delivery.
    held: HashMap<DeliveryTag, String>,
}

impl RedisStreamSubscription {
    fn to_delivery(stream: &str, entry: &StreamId) -> Delivery {
        let routing_key: String = entry.get(FIELD_ROUTING_KEY).unwrap_or_default();
        let body: Vec<u8> = entry.get(FIELD_BODY).unwrap_or_default();
        let attempt = entry
            .get::<String>(FIELD_ATTEMPT)
            .and_then(|a| a.parse::<u32>().ok())
            .unwrap_or(1);

        Delivery {
            tag: DeliveryTag(format!("{}/{}", stream, entry.id)),
            routing_key,
            body,
            attempt,
        }
    }

    /// Entry id encoded in a delivery tag.
    fn entry_id(tag: &DeliveryTag) -> Option<&str> {
        tag.0.rsplit_once('/').map(|(_, id)| id)
    }

    /// Claims at most `room` entries another consumer left pending past `claim_idle`.
    async fn claim_abandoned(&mut self, room: usize) -> Result<(), DomainError> {
        let idle_ms = self.claim_idle.as_millis() as usize;
        let pending: StreamPendingCountReply = self
            .conn
            .xpending_count(&self.stream, &self.group, "-", "+", room)
            .await
            .map_err(redis_error("list pending entries"))?;

        let stale: Vec<String> = pending
            .ids
            .into_iter()
            .filter(|p| p.last_delivered_ms >= idle_ms && p.consumer != self.consumer)
            .map(|p| p.id)
            .take(room)
            .collect();
        if stale.is_empty() {
            return Ok(());
        }

        let claimed: StreamClaimReply = self
            .conn
            .xclaim(&self.stream, &self.group, &self.consumer, idle_ms, stale.as_slice())
            .await
            .map_err(redis_error("claim pending entries"))?;

        for entry in &claimed.ids {
            warn!(stream = %self.stream, id = %entry.id, "Claimed abandoned delivery");
            self.buffer.push_back(Self::to_delivery(&self.stream, entry));
        }
        Ok(())
    }

    /// Reads at most `room` new entries, in stream order.
    async fn read_new(&mut self, room: usize, wait: Duration) -> Result<(), DomainError> {
        let options = StreamReadOptions::default()
            .group(&self.group, &self.consumer)
            .count(room)
            .block(wait.as_millis() as usize);

        let reply: Option<StreamReadReply> = self
            .conn
            .xread_options(&[&self.stream], &[">"], &options)
            .await
            .map_err(redis_error("read from stream"))?;

        if let Some(reply) = reply {
            for key in reply.keys {
                for entry in &key.ids {
                    self.buffer.push_back(Self::to_delivery(&key.key, entry));
                }
            }
        }
        Ok(())
    }

    fn take(&mut self, delivery: &Delivery) -> Result<String, DomainError> {
        self.held.remove(&delivery.tag).ok_or_else(|| {
            DomainError::broker(
                "settle delivery",
                format!("unknown delivery tag {}", delivery.tag.0),
            )
        })
    }

    /// Runs `pipe` followed by XACK + XDEL of `id` as one MULTI block.
    async fn settle_with(
        &mut self,
        mut pipe: redis::Pipeline,
        id: &str,
        context: &'static str,
    ) -> Result<(), DomainError> {
        pipe.atomic()
            .xack(&self.stream, &self.group, &[id])
            .ignore()
            .xdel(&self.stream, &[id])
            .ignore();
        pipe.query_async::<_, ()>(&mut self.conn)
            .await
            .map_err(redis_error(context))
    }
}

#[async_trait]
impl Subscription for RedisStreamSubscription {
    async fn next_delivery(&mut self, wait: Duration) -> Result<Option<Delivery>, DomainError> {
        let room = self.prefetch.saturating_sub(self.held.len() + self.buffer.len());
        if self.buffer.is_empty() && room == 0 {
            time::sleep(wait).await;
            return Ok(None);
        }

        if self.buffer.is_empty() {
            let claim_due = self
                .last_claim
                .map_or(true, |at| at.elapsed() >= self.claim_idle);
            if claim_due {
                self.last_claim = Some(Instant::now());
                self.claim_abandoned(room).await?;
            }
            if self.buffer.is_empty() {
                self.read_new(room, wait).await?;
            }
        }

        Ok(self.buffer.pop_front().map(|delivery| {
            if let Some(id) = Self::entry_id(&delivery.tag) {
                self.held.insert(delivery.tag.clone(), id.to_string());
            }
            delivery
        }))
    }

    async fn ack(&mut self, delivery: &Delivery) -> Result<(), DomainError> {
        let id = self.take(delivery)?;
        self.settle_with(redis::pipe(), &id, "ack entry").await
    }

    async fn nack(&mut self, delivery: &Delivery, requeue: bool) -> Result<(), DomainError> {
        let id = self.take(delivery)?;
        let mut pipe = redis::pipe();
        if requeue {
            let attempt = (delivery.attempt + 1).to_string();
            pipe.xadd(
                &self.stream,
                "*",
                &[
                    (FIELD_ROUTING_KEY, delivery.routing_key.as_bytes()),
                    (FIELD_BODY, delivery.body.as_slice()),
                    (FIELD_ATTEMPT, attempt.as_bytes()),
                ],
            )
            .ignore();
        }
        self.settle_with(pipe, &id, "requeue entry").await
    }

    async fn dead_letter(&mut self, delivery: &Delivery, reason: &str) -> Result<(), DomainError> {
        let id = self.take(delivery)?;
        let attempt = delivery.attempt.to_string();
        let mut pipe = redis::pipe();
        pipe.xadd(
            &self.dead_letter_stream,
            "*",
            &[
                (FIELD_ROUTING_KEY, delivery.routing_key.as_bytes()),
                (FIELD_BODY, delivery.body.as_slice()),
                (FIELD_ATTEMPT, attempt.as_bytes()),
                (FIELD_REASON, reason.as_bytes()),
            ],
        )
        .ignore();
        self.settle_with(pipe, &id, "dead-letter entry").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redis::Value;

    fn entry(fields: &[(&str, &[u8])]) -> StreamId {
        StreamId {
            id: "1700000000000-0".to_string(),
            map: fields
                .iter()
                .map(|(k, v)| (k.to_string(), Value::Data(v.to_vec())))
                .collect(),
        }
    }

    #[test]
    fn every_key_of_a_queue_shares_one_stream() {
        let keys = KeyLayout {
            exchange: "session-events".to_string(),
        };

        assert_eq!(
            keys.queue_stream("reward-worker-session-events"),
            "session-events.q.reward-worker-session-events"
        );
        assert_eq!(
            keys.bindings("SessionDeletedEvent"),
            "session-events.bindings.SessionDeletedEvent"
        );
        assert_eq!(
            keys.dead_letters("reward-worker-session-events"),
            "session-events.dlq.reward-worker-session-events"
        );
    }

    #[test]
    fn entry_fields_become_delivery() {
        let raw = entry(&[
            (FIELD_ROUTING_KEY, b"SessionUpdatedEvent"),
            (FIELD_BODY, b"{\"a\":1}"),
            (FIELD_ATTEMPT, b"3"),
        ]);

        let delivery = RedisStreamSubscription::to_delivery("session-events.q.rewards", &raw);

        assert_eq!(delivery.routing_key, "SessionUpdatedEvent");
        assert_eq!(delivery.body, b"{\"a\":1}".to_vec());
        assert_eq!(delivery.attempt, 3);
        assert_eq!(
            RedisStreamSubscription::entry_id(&delivery.tag),
            Some("1700000000000-0")
        );
    }

    #[test]
    fn missing_attempt_defaults_to_first() {
        let raw = entry(&[(FIELD_ROUTING_KEY, b"SessionDeletedEvent"), (FIELD_BODY, b"{}")]);

        let delivery = RedisStreamSubscription::to_delivery("s", &raw);

        assert_eq!(delivery.attempt, 1);
    }

    // Integration tests require a running Redis instance.
    // Run with: FOCUS_TRACK_TEST_REDIS=redis://127.0.0.1/ cargo test -- --ignored

    async fn live_broker() -> RedisStreamBroker {
        let url = std::env::var("FOCUS_TRACK_TEST_REDIS").unwrap();
        let config = BrokerConfig {
            url,
            exchange: format!("test-{}", Uuid::new_v4()),
            ..Default::default()
        };
        RedisStreamBroker::connect(&config).await.unwrap()
    }

    fn live_binding() -> QueueBinding {
        QueueBinding::new("rewards")
            .bind("SessionCreatedEvent")
            .bind("SessionDeletedEvent")
            .bind("SessionUpdatedEvent")
    }

    #[tokio::test]
    #[ignore]
    async fn requeue_redelivers_with_next_attempt() {
        let broker = live_broker().await;
        let mut sub = broker.subscribe(&live_binding()).await.unwrap();

        broker.publish("SessionUpdatedEvent", b"{}").await.unwrap();
        let first = sub.next_delivery(Duration::from_secs(1)).await.unwrap().unwrap();
        sub.nack(&first, true).await.unwrap();
        let second = sub.next_delivery(Duration::from_secs(1)).await.unwrap().unwrap();

        assert_eq!(second.attempt, 2);
        sub.ack(&second).await.unwrap();
    }

    #[tokio::test]
    #[ignore]
    async fn backlog_across_keys_is_delivered_in_publish_order() {
        let broker = live_broker().await;
        let mut sub = broker.subscribe(&live_binding()).await.unwrap();

        broker.publish("SessionUpdatedEvent", b"u").await.unwrap();
        broker.publish("SessionDeletedEvent", b"d").await.unwrap();
        broker.publish("SessionCreatedEvent", b"c").await.unwrap();

        let mut seen = Vec::new();
        while let Some(delivery) = sub.next_delivery(Duration::from_millis(200)).await.unwrap() {
            seen.push(delivery.routing_key.clone());
            sub.ack(&delivery).await.unwrap();
        }

        assert_eq!(
            seen,
            vec!["SessionUpdatedEvent", "SessionDeletedEvent", "SessionCreatedEvent"]
        );
    }

    #[tokio::test]
    #[ignore]
    async fn prefetch_caps_pending_entries_across_keys() {
        let broker = live_broker().await;
        let binding = live_binding().with_prefetch(1);
        let mut sub = broker.subscribe(&binding).await.unwrap();

        broker.publish("SessionUpdatedEvent", b"u").await.unwrap();
        broker.publish("SessionDeletedEvent", b"d").await.unwrap();

        let first = sub.next_delivery(Duration::from_secs(1)).await.unwrap().unwrap();
        assert!(sub.next_delivery(Duration::from_millis(50)).await.unwrap().is_none());

        let mut conn = broker.conn.clone();
        let pending: StreamPendingCountReply = conn
            .xpending_count(broker.keys.queue_stream("rewards"), "rewards", "-", "+", 10)
            .await
            .unwrap();
        assert_eq!(pending.ids.len(), 1);

        sub.ack(&first).await.unwrap();
        let second = sub.next_delivery(Duration::from_secs(1)).await.unwrap().unwrap();
        assert_eq!(second.routing_key, "SessionDeletedEvent");
    }

    #[tokio::test]
    #[ignore]
    async fn settled_entries_leave_the_stream() {
        let broker = live_broker().await;
        let mut sub = broker.subscribe(&live_binding()).await.unwrap();

        broker.publish("SessionUpdatedEvent", b"u").await.unwrap();
        let delivery = sub.next_delivery(Duration::from_secs(1)).await.unwrap().unwrap();
        sub.ack(&delivery).await.unwrap();

        let mut conn = broker.conn.clone();
        let len: usize = conn.xlen(broker.keys.queue_stream("rewards")).await.unwrap();
        assert_eq!(len, 0);
    }

    #[tokio::test]
    #[ignore]
    async fn unbound_keys_are_dropped() {
        let broker = live_broker().await;
        let mut sub = broker.subscribe(&live_binding()).await.unwrap();

        broker.publish("DailyGoalAchievedEvent", b"{}").await.unwrap();

        assert!(sub.next_delivery(Duration::from_millis(100)).await.unwrap().is_none());
    }
}
