//! Event consumer configuration for the reward worker.

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct ConsumerConfig {
    /// Durable queue owned by the reward worker
    #[serde(default = "default_queue")]
    pub queue: String,

    /// Max unacknowledged deliveries per subscription
    #[serde(default = "default_prefetch")]
    pub prefetch: u16,

    /// Attempts after which a malformed message is dead-lettered
    #[serde(default = "default_max_delivery_attempts")]
    pub max_delivery_attempts: u32,

    #[serde(default = "default_receive_timeout")]
    pub receive_timeout_ms: u64,

    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,

    /// Seconds an in-flight delivery gets to finish on shutdown
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

impl ConsumerConfig {
    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.queue.is_empty() {
            return Err(ValidationError::MissingRequired("CONSUMER_QUEUE"));
        }
        if self.prefetch == 0 {
            return Err(ValidationError::MustBePositive("consumer.prefetch"));
        }
        if self.max_delivery_attempts == 0 {
            return Err(ValidationError::MustBePositive("consumer.max_delivery_attempts"));
        }
        if self.receive_timeout_ms == 0 {
            return Err(ValidationError::MustBePositive("consumer.receive_timeout_ms"));
        }
        Ok(())
    }
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            queue: default_queue(),
            prefetch: default_prefetch(),
            max_delivery_attempts: default_max_delivery_attempts(),
            receive_timeout_ms: default_receive_timeout(),
            reconnect_delay_secs: default_reconnect_delay(),
            shutdown_grace_secs: default_shutdown_grace(),
        }
    }
}

fn default_queue() -> String {
    "reward-worker-session-events".to_string()
}

fn default_prefetch() -> u16 {
    1
}

fn default_max_delivery_attempts() -> u32 {
    5
}

fn default_receive_timeout() -> u64 {
    1000
}

fn default_reconnect_delay() -> u64 {
    5
}

fn default_shutdown_grace() -> u64 {
    10
}
