//! Message broker configuration (Redis streams).

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Broker configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    /// Redis connection URL
    pub url: String,

    /// Topic exchange name, used as the key prefix for queue streams and bindings
    #[serde(default = "default_exchange")]
    pub exchange: String,

    /// Seconds a delivery may stay unacknowledged before another consumer claims it
    #[serde(default = "default_claim_idle")]
    pub claim_idle_secs: u64,
}

impl BrokerConfig {
    /// Get claim idle time as Duration
    pub fn claim_idle(&self) -> Duration {
        Duration::from_secs(self.claim_idle_secs)
    }

    /// Validate broker configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.is_empty() {
            return Err(ValidationError::MissingRequired("BROKER_URL"));
        }
        if !self.url.starts_with("redis://") && !self.url.starts_with("rediss://") {
            return Err(ValidationError::InvalidBrokerUrl);
        }
        if self.exchange.is_empty() {
            return Err(ValidationError::MissingRequired("BROKER_EXCHANGE"));
        }
        if self.claim_idle_secs == 0 {
            return Err(ValidationError::MustBePositive("broker.claim_idle_secs"));
        }
        Ok(())
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            exchange: default_exchange(),
            claim_idle_secs: default_claim_idle(),
        }
    }
}

fn default_exchange() -> String {
    "session-events".to_string()
}

fn default_claim_idle() -> u64 {
    60
}
