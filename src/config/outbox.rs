//! Outbox publisher configuration.

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct OutboxConfig {
    /// Milliseconds between poll cycles
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Rows read per cycle
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
}

impl OutboxConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.poll_interval_ms == 0 {
            return Err(ValidationError::MustBePositive("outbox.poll_interval_ms"));
        }
        if self.batch_size == 0 {
            return Err(ValidationError::MustBePositive("outbox.batch_size"));
        }
        Ok(())
    }
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            batch_size: default_batch_size(),
        }
    }
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_batch_size() -> u32 {
    50
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbox_config_defaults() {
        let config = OutboxConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.batch_size, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_zero_batch() {
        let config = OutboxConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
