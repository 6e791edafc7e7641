//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables with the
//! `config` and `dotenvy` crates. Variables use the `FOCUS_TRACK` prefix and
//! `__` between nested keys.
//!
//! Both binaries load the same `AppConfig`; each reads the sections it needs.
//!
//! # Example
//!
//! ```no_run
//! use focus_track::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Outbox batch size: {}", config.outbox.batch_size);
//! ```

mod broker;
mod consumer;
mod daily_goal;
mod database;
mod error;
mod outbox;
mod service;
mod session_api;

pub use broker::BrokerConfig;
pub use consumer::ConsumerConfig;
pub use daily_goal::DailyGoalConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use outbox::OutboxConfig;
pub use service::{Environment, LogFormat, ServiceConfig};
pub use session_api::{InternalApiConfig, SessionApiConfig};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Listen address, environment and logging
    #[serde(default)]
    pub service: ServiceConfig,

    /// PostgreSQL connection (sessions DB or rewards DB, per binary)
    pub database: DatabaseConfig,

    /// Redis streams broker
    pub broker: BrokerConfig,

    /// Outbox publisher loop (session service)
    #[serde(default)]
    pub outbox: OutboxConfig,

    /// Event consumer (reward worker)
    #[serde(default)]
    pub consumer: ConsumerConfig,

    /// Daily goal threshold (reward worker)
    #[serde(default)]
    pub daily_goal: DailyGoalConfig,

    /// Outbound calls to the session service (reward worker)
    #[serde(default)]
    pub session_api: SessionApiConfig,

    /// Inbound internal endpoint (session service)
    #[serde(default)]
    pub internal_api: InternalApiConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// - `FOCUS_TRACK__DATABASE__URL=...` -> `database.url = ...`
    /// - `FOCUS_TRACK__OUTBOX__BATCH_SIZE=100` -> `outbox.batch_size = 100`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("FOCUS_TRACK")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration sections
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.service.validate()?;
        self.database.validate()?;
        self.broker.validate()?;
        self.outbox.validate()?;
        self.consumer.validate()?;
        self.daily_goal.validate()?;
        self.session_api.validate()?;
        self.internal_api.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.service.is_production()
    }
}
