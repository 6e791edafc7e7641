//! Reward worker process: consumes session events and awards daily goals.

use std::sync::Arc;

use secrecy::ExposeSecret;
use tracing::{info, warn};

use focus_track::adapters::http::HttpSessionApiClient;
use focus_track::adapters::postgres::{PostgresFocusLedger, REWARDS_MIGRATOR};
use focus_track::adapters::redis::RedisStreamBroker;
use focus_track::adapters::{EventConsumer, EventConsumerConfig};
use focus_track::application::handlers::rewards::{DailyGoalService, SessionEventRouter};
use focus_track::config::AppConfig;
use focus_track::shutdown::spawn_shutdown_listener;
use focus_track::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = AppConfig::load()?;
    config.validate()?;
    telemetry::init_tracing(&config.service)?;

    info!(
        queue = %config.consumer.queue,
        threshold = %config.daily_goal.threshold_minutes,
        "Starting reward worker"
    );

    let pool = config.database.connect().await?;
    info!("Connected to PostgreSQL");
    if config.database.run_migrations {
        REWARDS_MIGRATOR.run(&pool).await?;
        info!("Rewards migrations applied");
    }

    let broker = Arc::new(RedisStreamBroker::connect(&config.broker).await?);
    info!(exchange = %config.broker.exchange, "Connected to broker");

    if config.session_api.api_key.expose_secret().is_empty() {
        warn!("Session API key is empty; the session service will reject goal flags");
    }
    let session_api = HttpSessionApiClient::new(&config.session_api)?;

    let goals = DailyGoalService::new(
        Arc::new(PostgresFocusLedger::new(pool)),
        Arc::new(session_api),
        broker.clone(),
    )
    .with_goal(config.daily_goal.goal());
    let router = SessionEventRouter::new(Arc::new(goals));

    let consumer_config = EventConsumerConfig::new(config.consumer.queue.clone())
        .with_prefetch(config.consumer.prefetch)
        .with_max_delivery_attempts(config.consumer.max_delivery_attempts)
        .with_receive_timeout(config.consumer.receive_timeout())
        .with_reconnect_delay(config.consumer.reconnect_delay())
        .with_shutdown_grace(config.consumer.shutdown_grace());

    let consumer = EventConsumer::new(broker, consumer_config)
        .subscribe_all(&SessionEventRouter::ROUTING_KEYS, Arc::new(router));

    consumer.run(spawn_shutdown_listener()).await;

    info!("Reward worker stopped");
    Ok(())
}
