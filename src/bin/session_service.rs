//! Session service process: outbox publisher loop plus the internal HTTP
//! endpoint the reward worker calls back into.

use std::sync::Arc;

use secrecy::ExposeSecret;
use tracing::{info, warn};

use focus_track::adapters::http::{internal_routes, InternalSessionHandlers};
use focus_track::adapters::postgres::{
    PostgresOutboxStore, PostgresSessionStore, SESSION_MIGRATOR,
};
use focus_track::adapters::redis::RedisStreamBroker;
use focus_track::adapters::{OutboxPublisher, OutboxPublisherConfig};
use focus_track::application::handlers::session::SetDailyGoalAchievedHandler;
use focus_track::config::AppConfig;
use focus_track::shutdown::{spawn_shutdown_listener, wait_for_shutdown};
use focus_track::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = AppConfig::load()?;
    config.validate()?;
    telemetry::init_tracing(&config.service)?;

    info!(environment = ?config.service.environment, "Starting session service");

    let pool = config.database.connect().await?;
    info!("Connected to PostgreSQL");
    if config.database.run_migrations {
        SESSION_MIGRATOR.run(&pool).await?;
        info!("Session migrations applied");
    }

    let broker = RedisStreamBroker::connect(&config.broker).await?;
    info!(exchange = %config.broker.exchange, "Connected to broker");

    let shutdown = spawn_shutdown_listener();

    let publisher = OutboxPublisher::with_config(
        Arc::new(PostgresOutboxStore::new(pool.clone())),
        Arc::new(broker),
        OutboxPublisherConfig::default()
            .with_poll_interval(config.outbox.poll_interval())
            .with_batch_size(config.outbox.batch_size),
    );
    let publisher_task = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { publisher.run(shutdown).await })
    };

    if config.internal_api.api_key.expose_secret().is_empty() {
        warn!("Internal API key is empty; every internal call will be rejected");
    }
    let sessions = Arc::new(PostgresSessionStore::new(pool));
    let handler = SetDailyGoalAchievedHandler::new(sessions, config.internal_api.api_key.clone());
    let app = internal_routes(InternalSessionHandlers::new(Arc::new(handler)));

    let addr = config.service.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Internal endpoint listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown(shutdown))
        .await?;

    publisher_task.await?;
    info!("Session service stopped");
    Ok(())
}
