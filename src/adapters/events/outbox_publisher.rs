//! OutboxPublisher - Background service for reliable event delivery.
//!
//! This service implements the second half of the Transactional Outbox Pattern:
//! 1. Command handlers stage events in the outbox (same transaction as domain changes)
//! 2. **OutboxPublisher polls the outbox and publishes to the broker** ← This module
//!
//! ## Batch Semantics
//!
//! Rows are published strictly in (created_at, id) order. The first failed
//! publish ends the batch: rows published before it are marked processed,
//! the failed row and everything after it stay pending and are retried, in
//! the same order, on the next cycle. There is no retry limit.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `poll_interval` | 1s | How often to check for unprocessed rows |
//! | `batch_size` | 50 | Max rows to publish per poll cycle |
//!
//! ## Graceful Shutdown
//!
//! The service listens for a shutdown signal, publishes one final batch and
//! stops.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::domain::foundation::{DomainError, OutboxEventId, Timestamp};
use crate::ports::{MessagePublisher, OutboxStore};

/// Configuration for the OutboxPublisher service.
#[derive(Debug, Clone)]
pub struct OutboxPublisherConfig {
    /// How often to poll for unprocessed rows.
    pub poll_interval: Duration,

    /// Maximum rows to process per poll cycle.
    pub batch_size: u32,
}

impl Default for OutboxPublisherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            batch_size: 50,
        }
    }
}

impl OutboxPublisherConfig {
    /// Create config with custom poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Create config with custom batch size.
    pub fn with_batch_size(mut self, size: u32) -> Self {
        self.batch_size = size;
        self
    }
}

/// What one poll cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchReport {
    /// Rows published and marked processed.
    pub published: usize,
    /// Row whose publish failed, ending the batch.
    pub stalled_at: Option<OutboxEventId>,
}

/// Background service that publishes rows from the outbox.
pub struct OutboxPublisher {
    outbox: Arc<dyn OutboxStore>,
    publisher: Arc<dyn MessagePublisher>,
    config: OutboxPublisherConfig,
}

impl OutboxPublisher {
    /// Create a new OutboxPublisher with default configuration.
    pub fn new(outbox: Arc<dyn OutboxStore>, publisher: Arc<dyn MessagePublisher>) -> Self {
        Self::with_config(outbox, publisher, OutboxPublisherConfig::default())
    }

    /// Create a new OutboxPublisher with custom configuration.
    pub fn with_config(
        outbox: Arc<dyn OutboxStore>,
        publisher: Arc<dyn MessagePublisher>,
        config: OutboxPublisherConfig,
    ) -> Self {
        Self {
            outbox,
            publisher,
            config,
        }
    }

    /// Run the publisher loop until the shutdown signal is received.
    ///
    /// Cycle failures are logged and retried on the next tick; the loop only
    /// returns on shutdown.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            batch_size = self.config.batch_size,
            "Outbox publisher started"
        );

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        // Shutdown requested - process one final batch then exit
                        self.cycle().await;
                        info!("Outbox publisher stopped");
                        return;
                    }
                }

                _ = interval.tick() => {
                    self.cycle().await;
                }
            }
        }
    }

    async fn cycle(&self) {
        if let Err(e) = self.process_batch().await {
            error!(error = %e, "Outbox publish cycle failed");
        }
    }

    /// Process a single batch of unprocessed rows.
    ///
    /// This method is also useful for testing without running the full loop.
    pub async fn process_batch(&self) -> Result<BatchReport, DomainError> {
        let rows = self.outbox.fetch_unprocessed(self.config.batch_size).await?;
        if rows.is_empty() {
            return Ok(BatchReport::default());
        }

        let mut published = Vec::with_capacity(rows.len());
        let mut stalled_at = None;

        for row in rows {
            match self
                .publisher
                .publish(&row.event_type, row.payload.as_bytes())
                .await
            {
                Ok(()) => published.push(row.id),
                Err(e) => {
                    warn!(
                        outbox_id = %row.id,
                        event_type = %row.event_type,
                        error = %e,
                        "Failed to publish outbox event, stopping batch"
                    );
                    stalled_at = Some(row.id);
                    break;
                }
            }
        }

        if !published.is_empty() {
            self.outbox
                .mark_processed(&published, Timestamp::now())
                .await?;
            debug!(count = published.len(), "Marked outbox events processed");
        }

        Ok(BatchReport {
            published: published.len(),
            stalled_at,
        })
    }
}
