//! Outbox Publisher - drains `outbox_events` into Kafka with at-least-once
//! delivery (spec §4.3).
//!
//! Environment variables:
//! - DATABASE_URL: PostgreSQL URL for the outbox/DLQ tables
//! - KAFKA_BROKERS: Kafka broker addresses
//! - OUTBOX_PUBLISH_BATCH_SIZE: rows fetched per iteration (default: 50)
//! - OUTBOX_PUBLISH_POLL_MS: idle-sleep base when a batch is empty (default: 500)
//! - OUTBOX_MAX_ATTEMPTS: attempts before a row is archived to the DLQ (default: 10)
//! - OUTBOX_PUBLISH_TIMEOUT_SECS: per-message publish timeout (default: 15)
//! - OUTBOX_MAX_BACKOFF_SECS: backoff ceiling after a batch-level error (default: 10)
//! - OUTBOX_JITTER_MS: jitter window added to every sleep (default: 250)

mod config;
mod metrics;
mod publisher;
mod run_loop;

use config::PublisherConfig;
use db_pool::DbConfig;
use outbox_store::PgOutboxStore;
use publisher::KafkaMessagePublisher;
use run_loop::PublisherLoop;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("outbox_publisher=info".parse().expect("valid directive")),
        )
        .init();

    info!("starting outbox publisher");

    dotenvy::dotenv().ok();

    let config = PublisherConfig::from_env().map_err(|e| format!("{e}"))?;
    info!(
        batch_size = config.batch_size,
        max_attempts = config.max_attempts,
        kafka_brokers = %config.kafka_brokers,
        "configuration loaded"
    );

    let db_config = DbConfig::from_env("outbox-publisher").map_err(|e| format!("{e}"))?;
    db_config.log_config();
    let pool = db_pool::create_pool(db_config).await?;
    db_pool::migrate(&pool).await?;

    let store = PgOutboxStore::new(pool.clone());
    let message_publisher: Arc<dyn publisher::MessagePublisher> =
        Arc::new(KafkaMessagePublisher::new(&config.kafka_brokers).map_err(|e| format!("{e}"))?);
    info!("Kafka producer initialized");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl+c");
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let publisher_loop = PublisherLoop::new(pool.clone(), store.clone(), message_publisher, config);

    let pending_pool = pool.clone();
    let mut pending_shutdown = shutdown_rx.clone();
    let pending_store = PgOutboxStore::new(pending_pool);
    let pending_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(30));
        loop {
            tokio::select! {
                _ = pending_shutdown.changed() => {
                    if *pending_shutdown.borrow() {
                        break;
                    }
                }
                _ = interval.tick() => {
                    if let Err(e) = pending_store.pending_stats().await {
                        error!(error = %e, "failed to refresh pending-outbox gauges");
                    }
                }
            }
        }
    });

    publisher_loop.run(shutdown_rx).await;
    let _ = pending_handle.await;

    info!("outbox publisher shut down cleanly");
    Ok(())
}
