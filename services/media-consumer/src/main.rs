//! Media Consumer - ingests storage-provider finalize notifications and
//! internal media-deletion triggers idempotently (spec §4.4).
//!
//! Environment variables:
//! - DATABASE_URL: PostgreSQL URL for the `media`/`media_attachments` tables
//! - KAFKA_BROKERS: Kafka broker addresses (both subscriptions ride the same cluster)
//! - MEDIA_FINALIZE_TOPIC (default: media-finalize-events)
//! - MEDIA_DELETE_TOPIC (default: media-delete-events)

mod config;
mod db_error;
mod delete;
mod finalize;
mod payloads;

use config::MediaConsumerConfig;
use consumer_framework::PushConsumer;
use db_pool::DbConfig;
use delete::{DeleteHandler, LoggingAttachmentDetacher};
use finalize::FinalizeHandler;
use tokio::sync::watch;
use tracing::info;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("media_consumer=info".parse().expect("valid directive")),
        )
        .init();

    info!("starting media consumer");

    dotenvy::dotenv().ok();

    let config = MediaConsumerConfig::from_env().map_err(|e| format!("{e}"))?;

    let db_config = DbConfig::from_env("media-consumer").map_err(|e| format!("{e}"))?;
    db_config.log_config();
    let pool = db_pool::create_pool(db_config).await?;
    db_pool::migrate(&pool).await?;

    let finalize_consumer = PushConsumer::new(&config.finalize, FinalizeHandler::new(pool.clone()))
        .map_err(|e| format!("{e}"))?;
    let delete_consumer = PushConsumer::new(
        &config.delete,
        DeleteHandler::new(pool.clone(), Box::new(LoggingAttachmentDetacher)),
    )
    .map_err(|e| format!("{e}"))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl+c");
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let finalize_shutdown = shutdown_rx.clone();
    let delete_shutdown = shutdown_rx.clone();

    tokio::join!(
        finalize_consumer.run(finalize_shutdown),
        delete_consumer.run(delete_shutdown),
    );

    info!("media consumer shut down cleanly");
    Ok(())
}
