//! Order Consumer - ingests vendor-order, billing, and notification events
//! published by the outbox publisher and applies them idempotently
//! (spec §4.4).
//!
//! Environment variables:
//! - DATABASE_URL: PostgreSQL URL for the `vendor_orders`/`notifications` tables
//! - KAFKA_BROKERS: Kafka broker addresses

mod config;
mod db_error;
mod notification;
mod resolve_error;
mod vendor_order;

use config::OrderConsumerConfig;
use consumer_framework::PushConsumer;
use db_pool::DbConfig;
use notification::NotificationHandler;
use tokio::sync::watch;
use tracing::info;
use vendor_order::VendorOrderHandler;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("order_consumer=info".parse().expect("valid directive")),
        )
        .init();

    info!("starting order consumer");

    dotenvy::dotenv().ok();

    let config = OrderConsumerConfig::from_env().map_err(|e| format!("{e}"))?;

    let db_config = DbConfig::from_env("order-consumer").map_err(|e| format!("{e}"))?;
    db_config.log_config();
    let pool = db_pool::create_pool(db_config).await?;
    db_pool::migrate(&pool).await?;

    let orders_consumer =
        PushConsumer::new(&config.orders, VendorOrderHandler::new(pool.clone())).map_err(|e| format!("{e}"))?;
    let billing_consumer =
        PushConsumer::new(&config.billing, VendorOrderHandler::new(pool.clone())).map_err(|e| format!("{e}"))?;
    let notifications_consumer =
        PushConsumer::new(&config.notifications, NotificationHandler::new(pool.clone()))
            .map_err(|e| format!("{e}"))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl+c");
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    tokio::join!(
        orders_consumer.run(shutdown_rx.clone()),
        billing_consumer.run(shutdown_rx.clone()),
        notifications_consumer.run(shutdown_rx.clone()),
    );

    info!("order consumer shut down cleanly");
    Ok(())
}
