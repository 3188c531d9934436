//! Scheduler - single-writer cron runner for license, order, outbox, and
//! notification housekeeping (spec §4.5).
//!
//! Environment variables:
//! - DATABASE_URL, REDIS_URL
//! - DEPLOY_ENV: scopes the cluster lock key (default: "development")
//! - SCHEDULER_TICK_INTERVAL_SECS (default: 15)
//! - SCHEDULER_LOCK_TTL_SECS (default: 30)
//! - ORDER_PENDING_TTL_HOURS (default: 48)
//! - OUTBOX_RETENTION_DAYS (default: 30)
//! - NOTIFICATION_RETENTION_DAYS (default: 90)
//! - MEDIA_PENDING_GRACE_HOURS (default: 24)

mod config;
mod job;
mod jobs;
mod lock;
mod metrics;
mod registry;
mod tick;

use config::SchedulerConfig;
use db_pool::DbConfig;
use job::JobContext;
use jobs::{
    LicenseLifecycleJob, LoggingStorageObjectDeleter, NotificationCleanupJob, OrderTtlJob,
    OutboxRetentionJob, PendingMediaCleanupJob,
};
use lock::ClusterLock;
use registry::JobRegistry;
use std::sync::Arc;
use tick::TickLoop;
use tokio::sync::watch;
use tracing::info;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("scheduler=info".parse().expect("valid directive")),
        )
        .init();

    info!("starting scheduler");

    dotenvy::dotenv().ok();

    let config = SchedulerConfig::from_env();
    info!(environment = %config.environment, "configuration loaded");

    let db_config = DbConfig::from_env("scheduler").map_err(|e| format!("{e}"))?;
    db_config.log_config();
    let pool = db_pool::create_pool(db_config).await?;
    db_pool::migrate(&pool).await?;

    let redis_url = std::env::var("REDIS_URL").map_err(|_| "REDIS_URL environment variable not set")?;
    let redis_pool = redis_utils::RedisPool::connect(&redis_url, None).await?;
    let manager = redis_pool.manager();

    let mut registry = JobRegistry::new();
    registry
        .register(
            Arc::new(LicenseLifecycleJob::new(pool.clone())),
            "0 0 * * * *",
        )
        .map_err(|e| format!("{e}"))?;
    registry
        .register(
            Arc::new(OrderTtlJob::new(pool.clone(), config.order_ttl)),
            "0 */5 * * * *",
        )
        .map_err(|e| format!("{e}"))?;
    registry
        .register(
            Arc::new(OutboxRetentionJob::new(config.outbox_retention)),
            "0 0 3 * * *",
        )
        .map_err(|e| format!("{e}"))?;
    registry
        .register(
            Arc::new(NotificationCleanupJob::new(config.notification_retention)),
            "0 30 3 * * *",
        )
        .map_err(|e| format!("{e}"))?;
    registry
        .register(
            Arc::new(PendingMediaCleanupJob::new(
                config.media_grace_period,
                Box::new(LoggingStorageObjectDeleter),
            )),
            "0 0 * * * *",
        )
        .map_err(|e| format!("{e}"))?;

    info!(job_count = registry.len(), "job registry validated and populated");

    let lock = ClusterLock::new(manager.clone(), lock::lock_key(&config.environment), config.lock_ttl);
    let ctx = JobContext { pool, redis: manager };
    let tick_loop = TickLoop::new(registry, lock, ctx, config.tick_interval);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl+c");
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    tick_loop.run(shutdown_rx).await;

    info!("scheduler shut down cleanly");
    Ok(())
}
