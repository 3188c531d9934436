//! Shared PostgreSQL connection pool and transactional helpers.
//!
//! Every binary in this workspace builds its pool through [`create_pool`]
//! and wraps business-plus-outbox writes through [`with_tx`] so that a
//! closure's error always rolls the transaction back and its `Ok` always
//! commits — no call site hand-rolls `begin`/`commit`/`rollback`.

mod metrics;

pub use metrics::acquire_with_metrics;

use error_handling::{classify_pg_error, DomainError};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info};

/// Database connection pool configuration.
#[derive(Clone)]
pub struct DbConfig {
    pub service_name: String,
    pub database_url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("service_name", &self.service_name)
            .field("database_url", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .finish()
    }
}

impl DbConfig {
    /// Build configuration from environment variables.
    ///
    /// Required: `DATABASE_URL`. All other knobs are optional with the
    /// defaults documented on each `DB_*` variable below.
    pub fn from_env(service_name: &str) -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL environment variable not set".to_string())?;

        Ok(Self {
            service_name: service_name.to_string(),
            database_url,
            max_connections: env_u32("DB_MAX_CONNECTIONS", 20),
            min_connections: env_u32("DB_MIN_CONNECTIONS", 5),
            connect_timeout_secs: env_u64("DB_CONNECT_TIMEOUT_SECS", 5),
            acquire_timeout_secs: env_u64("DB_ACQUIRE_TIMEOUT_SECS", 10),
            idle_timeout_secs: env_u64("DB_IDLE_TIMEOUT_SECS", 600),
            max_lifetime_secs: env_u64("DB_MAX_LIFETIME_SECS", 1800),
        })
    }

    pub fn log_config(&self) {
        info!(
            service = %self.service_name,
            max_connections = self.max_connections,
            min_connections = self.min_connections,
            acquire_timeout_secs = self.acquire_timeout_secs,
            "database pool configuration"
        );
    }
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Create a PostgreSQL pool, verify connectivity, and start a background
/// metrics updater for it.
pub async fn create_pool(config: DbConfig) -> Result<PgPool, sqlx::Error> {
    debug!(service = %config.service_name, "creating database pool");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .test_before_acquire(true)
        .connect(&config.database_url)
        .await?;

    match tokio::time::timeout(
        Duration::from_secs(config.connect_timeout_secs),
        sqlx::query("SELECT 1").execute(&pool),
    )
    .await
    {
        Ok(Ok(_)) => {
            info!(service = %config.service_name, "database pool created and verified");
        }
        Ok(Err(e)) => {
            error!(service = %config.service_name, error = %e, "database verification failed");
            return Err(e);
        }
        Err(_) => {
            error!(service = %config.service_name, "database verification timed out");
            return Err(sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "database verification timeout",
            )));
        }
    }

    {
        let pool_clone = pool.clone();
        let service = config.service_name.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(30));
            loop {
                interval.tick().await;
                metrics::update_pool_metrics(&pool_clone, &service);
            }
        });
    }

    Ok(pool)
}

/// Run all pending migrations embedded from `./migrations`.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    debug!("running database migrations");
    sqlx::migrate!("../../migrations").run(pool).await?;
    info!("database migrations completed");
    Ok(())
}

/// Run `f` inside a transaction: commit on `Ok`, roll back on `Err`.
///
/// This is the one sanctioned way to co-commit a business mutation with an
/// outbox insert — every call site in this workspace that writes both goes
/// through `with_tx` rather than hand-managing `begin`/`commit`.
pub async fn with_tx<F, Fut, T>(pool: &PgPool, f: F) -> Result<T, DomainError>
where
    F: FnOnce(&mut Transaction<'_, Postgres>) -> Fut,
    Fut: Future<Output = Result<T, DomainError>>,
{
    let mut tx = pool.begin().await.map_err(|e| classify_pg_error(&e))?;

    match f(&mut tx).await {
        Ok(value) => {
            tx.commit().await.map_err(|e| classify_pg_error(&e))?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                error!(error = %rollback_err, "rollback failed after transaction error");
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[serial_test::serial]
    fn default_config_from_env() {
        std::env::remove_var("DB_MAX_CONNECTIONS");
        std::env::remove_var("DB_MIN_CONNECTIONS");
        std::env::set_var("DATABASE_URL", "postgres://localhost/test");

        let config = DbConfig::from_env("outbox-publisher").unwrap();
        assert_eq!(config.max_connections, 20);
        assert_eq!(config.min_connections, 5);

        std::env::remove_var("DATABASE_URL");
    }

    #[test]
    #[serial_test::serial]
    fn missing_database_url_is_an_error() {
        std::env::remove_var("DATABASE_URL");
        assert!(DbConfig::from_env("x").is_err());
    }
}
