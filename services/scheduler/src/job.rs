//! The `Job` capability every scheduled task implements (spec §4.5).

use async_trait::async_trait;
use sqlx::PgPool;
use std::fmt;

/// Shared handles a job may need. Redis is optional because not every job
/// touches the cache (e.g. outbox retention only needs `pool`).
#[derive(Clone)]
pub struct JobContext {
    pub pool: PgPool,
    pub redis: redis_utils::SharedConnectionManager,
}

#[derive(Debug)]
pub struct JobError(pub String);

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for JobError {}

impl From<sqlx::Error> for JobError {
    fn from(e: sqlx::Error) -> Self {
        JobError(e.to_string())
    }
}

impl From<outbox_store::OutboxError> for JobError {
    fn from(e: outbox_store::OutboxError) -> Self {
        JobError(e.to_string())
    }
}

/// A unit of scheduled work. Implementations must be idempotent (spec
/// §4.5: "handlers must not assume exactly-one invocation").
#[async_trait]
pub trait Job: Send + Sync {
    /// Stable name used as the registry key and the `{job}` metrics label.
    fn name(&self) -> &'static str;

    async fn run(&self, ctx: &JobContext) -> Result<(), JobError>;
}
