//! Delete media rows stuck `pending` beyond a grace period, plus their
//! storage objects (spec §4.5).
//!
//! Object deletion is kept behind a trait: the actual cloud-provider SDK
//! call is an external collaborator (spec §1 non-goals), so this job only
//! owns the decision of *which* storage keys to reclaim and the DB-side
//! bookkeeping once the delete is confirmed.

use async_trait::async_trait;
use sqlx::Row;
use tracing::{info, warn};
use uuid::Uuid;

use crate::job::{Job, JobContext, JobError};

#[async_trait]
pub trait StorageObjectDeleter: Send + Sync {
    async fn delete(&self, storage_key: &str) -> Result<(), String>;
}

/// Logs and no-ops. Wired in as the default until a real object-storage
/// client is plugged in at the deployment layer.
pub struct LoggingStorageObjectDeleter;

#[async_trait]
impl StorageObjectDeleter for LoggingStorageObjectDeleter {
    async fn delete(&self, storage_key: &str) -> Result<(), String> {
        info!(storage_key, "storage object delete requested (no-op deleter)");
        Ok(())
    }
}

pub struct PendingMediaCleanupJob {
    grace_period: chrono::Duration,
    deleter: Box<dyn StorageObjectDeleter>,
}

impl PendingMediaCleanupJob {
    pub fn new(grace_period: chrono::Duration, deleter: Box<dyn StorageObjectDeleter>) -> Self {
        Self { grace_period, deleter }
    }
}

#[async_trait]
impl Job for PendingMediaCleanupJob {
    fn name(&self) -> &'static str {
        "pending_media_cleanup"
    }

    async fn run(&self, ctx: &JobContext) -> Result<(), JobError> {
        let cutoff = chrono::Utc::now() - self.grace_period;

        let stuck = sqlx::query(
            r#"
            SELECT id, storage_key FROM media
            WHERE status = 'pending' AND created_at < $1
            "#,
        )
        .bind(cutoff)
        .fetch_all(&ctx.pool)
        .await?;

        let mut cleaned = 0u64;
        for row in &stuck {
            let id: Uuid = row.try_get("id")?;
            let storage_key: String = row.try_get("storage_key")?;

            if let Err(e) = self.deleter.delete(&storage_key).await {
                warn!(media_id = %id, storage_key, error = %e, "storage object delete failed, leaving row for next sweep");
                continue;
            }

            sqlx::query("DELETE FROM media WHERE id = $1")
                .bind(id)
                .execute(&ctx.pool)
                .await?;
            cleaned += 1;
        }

        if cleaned > 0 {
            info!(cleaned, "deleted stuck-pending media rows and their storage objects");
        }
        Ok(())
    }
}
