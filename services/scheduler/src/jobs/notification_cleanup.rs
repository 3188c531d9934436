//! Delete notifications older than their retention window (spec §4.5).

use async_trait::async_trait;
use tracing::info;

use crate::job::{Job, JobContext, JobError};

pub struct NotificationCleanupJob {
    retention: chrono::Duration,
}

impl NotificationCleanupJob {
    pub fn new(retention: chrono::Duration) -> Self {
        Self { retention }
    }
}

#[async_trait]
impl Job for NotificationCleanupJob {
    fn name(&self) -> &'static str {
        "notification_cleanup"
    }

    async fn run(&self, ctx: &JobContext) -> Result<(), JobError> {
        let cutoff = chrono::Utc::now() - self.retention;
        let result = sqlx::query("DELETE FROM notifications WHERE created_at < $1")
            .bind(cutoff)
            .execute(&ctx.pool)
            .await?;

        if result.rows_affected() > 0 {
            info!(deleted = result.rows_affected(), "deleted expired notifications");
        }
        Ok(())
    }
}
