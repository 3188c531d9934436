//! Delete published outbox rows past the retention window (spec §4.5).

use async_trait::async_trait;
use outbox_store::PgOutboxStore;
use tracing::info;

use crate::job::{Job, JobContext, JobError};

pub struct OutboxRetentionJob {
    retention: chrono::Duration,
}

impl OutboxRetentionJob {
    pub fn new(retention: chrono::Duration) -> Self {
        Self { retention }
    }
}

#[async_trait]
impl Job for OutboxRetentionJob {
    fn name(&self) -> &'static str {
        "outbox_retention"
    }

    async fn run(&self, ctx: &JobContext) -> Result<(), JobError> {
        let store = PgOutboxStore::new(ctx.pool.clone());
        let deleted = store.delete_published_before(self.retention).await?;
        if deleted > 0 {
            info!(deleted, "deleted published outbox rows past retention");
        }
        Ok(())
    }
}
