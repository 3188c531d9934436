//! Expire vendor orders stuck pending past the configured TTL (spec §4.5).

use async_trait::async_trait;
use outbox_store::PgOutboxStore;
use serde_json::json;
use sqlx::Row;
use tracing::info;
use uuid::Uuid;

use crate::job::{Job, JobContext, JobError};
use crate::jobs::emit;

pub struct OrderTtlJob {
    store: PgOutboxStore,
    ttl: chrono::Duration,
}

impl OrderTtlJob {
    pub fn new(pool: sqlx::PgPool, ttl: chrono::Duration) -> Self {
        Self {
            store: PgOutboxStore::new(pool),
            ttl,
        }
    }
}

#[async_trait]
impl Job for OrderTtlJob {
    fn name(&self) -> &'static str {
        "order_ttl"
    }

    async fn run(&self, ctx: &JobContext) -> Result<(), JobError> {
        let mut tx = ctx.pool.begin().await?;
        let cutoff = chrono::Utc::now() - self.ttl;

        let stuck = sqlx::query(
            r#"
            SELECT id FROM vendor_orders
            WHERE status = 'pending' AND pending_since < $1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(cutoff)
        .fetch_all(&mut *tx)
        .await?;

        for row in &stuck {
            let id: Uuid = row.try_get("id")?;

            emit(
                &self.store,
                &mut tx,
                "order.expired",
                "vendor_order",
                id,
                json!({ "vendor_order_id": id }),
            )
            .await?;

            sqlx::query("UPDATE vendor_orders SET status = 'expired', updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        let count = stuck.len();
        tx.commit().await?;

        if count > 0 {
            info!(count, "expired stuck-pending vendor orders; order.expired emitted for inventory release downstream");
        }
        Ok(())
    }
}
