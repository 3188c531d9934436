//! Sweep licenses approaching or past expiry (spec §4.5).

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use outbox_store::PgOutboxStore;
use serde_json::json;
use sqlx::Row;
use tracing::info;
use uuid::Uuid;

use crate::job::{Job, JobContext, JobError};
use crate::jobs::emit;

const WARNING_HORIZON_DAYS: i64 = 14;

pub struct LicenseLifecycleJob {
    store: PgOutboxStore,
}

impl LicenseLifecycleJob {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self {
            store: PgOutboxStore::new(pool),
        }
    }
}

#[async_trait]
impl Job for LicenseLifecycleJob {
    fn name(&self) -> &'static str {
        "license_lifecycle"
    }

    async fn run(&self, ctx: &JobContext) -> Result<(), JobError> {
        let mut tx = ctx.pool.begin().await?;
        let horizon = Utc::now() + ChronoDuration::days(WARNING_HORIZON_DAYS);

        let expiring_soon = sqlx::query(
            r#"
            SELECT id, expires_at FROM licenses
            WHERE status = 'active' AND warned_at IS NULL AND expires_at <= $1 AND expires_at > NOW()
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(horizon)
        .fetch_all(&mut *tx)
        .await?;

        for row in &expiring_soon {
            let id: Uuid = row.try_get("id")?;
            let expires_at: chrono::DateTime<Utc> = row.try_get("expires_at")?;

            emit(
                &self.store,
                &mut tx,
                "license.expiring_soon",
                "license",
                id,
                json!({ "license_id": id, "expires_at": expires_at }),
            )
            .await?;

            sqlx::query("UPDATE licenses SET warned_at = NOW(), updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        let expired = sqlx::query(
            r#"
            SELECT id FROM licenses
            WHERE status = 'active' AND expires_at <= NOW()
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        for row in &expired {
            let id: Uuid = row.try_get("id")?;

            emit(
                &self.store,
                &mut tx,
                "license.expired",
                "license",
                id,
                json!({ "license_id": id }),
            )
            .await?;

            emit(
                &self.store,
                &mut tx,
                "license.status_changed",
                "license",
                id,
                json!({ "license_id": id, "previous_status": "active", "new_status": "expired" }),
            )
            .await?;

            sqlx::query("UPDATE licenses SET status = 'expired', updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        let warned_count = expiring_soon.len();
        let expired_count = expired.len();
        tx.commit().await?;

        if warned_count > 0 || expired_count > 0 {
            info!(warned_count, expired_count, "license lifecycle sweep completed");
        }
        Ok(())
    }
}
