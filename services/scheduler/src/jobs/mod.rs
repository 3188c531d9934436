mod license_lifecycle;
mod notification_cleanup;
mod order_ttl;
mod outbox_retention;
mod pending_media_cleanup;

pub use license_lifecycle::LicenseLifecycleJob;
pub use notification_cleanup::NotificationCleanupJob;
pub use order_ttl::OrderTtlJob;
pub use outbox_retention::OutboxRetentionJob;
pub use pending_media_cleanup::{LoggingStorageObjectDeleter, PendingMediaCleanupJob};

use event_registry::PayloadEnvelope;
use outbox_store::OutboxStore;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::job::JobError;

/// Wrap `data` in the standard envelope and co-commit it to the outbox,
/// inside the same transaction as whatever domain row the caller just
/// touched (spec §3/§4.1).
pub(crate) async fn emit<S: OutboxStore>(
    store: &S,
    tx: &mut Transaction<'_, Postgres>,
    event_type: &str,
    aggregate_type: &str,
    aggregate_id: Uuid,
    data: serde_json::Value,
) -> Result<(), JobError> {
    let envelope = PayloadEnvelope::new(Uuid::new_v4().to_string(), data);
    let bytes = serde_json::to_vec(&envelope).map_err(|e| JobError(e.to_string()))?;
    store
        .enqueue(tx, event_type, aggregate_type, aggregate_id, &bytes)
        .await
        .map_err(JobError::from)?;
    Ok(())
}
