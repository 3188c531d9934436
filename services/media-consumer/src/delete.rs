//! Media deletion consumer: detaches and removes every attachment
//! referencing a media row, in deterministic order (spec §4.4).

use async_trait::async_trait;
use consumer_framework::{bounded_preview, ConsumerError, Handler, InboundMessage};
use event_registry::PayloadEnvelope;
use sqlx::{PgPool, Row};
use tracing::{info, warn};
use uuid::Uuid;

use crate::db_error::classify;
use crate::payloads::MediaDeleteRequestedData;

/// The domain-side "detach this attachment" call. Kept as a trait because
/// the actual unlinking (clearing a foreign key elsewhere, invalidating a
/// cache entry, …) is owned by the business services this backbone does
/// not specify (spec §1 non-goals).
#[async_trait]
pub trait AttachmentDetacher: Send + Sync {
    async fn detach(&self, entity_type: &str, entity_id: Uuid, attachment_id: Uuid) -> Result<(), String>;
}

/// Logs and no-ops. Wired in as the default until a real detacher is
/// plugged in at the deployment layer, mirroring the scheduler's
/// `LoggingStorageObjectDeleter`.
pub struct LoggingAttachmentDetacher;

#[async_trait]
impl AttachmentDetacher for LoggingAttachmentDetacher {
    async fn detach(&self, entity_type: &str, entity_id: Uuid, attachment_id: Uuid) -> Result<(), String> {
        info!(entity_type, %entity_id, %attachment_id, "attachment detach requested (no-op detacher)");
        Ok(())
    }
}

pub struct DeleteHandler {
    pool: PgPool,
    detacher: Box<dyn AttachmentDetacher>,
}

impl DeleteHandler {
    pub fn new(pool: PgPool, detacher: Box<dyn AttachmentDetacher>) -> Self {
        Self { pool, detacher }
    }
}

#[async_trait]
impl Handler for DeleteHandler {
    async fn handle(&self, message: &InboundMessage) -> Result<(), ConsumerError> {
        let envelope: PayloadEnvelope = serde_json::from_slice(&message.payload).map_err(|e| {
            ConsumerError::Decode(format!(
                "envelope decode failed: {e} (preview: {})",
                bounded_preview(&message.payload)
            ))
        })?;

        if !envelope.has_data() {
            return Err(ConsumerError::Decode("envelope data is null".to_string()));
        }

        let data: MediaDeleteRequestedData = serde_json::from_value(envelope.data.clone())
            .map_err(|e| ConsumerError::Decode(format!("media-delete-requested payload decode failed: {e}")))?;

        let attachments = sqlx::query(
            r#"
            SELECT id, entity_type, entity_id
            FROM media_attachments
            WHERE media_id = $1
            ORDER BY entity_type ASC, entity_id ASC, id ASC
            "#,
        )
        .bind(data.media_id)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)?;

        if attachments.is_empty() {
            return Err(ConsumerError::NotFound);
        }

        for row in &attachments {
            let attachment_id: Uuid = row.try_get("id").map_err(|e| classify(e.into()))?;
            let entity_type: String = row.try_get("entity_type").map_err(|e| classify(e.into()))?;
            let entity_id: Uuid = row.try_get("entity_id").map_err(|e| classify(e.into()))?;

            if let Err(e) = self.detacher.detach(&entity_type, entity_id, attachment_id).await {
                warn!(
                    media_id = %data.media_id,
                    attachment_id = %attachment_id,
                    error = %e,
                    "attachment detach failed, nacking whole delivery for retry"
                );
                return Err(ConsumerError::Transient(e));
            }

            sqlx::query("DELETE FROM media_attachments WHERE id = $1")
                .bind(attachment_id)
                .execute(&self.pool)
                .await
                .map_err(classify)?;
        }

        info!(media_id = %data.media_id, count = attachments.len(), "media attachments detached and removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_requested_data_decodes() {
        let envelope = PayloadEnvelope::new(
            "evt-3".to_string(),
            serde_json::json!({"media_id": "00000000-0000-0000-0000-000000000001"}),
        );
        let data: MediaDeleteRequestedData = serde_json::from_value(envelope.data).unwrap();
        assert_eq!(data.media_id.to_string(), "00000000-0000-0000-0000-000000000001");
    }
}
