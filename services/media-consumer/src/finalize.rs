//! Media finalize consumer: `pending -> uploaded` state transition (spec
//! §4.4's media finalize state machine).

use async_trait::async_trait;
use consumer_framework::{bounded_preview, ConsumerError, Handler, InboundMessage};
use event_registry::PayloadEnvelope;
use sqlx::{PgPool, Row};
use tracing::{debug, info, warn};

use crate::db_error::classify;
use crate::payloads::{ObjectFinalizedData, FINALIZE_EVENT_TYPE_ATTR, FINALIZE_EVENT_TYPE_VALUE};

pub struct FinalizeHandler {
    pool: PgPool,
}

impl FinalizeHandler {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Handler for FinalizeHandler {
    async fn handle(&self, message: &InboundMessage) -> Result<(), ConsumerError> {
        let event_type = message.attributes.get(FINALIZE_EVENT_TYPE_ATTR).map(String::as_str);
        if event_type != Some(FINALIZE_EVENT_TYPE_VALUE) {
            debug!(
                event_type = event_type.unwrap_or("<missing>"),
                "non-finalize GCS event type, dropping"
            );
            return Ok(());
        }

        let envelope: PayloadEnvelope = serde_json::from_slice(&message.payload).map_err(|e| {
            ConsumerError::Decode(format!(
                "envelope decode failed: {e} (preview: {})",
                bounded_preview(&message.payload)
            ))
        })?;

        if !envelope.has_data() {
            return Err(ConsumerError::Decode("envelope data is null".to_string()));
        }

        let data: ObjectFinalizedData = serde_json::from_value(envelope.data.clone())
            .map_err(|e| ConsumerError::Decode(format!("object-finalized payload decode failed: {e}")))?;

        let storage_key = data.name;

        let updated = sqlx::query(
            "UPDATE media SET status = 'uploaded', updated_at = NOW() WHERE storage_key = $1 AND status = 'pending' RETURNING id",
        )
        .bind(&storage_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?;

        match updated {
            Some(row) => {
                let id: uuid::Uuid = row.try_get("id").map_err(|e| classify(e.into()))?;
                info!(media_id = %id, storage_key = %storage_key, bucket = %data.bucket, "media row finalized");
                Ok(())
            }
            None => {
                let existing = sqlx::query("SELECT status FROM media WHERE storage_key = $1")
                    .bind(&storage_key)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(classify)?;

                match existing {
                    None => {
                        debug!(storage_key = %storage_key, "finalize event for unknown media row");
                        Err(ConsumerError::NotFound)
                    }
                    Some(row) => {
                        let status: String = row.try_get("status").map_err(|e| classify(e.into()))?;
                        warn!(storage_key = %storage_key, status = %status, "finalize event for already-processed media row, ignoring");
                        Ok(())
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_finalized_data_decodes_from_envelope_shape() {
        let envelope = PayloadEnvelope::new(
            "evt-1".to_string(),
            serde_json::json!({"bucket": "pf-media", "name": "uploads/abc.png"}),
        );
        let data: ObjectFinalizedData = serde_json::from_value(envelope.data).unwrap();
        assert_eq!(data.bucket, "pf-media");
        assert_eq!(data.name, "uploads/abc.png");
    }

    #[test]
    fn null_data_is_rejected_before_typed_decode() {
        let envelope = PayloadEnvelope::new("evt-2".to_string(), serde_json::Value::Null);
        assert!(!envelope.has_data());
    }
}
