//! Persists notification-bound events idempotently, keyed on the
//! envelope's globally-unique `event_id` (spec §4.4: "the notification
//! consumer's exactly-once semantics" leans on a DB unique constraint —
//! see `notifications.event_id` in the migrations).

use async_trait::async_trait;
use consumer_framework::{ConsumerError, Handler, InboundMessage};
use event_registry::TypedPayload;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db_error::classify;
use crate::resolve_error::{routing_attributes, to_consumer_error};

pub struct NotificationHandler {
    pool: PgPool,
}

impl NotificationHandler {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// `(recipient, template, context)` derived from a resolved notification
/// event. Only `NotificationRequested` carries an explicit recipient;
/// license/checkout-derived notifications resolve their recipient at the
/// dispatch layer this backbone does not own (spec §1 non-goals), so they
/// are recorded against the nil UUID as a placeholder for that join.
fn notification_fields(event_type: &str, payload: &TypedPayload) -> (Uuid, String, serde_json::Value) {
    let recipient = match payload {
        TypedPayload::NotificationRequested(p) => p.recipient_user_id,
        _ => Uuid::nil(),
    };
    let context = serde_json::to_value(payload).unwrap_or(serde_json::Value::Null);
    (recipient, event_type.to_string(), context)
}

#[async_trait]
impl Handler for NotificationHandler {
    async fn handle(&self, message: &InboundMessage) -> Result<(), ConsumerError> {
        let (event_type, aggregate_type, aggregate_id) = routing_attributes(message)?;

        let resolved = event_registry::resolve(&event_type, &aggregate_type, aggregate_id, &message.payload)
            .map_err(to_consumer_error)?;

        let (recipient_user_id, template, context) = notification_fields(&event_type, &resolved.typed_payload);

        let result = sqlx::query(
            r#"
            INSERT INTO notifications (id, event_id, recipient_user_id, template, context, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&resolved.envelope.event_id)
        .bind(recipient_user_id)
        .bind(&template)
        .bind(&context)
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        if result.rows_affected() == 0 {
            debug!(event_id = %resolved.envelope.event_id, "notification already recorded, duplicate delivery");
        } else {
            info!(event_id = %resolved.envelope.event_id, template, "notification recorded");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_registry::NotificationRequestedPayload;

    #[test]
    fn notification_requested_carries_explicit_recipient() {
        let user_id = Uuid::new_v4();
        let payload = TypedPayload::NotificationRequested(NotificationRequestedPayload {
            recipient_user_id: user_id,
            template: "order_confirmed".to_string(),
            context: serde_json::json!({}),
        });
        let (recipient, template, _) = notification_fields("notification.requested", &payload);
        assert_eq!(recipient, user_id);
        assert_eq!(template, "notification.requested");
    }

    #[test]
    fn license_events_fall_back_to_nil_recipient() {
        let payload = TypedPayload::LicenseExpired(event_registry::LicenseExpiredPayload {
            license_id: Uuid::new_v4(),
        });
        let (recipient, _, _) = notification_fields("license.expired", &payload);
        assert_eq!(recipient, Uuid::nil());
    }
}
