//! Applies vendor-order lifecycle events to the `vendor_orders` read model
//! (spec §4.4, the "order consumer"). Every transition is a single
//! idempotent `UPDATE ... WHERE status <> target`, so redelivery of an
//! already-applied event is a no-op rather than a double-apply.

use async_trait::async_trait;
use consumer_framework::{ConsumerError, Handler, InboundMessage};
use event_registry::TypedPayload;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db_error::classify;
use crate::resolve_error::{routing_attributes, to_consumer_error};

pub struct VendorOrderHandler {
    pool: PgPool,
}

impl VendorOrderHandler {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn set_status(&self, vendor_order_id: Uuid, status: &str) -> Result<(), ConsumerError> {
        let result = sqlx::query(
            "UPDATE vendor_orders SET status = $2, updated_at = NOW() WHERE id = $1 AND status <> $2",
        )
        .bind(vendor_order_id)
        .bind(status)
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        if result.rows_affected() == 0 {
            let exists = sqlx::query("SELECT 1 FROM vendor_orders WHERE id = $1")
                .bind(vendor_order_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(classify)?;

            if exists.is_none() {
                debug!(vendor_order_id = %vendor_order_id, "event for unknown vendor order");
                return Err(ConsumerError::NotFound);
            }

            debug!(vendor_order_id = %vendor_order_id, status, "vendor order already in target status, ignoring");
        } else {
            info!(vendor_order_id = %vendor_order_id, status, "vendor order status updated");
        }

        Ok(())
    }
}

#[async_trait]
impl Handler for VendorOrderHandler {
    async fn handle(&self, message: &InboundMessage) -> Result<(), ConsumerError> {
        let (event_type, aggregate_type, aggregate_id) = routing_attributes(message)?;

        let resolved = event_registry::resolve(&event_type, &aggregate_type, aggregate_id, &message.payload)
            .map_err(to_consumer_error)?;

        match resolved.typed_payload {
            TypedPayload::OrderCreated(_) => {
                // checkout_group aggregate; no vendor_orders row to touch here.
                Ok(())
            }
            TypedPayload::OrderDecided(p) => self.set_status(p.vendor_order_id, &p.decision).await,
            TypedPayload::OrderReadyForDispatch(p) => self.set_status(p.vendor_order_id, "ready_for_dispatch").await,
            TypedPayload::OrderCanceled(p) => self.set_status(p.vendor_order_id, "canceled").await,
            TypedPayload::OrderRetried(p) => self.set_status(p.vendor_order_id, "pending").await,
            TypedPayload::OrderPendingNudge(_) => {
                // Informational only; the actual reminder dispatch lives
                // outside this backbone (spec §1 non-goals).
                Ok(())
            }
            TypedPayload::OrderExpired(p) => self.set_status(p.vendor_order_id, "expired").await,
            TypedPayload::CashCollected(p) => self.set_status(p.vendor_order_id, "cash_collected").await,
            TypedPayload::PaymentFailed(p) => self.set_status(p.vendor_order_id, "payment_failed").await,
            TypedPayload::PaymentRejected(p) => self.set_status(p.vendor_order_id, "payment_rejected").await,
            TypedPayload::OrderPaid(p) => self.set_status(p.vendor_order_id, "paid").await,
            other => Err(ConsumerError::Other(format!(
                "event routed to orders/billing topic with an unexpected payload shape: {other:?}"
            ))),
        }
    }
}
