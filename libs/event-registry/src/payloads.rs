use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreatedPayload {
    pub checkout_group_id: Uuid,
    pub vendor_order_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDecidedPayload {
    pub vendor_order_id: Uuid,
    pub decision: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderReadyForDispatchPayload {
    pub vendor_order_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCanceledPayload {
    pub vendor_order_id: Uuid,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRetriedPayload {
    pub vendor_order_id: Uuid,
    pub retry_count: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPendingNudgePayload {
    pub vendor_order_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderExpiredPayload {
    pub vendor_order_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashCollectedPayload {
    pub vendor_order_id: Uuid,
    pub amount_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentFailedPayload {
    pub vendor_order_id: Uuid,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRejectedPayload {
    pub vendor_order_id: Uuid,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPaidPayload {
    pub vendor_order_id: Uuid,
    pub amount_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRequestedPayload {
    pub recipient_user_id: Uuid,
    pub template: String,
    #[serde(default)]
    pub context: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseStatusChangedPayload {
    pub license_id: Uuid,
    pub previous_status: String,
    pub new_status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseExpiringSoonPayload {
    pub license_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseExpiredPayload {
    pub license_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutConvertedPayload {
    pub checkout_group_id: Uuid,
}

/// Dispatch target for a decoded envelope's `data` field: exactly one
/// variant per [`crate::types::EventType`]. Constructed by
/// [`crate::registry::resolve`] from the raw envelope, never deserialized
/// directly off the wire.
#[derive(Debug, Clone, Serialize)]
pub enum TypedPayload {
    OrderCreated(OrderCreatedPayload),
    OrderDecided(OrderDecidedPayload),
    OrderReadyForDispatch(OrderReadyForDispatchPayload),
    OrderCanceled(OrderCanceledPayload),
    OrderRetried(OrderRetriedPayload),
    OrderPendingNudge(OrderPendingNudgePayload),
    OrderExpired(OrderExpiredPayload),
    CashCollected(CashCollectedPayload),
    PaymentFailed(PaymentFailedPayload),
    PaymentRejected(PaymentRejectedPayload),
    OrderPaid(OrderPaidPayload),
    NotificationRequested(NotificationRequestedPayload),
    LicenseStatusChanged(LicenseStatusChangedPayload),
    LicenseExpiringSoon(LicenseExpiringSoonPayload),
    LicenseExpired(LicenseExpiredPayload),
    CheckoutConverted(CheckoutConvertedPayload),
}
