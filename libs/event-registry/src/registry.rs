use uuid::Uuid;

use crate::envelope::PayloadEnvelope;
use crate::error::NonRetryableError;
use crate::payloads::{
    CashCollectedPayload, CheckoutConvertedPayload, LicenseExpiredPayload,
    LicenseExpiringSoonPayload, LicenseStatusChangedPayload, NotificationRequestedPayload,
    OrderCanceledPayload, OrderCreatedPayload, OrderDecidedPayload, OrderExpiredPayload,
    OrderPaidPayload, OrderPendingNudgePayload, OrderReadyForDispatchPayload,
    OrderRetriedPayload, PaymentFailedPayload, PaymentRejectedPayload, TypedPayload,
};
use crate::types::{AggregateType, EventType, Topic};

/// A single registry entry: the "contract" the publisher enforces per
/// spec §4.2. For a given `event_type` there is exactly one descriptor,
/// produced here by a `match` over the closed [`EventType`] enum rather
/// than a runtime-populated map — the registry cannot be mutated at
/// runtime, only recompiled.
#[derive(Debug, Clone, Copy)]
pub struct EventDescriptor {
    pub event_type: EventType,
    pub aggregate_type: AggregateType,
    pub topic: Topic,
}

/// The output of a successful [`resolve`] call: the matched descriptor,
/// the envelope it came from, and the envelope's `data` decoded into its
/// typed payload.
#[derive(Debug, Clone)]
pub struct ResolvedEvent {
    pub descriptor: EventDescriptor,
    pub envelope: PayloadEnvelope,
    pub typed_payload: TypedPayload,
}

/// Look up the descriptor for a registered event type.
///
/// This is the closed routing table from spec §6: every [`EventType`]
/// variant must appear on the left of exactly one arm below, or this
/// function silently stops being exhaustive at compile time (new variants
/// added to the enum without a matching arm here fail to build).
fn descriptor_for(event_type: EventType) -> EventDescriptor {
    use AggregateType::*;
    use Topic::*;

    let (aggregate_type, topic) = match event_type {
        EventType::OrderCreated => (CheckoutGroup, Orders),
        EventType::OrderDecided => (VendorOrder, Orders),
        EventType::OrderReadyForDispatch => (VendorOrder, Orders),
        EventType::OrderCanceled => (VendorOrder, Orders),
        EventType::OrderRetried => (VendorOrder, Orders),
        EventType::OrderPendingNudge => (VendorOrder, Orders),
        EventType::OrderExpired => (VendorOrder, Orders),
        EventType::CashCollected => (VendorOrder, Orders),
        EventType::PaymentFailed => (VendorOrder, Orders),
        EventType::PaymentRejected => (VendorOrder, Orders),
        EventType::OrderPaid => (VendorOrder, Billing),
        EventType::NotificationRequested => (VendorOrder, Notifications),
        EventType::LicenseStatusChanged => (License, Notifications),
        EventType::LicenseExpiringSoon => (License, Notifications),
        EventType::LicenseExpired => (License, Notifications),
        EventType::CheckoutConverted => (CheckoutGroup, Notifications),
    };

    EventDescriptor {
        event_type,
        aggregate_type,
        topic,
    }
}

/// Decode `envelope.data` into the [`TypedPayload`] variant matching
/// `event_type`, or a [`NonRetryableError::PayloadDecodeFailed`].
fn decode_payload(
    event_type: EventType,
    data: &serde_json::Value,
) -> Result<TypedPayload, NonRetryableError> {
    macro_rules! decode {
        ($variant:ident, $payload_ty:ty) => {
            serde_json::from_value::<$payload_ty>(data.clone())
                .map(TypedPayload::$variant)
                .map_err(|e| NonRetryableError::PayloadDecodeFailed {
                    event_type: event_type.as_str().to_string(),
                    source: e.to_string(),
                })
        };
    }

    match event_type {
        EventType::OrderCreated => decode!(OrderCreated, OrderCreatedPayload),
        EventType::OrderDecided => decode!(OrderDecided, OrderDecidedPayload),
        EventType::OrderReadyForDispatch => {
            decode!(OrderReadyForDispatch, OrderReadyForDispatchPayload)
        }
        EventType::OrderCanceled => decode!(OrderCanceled, OrderCanceledPayload),
        EventType::OrderRetried => decode!(OrderRetried, OrderRetriedPayload),
        EventType::OrderPendingNudge => decode!(OrderPendingNudge, OrderPendingNudgePayload),
        EventType::OrderExpired => decode!(OrderExpired, OrderExpiredPayload),
        EventType::CashCollected => decode!(CashCollected, CashCollectedPayload),
        EventType::PaymentFailed => decode!(PaymentFailed, PaymentFailedPayload),
        EventType::PaymentRejected => decode!(PaymentRejected, PaymentRejectedPayload),
        EventType::OrderPaid => decode!(OrderPaid, OrderPaidPayload),
        EventType::NotificationRequested => {
            decode!(NotificationRequested, NotificationRequestedPayload)
        }
        EventType::LicenseStatusChanged => {
            decode!(LicenseStatusChanged, LicenseStatusChangedPayload)
        }
        EventType::LicenseExpiringSoon => decode!(LicenseExpiringSoon, LicenseExpiringSoonPayload),
        EventType::LicenseExpired => decode!(LicenseExpired, LicenseExpiredPayload),
        EventType::CheckoutConverted => decode!(CheckoutConverted, CheckoutConvertedPayload),
    }
}

/// Resolve a raw outbox row into a [`ResolvedEvent`], or classify the
/// failure as non-retryable per spec §4.2's resolution contract.
///
/// `raw_event_type` and `raw_aggregate_type` are the outbox row's string
/// columns; `raw_aggregate_id` and `payload_bytes` are the row's
/// `aggregate_id`/`payload` columns. This is the one function the
/// publisher calls per row before attempting to publish.
pub fn resolve(
    raw_event_type: &str,
    raw_aggregate_type: &str,
    raw_aggregate_id: Uuid,
    payload_bytes: &[u8],
) -> Result<ResolvedEvent, NonRetryableError> {
    let event_type = EventType::from_str(raw_event_type)
        .ok_or_else(|| NonRetryableError::UnregisteredEventType(raw_event_type.to_string()))?;

    let descriptor = descriptor_for(event_type);

    let actual_aggregate_type = AggregateType::from_str(raw_aggregate_type).ok_or_else(|| {
        NonRetryableError::AggregateTypeMismatch {
            event_type: event_type.as_str().to_string(),
            expected: descriptor.aggregate_type.as_str().to_string(),
            actual: raw_aggregate_type.to_string(),
        }
    })?;

    if actual_aggregate_type != descriptor.aggregate_type {
        return Err(NonRetryableError::AggregateTypeMismatch {
            event_type: event_type.as_str().to_string(),
            expected: descriptor.aggregate_type.as_str().to_string(),
            actual: raw_aggregate_type.to_string(),
        });
    }

    if raw_aggregate_id.is_nil() {
        return Err(NonRetryableError::ZeroAggregateId);
    }

    let envelope: PayloadEnvelope = serde_json::from_slice(payload_bytes)
        .map_err(|e| NonRetryableError::EnvelopeDecodeFailed(e.to_string()))?;

    if !envelope.has_data() {
        return Err(NonRetryableError::EmptyData);
    }

    let typed_payload = decode_payload(event_type, &envelope.data)?;

    Ok(ResolvedEvent {
        descriptor,
        envelope,
        typed_payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope_bytes(data: serde_json::Value) -> Vec<u8> {
        let envelope = PayloadEnvelope::new(Uuid::new_v4().to_string(), data);
        serde_json::to_vec(&envelope).unwrap()
    }

    #[test]
    fn resolves_order_created() {
        let data = json!({
            "checkout_group_id": Uuid::new_v4(),
            "vendor_order_ids": [Uuid::new_v4()],
        });
        let bytes = envelope_bytes(data);
        let resolved = resolve("order.created", "checkout_group", Uuid::new_v4(), &bytes).unwrap();
        assert_eq!(resolved.descriptor.topic.as_str(), "orders");
        assert!(matches!(
            resolved.typed_payload,
            TypedPayload::OrderCreated(_)
        ));
    }

    #[test]
    fn unregistered_event_type_is_non_retryable() {
        let bytes = envelope_bytes(json!({}));
        let err = resolve("not.a.real.event", "checkout_group", Uuid::new_v4(), &bytes)
            .unwrap_err();
        assert!(matches!(err, NonRetryableError::UnregisteredEventType(_)));
    }

    #[test]
    fn aggregate_type_mismatch_is_non_retryable() {
        let data = json!({
            "checkout_group_id": Uuid::new_v4(),
            "vendor_order_ids": [],
        });
        let bytes = envelope_bytes(data);
        let err = resolve("order.created", "vendor_order", Uuid::new_v4(), &bytes).unwrap_err();
        assert!(matches!(err, NonRetryableError::AggregateTypeMismatch { .. }));
    }

    #[test]
    fn zero_aggregate_id_is_non_retryable() {
        let data = json!({
            "checkout_group_id": Uuid::new_v4(),
            "vendor_order_ids": [],
        });
        let bytes = envelope_bytes(data);
        let err = resolve("order.created", "checkout_group", Uuid::nil(), &bytes).unwrap_err();
        assert!(matches!(err, NonRetryableError::ZeroAggregateId));
    }

    #[test]
    fn null_data_is_non_retryable() {
        let bytes = envelope_bytes(serde_json::Value::Null);
        let err = resolve("order.created", "checkout_group", Uuid::new_v4(), &bytes)
            .unwrap_err();
        assert!(matches!(err, NonRetryableError::EmptyData));
    }

    #[test]
    fn malformed_envelope_json_is_non_retryable() {
        let err = resolve("order.created", "checkout_group", Uuid::new_v4(), b"not json")
            .unwrap_err();
        assert!(matches!(err, NonRetryableError::EnvelopeDecodeFailed(_)));
    }

    #[test]
    fn wrong_shaped_data_is_non_retryable() {
        let bytes = envelope_bytes(json!({"unexpected": "shape"}));
        let err = resolve("order.created", "checkout_group", Uuid::new_v4(), &bytes)
            .unwrap_err();
        assert!(matches!(err, NonRetryableError::PayloadDecodeFailed { .. }));
    }
}
