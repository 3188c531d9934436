//! Maps [`event_registry::NonRetryableError`] into the consumer
//! framework's ack/nack vocabulary: a registry resolution failure is, from
//! this consumer's point of view, exactly the "decode failure of the
//! payload envelope or the inner typed payload" spec §4.4 says is always
//! acked.

use consumer_framework::ConsumerError;
use event_registry::NonRetryableError;

pub fn to_consumer_error(err: NonRetryableError) -> ConsumerError {
    ConsumerError::Decode(err.to_string())
}

/// Pulls the three routing attributes the publisher always attaches
/// (spec §6) off an inbound message, or a decode error if any are
/// missing/malformed.
pub fn routing_attributes(
    message: &consumer_framework::InboundMessage,
) -> Result<(String, String, uuid::Uuid), ConsumerError> {
    let event_type = message
        .attributes
        .get("event_type")
        .ok_or_else(|| ConsumerError::Decode("missing event_type attribute".to_string()))?
        .clone();
    let aggregate_type = message
        .attributes
        .get("aggregate_type")
        .ok_or_else(|| ConsumerError::Decode("missing aggregate_type attribute".to_string()))?
        .clone();
    let aggregate_id = message
        .attributes
        .get("aggregate_id")
        .ok_or_else(|| ConsumerError::Decode("missing aggregate_id attribute".to_string()))?;
    let aggregate_id = uuid::Uuid::parse_str(aggregate_id)
        .map_err(|e| ConsumerError::Decode(format!("invalid aggregate_id attribute: {e}")))?;

    Ok((event_type, aggregate_type, aggregate_id))
}
