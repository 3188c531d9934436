use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The self-describing wire payload co-committed in `outbox_events.payload`
/// and published verbatim as the message body.
///
/// `data` is left as an opaque [`serde_json::Value`] here; [`crate::registry::resolve`]
/// is the only place that decodes it into a [`crate::payloads::TypedPayload`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadEnvelope {
    pub version: u32,
    pub event_id: String,
    pub occurred_at: DateTime<Utc>,
    pub data: Value,
}

impl PayloadEnvelope {
    pub fn new(event_id: String, data: Value) -> Self {
        Self {
            version: 1,
            event_id,
            occurred_at: Utc::now(),
            data,
        }
    }

    /// A `null` or missing `data` is always a terminal decode error per the
    /// resolution contract, checked before attempting the typed decode.
    pub fn has_data(&self) -> bool {
        !self.data.is_null()
    }
}
