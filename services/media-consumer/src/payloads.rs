//! Typed `data` payloads this service's two consumers decode out of the
//! shared [`event_registry::PayloadEnvelope`]. These events originate from
//! the storage provider's push notifications and an internal media-delete
//! trigger respectively, not from the outbox publisher, so they sit
//! outside `event-registry`'s closed routing table (spec §1: cloud-provider
//! notification formats are an external collaborator's concern).

use serde::Deserialize;
use uuid::Uuid;

/// GCS object-finalize notification attribute this service expects on
/// every delivery to its finalize subscription; anything else is a
/// non-matching event kind per spec §4.4 and is acked without decoding
/// `data` at all.
pub const FINALIZE_EVENT_TYPE_ATTR: &str = "eventType";
pub const FINALIZE_EVENT_TYPE_VALUE: &str = "OBJECT_FINALIZE";

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectFinalizedData {
    pub bucket: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaDeleteRequestedData {
    pub media_id: Uuid,
}
