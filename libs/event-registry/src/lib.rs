//! Static routing table and envelope codec for the outbox publisher.
//!
//! This is the "contract" spec §4.2 describes: a compile-time-populated
//! mapping from event type to aggregate type, destination topic, and typed
//! payload, plus the [`resolve`] function the publisher calls per row
//! before attempting to publish it.

mod envelope;
mod error;
mod payloads;
mod registry;
mod types;

pub use envelope::PayloadEnvelope;
pub use error::NonRetryableError;
pub use payloads::*;
pub use registry::{resolve, EventDescriptor, ResolvedEvent};
pub use types::{AggregateType, EventType, Topic};
