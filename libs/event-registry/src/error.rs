use thiserror::Error;

/// Resolution failures the publisher always treats as non-retryable: the
/// envelope or the registry itself is wrong, and time will not fix that.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NonRetryableError {
    #[error("event_type '{0}' is not registered")]
    UnregisteredEventType(String),

    #[error("aggregate_type '{actual}' does not match descriptor's expected '{expected}' for event_type '{event_type}'")]
    AggregateTypeMismatch {
        event_type: String,
        expected: String,
        actual: String,
    },

    #[error("aggregate_id is the zero UUID")]
    ZeroAggregateId,

    #[error("envelope JSON could not be decoded: {0}")]
    EnvelopeDecodeFailed(String),

    #[error("envelope data is null or empty")]
    EmptyData,

    #[error("envelope data could not be decoded into the typed payload for '{event_type}': {source}")]
    PayloadDecodeFailed { event_type: String, source: String },
}
