use thiserror::Error;

/// How a consumer error should be handled per spec §4.4/§7's propagation
/// policy. Every handler error gets classified into exactly one of these
/// before the framework decides ack vs nack.
#[derive(Debug, Error)]
pub enum ConsumerError {
    /// Payload envelope or inner typed payload failed to decode. Always
    /// terminal — the message will never decode no matter how many times
    /// it is redelivered.
    #[error("decode failed: {0}")]
    Decode(String),

    /// The authoritative store has no row for this delivery yet (or it was
    /// pruned). Treated as terminal per the Open-Question-2 resolution
    /// recorded in DESIGN.md.
    #[error("row not found")]
    NotFound,

    /// Deadline exceeded, canceled, or a recognized timeout talking to the
    /// database or another dependency. Always transient.
    #[error("transient dependency error: {0}")]
    Transient(String),

    /// Any other failure; logged as a warning and acked rather than risking
    /// a poison-message nack storm (spec §4.4: "err on the side of not
    /// blocking the queue").
    #[error("handler error: {0}")]
    Other(String),
}

impl ConsumerError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ConsumerError::Transient(_))
    }
}
