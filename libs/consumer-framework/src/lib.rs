//! Push-subscription consumer framework (spec §4.4).
//!
//! A "push" subscriber in spec terms is, on this workspace's message bus,
//! an rdkafka consumer group with auto-commit disabled: the framework
//! commits an offset only when the handler returns [`AckDecision::Ack`],
//! so an unacked message is redelivered to the next consumer that claims
//! the partition (on rebalance or restart) rather than being silently
//! skipped.

mod error;
mod metrics;

pub use error::ConsumerError;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::{Headers, Message};
use resilience::timeout::with_timeout;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Upper bound on a single handler invocation. A handler that blocks past
/// this is indistinguishable from a dependency outage, so the framework
/// treats the timeout itself as a [`ConsumerError::Transient`] and nacks
/// for redelivery rather than hanging the consumer loop.
const HANDLER_TIMEOUT: Duration = Duration::from_secs(30);

/// The framework's ack/nack decision for a single delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckDecision {
    /// Commit the offset; the message will not be redelivered.
    Ack,
    /// Do not commit; the message is redelivered to whichever consumer
    /// next claims this partition.
    Nack,
}

/// A single inbound delivery handed to a [`Handler`].
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    pub payload: Vec<u8>,
    pub attributes: HashMap<String, String>,
}

/// Truncate a byte preview to at most 800 bytes for log lines, per spec
/// §4.4's bound on decode-failure previews.
pub fn bounded_preview(bytes: &[u8]) -> String {
    let limit = bytes.len().min(800);
    String::from_utf8_lossy(&bytes[..limit]).into_owned()
}

/// A single consumer's business logic. Implementations classify their own
/// failures by returning the right [`ConsumerError`] variant; the
/// framework turns that classification into an [`AckDecision`] uniformly
/// per spec §4.4/§7: decode/not-found -> ack, transient -> nack, anything
/// else -> ack-with-warning.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, message: &InboundMessage) -> Result<(), ConsumerError>;
}

fn classify(err: &ConsumerError) -> AckDecision {
    match err {
        ConsumerError::Decode(_) | ConsumerError::NotFound => AckDecision::Ack,
        ConsumerError::Transient(_) => AckDecision::Nack,
        ConsumerError::Other(_) => AckDecision::Ack,
    }
}

/// Configuration for a single push consumer instance.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub brokers: String,
    pub group_id: String,
    pub topic: String,
    pub session_timeout_ms: String,
}

impl ConsumerConfig {
    pub fn from_env(group_id: &str, topic: &str) -> Result<Self, String> {
        let brokers = std::env::var("KAFKA_BROKERS")
            .map_err(|_| "KAFKA_BROKERS environment variable not set".to_string())?;
        Ok(Self {
            brokers,
            group_id: group_id.to_string(),
            topic: topic.to_string(),
            session_timeout_ms: std::env::var("KAFKA_SESSION_TIMEOUT_MS")
                .unwrap_or_else(|_| "45000".to_string()),
        })
    }
}

/// A push-driven consumer loop wired to one [`Handler`].
pub struct PushConsumer<H: Handler> {
    consumer: StreamConsumer,
    handler: H,
    topic: String,
}

impl<H: Handler> PushConsumer<H> {
    pub fn new(config: &ConsumerConfig, handler: H) -> Result<Self, ConsumerError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &config.group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", &config.session_timeout_ms)
            .create()
            .map_err(|e| ConsumerError::Other(format!("failed to create consumer: {e}")))?;

        consumer
            .subscribe(&[&config.topic])
            .map_err(|e| ConsumerError::Other(format!("failed to subscribe: {e}")))?;

        info!(topic = %config.topic, group_id = %config.group_id, "push consumer initialized");

        Ok(Self {
            consumer,
            handler,
            topic: config.topic.clone(),
        })
    }

    /// Run until `shutdown` fires. Each message is routed to the handler;
    /// the framework then acks (commits) or nacks (skips committing)
    /// according to [`classify`].
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        use futures::StreamExt;

        let mut stream = self.consumer.stream();
        info!(topic = %self.topic, "push consumer loop starting");

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!(topic = %self.topic, "push consumer received shutdown signal");
                        break;
                    }
                }
                next = stream.next() => {
                    match next {
                        Some(Ok(borrowed)) => {
                            let message = InboundMessage {
                                topic: borrowed.topic().to_string(),
                                partition: borrowed.partition(),
                                offset: borrowed.offset(),
                                key: borrowed.key().map(|k| k.to_vec()),
                                payload: borrowed.payload().map(|p| p.to_vec()).unwrap_or_default(),
                                attributes: borrowed
                                    .headers()
                                    .map(|headers| {
                                        (0..headers.count())
                                            .filter_map(|i| {
                                                let header = headers.get(i);
                                                let value = header.value?;
                                                Some((
                                                    header.key.to_string(),
                                                    String::from_utf8_lossy(value).into_owned(),
                                                ))
                                            })
                                            .collect()
                                    })
                                    .unwrap_or_default(),
                            };

                            let outcome = match with_timeout(HANDLER_TIMEOUT, self.handler.handle(&message)).await {
                                Ok(inner) => inner,
                                Err(d) => Err(ConsumerError::Transient(format!("{d}"))),
                            };

                            let decision = match outcome {
                                Ok(()) => {
                                    metrics::inc_processed(&self.topic, "ack");
                                    AckDecision::Ack
                                }
                                Err(e) => {
                                    let decision = classify(&e);
                                    match decision {
                                        AckDecision::Ack => warn!(
                                            topic = %self.topic,
                                            error = %e,
                                            preview = %bounded_preview(&message.payload),
                                            "handler error acked as terminal"
                                        ),
                                        AckDecision::Nack => warn!(
                                            topic = %self.topic,
                                            error = %e,
                                            "transient handler error, nacking for redelivery"
                                        ),
                                    }
                                    metrics::inc_processed(
                                        &self.topic,
                                        if decision == AckDecision::Ack { "ack_error" } else { "nack" },
                                    );
                                    decision
                                }
                            };

                            if decision == AckDecision::Ack {
                                if let Err(e) = self.consumer.commit_message(&borrowed, CommitMode::Async) {
                                    error!(topic = %self.topic, error = %e, "failed to commit offset after ack");
                                }
                            } else {
                                debug!(
                                    topic = %self.topic,
                                    partition = borrowed.partition(),
                                    offset = borrowed.offset(),
                                    "skipped commit after nack"
                                );
                            }
                        }
                        Some(Err(e)) => {
                            error!(topic = %self.topic, error = %e, "stream error, continuing");
                        }
                        None => {
                            warn!(topic = %self.topic, "message stream ended unexpectedly");
                            break;
                        }
                    }
                }
            }
        }

        info!(topic = %self.topic, "push consumer loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_and_not_found_are_acked() {
        assert_eq!(classify(&ConsumerError::Decode("x".into())), AckDecision::Ack);
        assert_eq!(classify(&ConsumerError::NotFound), AckDecision::Ack);
    }

    #[test]
    fn transient_is_nacked() {
        assert_eq!(classify(&ConsumerError::Transient("timeout".into())), AckDecision::Nack);
    }

    #[test]
    fn other_is_acked_with_warning() {
        assert_eq!(classify(&ConsumerError::Other("unexpected".into())), AckDecision::Ack);
    }

    #[test]
    fn preview_is_bounded_to_800_bytes() {
        let bytes = vec![b'a'; 2000];
        let preview = bounded_preview(&bytes);
        assert_eq!(preview.len(), 800);
    }

    #[test]
    fn preview_shorter_than_bound_is_unchanged() {
        let preview = bounded_preview(b"short");
        assert_eq!(preview, "short");
    }
}
