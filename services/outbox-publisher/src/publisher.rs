//! Outbound message publishing capability (spec §4.3 step 4b/4c).
//!
//! Kept behind a trait, per the teacher's interface-based-polymorphism
//! pattern, so the publisher loop can be tested against an in-memory fake
//! without a live Kafka broker.

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use resilience::{presets, CircuitBreaker, CircuitBreakerError};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("publish timed out after {0:?}")]
    Timeout(Duration),
    #[error("publish failed: {0}")]
    Failed(String),
    #[error("kafka circuit breaker is open, failing fast without attempting publish")]
    CircuitOpen,
}

/// A single outbound message: the envelope bytes plus the five attributes
/// spec §6 requires on every publish.
pub struct OutboundMessage<'a> {
    pub topic: &'a str,
    pub partition_key: &'a str,
    pub payload: &'a [u8],
    pub attributes: BTreeMap<&'static str, String>,
}

#[async_trait]
pub trait MessagePublisher: Send + Sync {
    async fn publish(&self, message: OutboundMessage<'_>, timeout: Duration) -> Result<(), PublishError>;
}

/// A single long-lived Kafka producer handle shared by every topic this
/// process publishes to (spec §5: "publisher owns a single domain
/// publisher handle per topic; publishers are long-lived and
/// goroutine-safe" — `FutureProducer` is `Clone` + `Send + Sync` and safe
/// to share across every topic from one client).
///
/// Wraps every `send` in the shared `resilience` crate's circuit breaker
/// (the teacher's `presets::kafka_config()` tuning) so a broker outage
/// fails fast instead of piling up in-flight requests against a dead
/// connection; the publisher loop's own backoff+jitter (spec §4.3 step 6)
/// still governs how soon the next batch retries.
pub struct KafkaMessagePublisher {
    producer: FutureProducer,
    breaker: CircuitBreaker,
}

impl KafkaMessagePublisher {
    pub fn new(brokers: &str) -> Result<Self, PublishError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("enable.idempotence", "true")
            .set("acks", "all")
            .set("max.in.flight.requests.per.connection", "5")
            .create()
            .map_err(|e| PublishError::Failed(format!("failed to create Kafka producer: {e}")))?;

        let breaker = CircuitBreaker::new(presets::kafka_config().circuit_breaker);

        Ok(Self { producer, breaker })
    }
}

#[async_trait]
impl MessagePublisher for KafkaMessagePublisher {
    async fn publish(&self, message: OutboundMessage<'_>, timeout: Duration) -> Result<(), PublishError> {
        let mut headers = OwnedHeaders::new();
        for (key, value) in &message.attributes {
            headers = headers.insert(Header {
                key,
                value: Some(value.as_bytes()),
            });
        }

        let record = FutureRecord::to(message.topic)
            .key(message.partition_key)
            .payload(message.payload)
            .headers(headers);

        let result = self
            .breaker
            .call(|| async { self.producer.send(record, timeout).await.map_err(|(err, _)| err.to_string()) })
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(CircuitBreakerError::Open) => Err(PublishError::CircuitOpen),
            Err(CircuitBreakerError::CallFailed(msg)) => Err(PublishError::Failed(msg)),
        }
    }
}

#[cfg(test)]
pub mod fakes {
    use super::*;
    use std::sync::Mutex;

    /// In-memory [`MessagePublisher`] for the publisher-loop tests: each
    /// call consults a scripted queue of outcomes keyed by call order, so
    /// scenarios like S2 (fail-then-succeed) and S3 (perpetual failure)
    /// can be driven deterministically.
    pub struct ScriptedPublisher {
        outcomes: Mutex<Vec<Result<(), PublishError>>>,
        published: Mutex<Vec<String>>,
    }

    impl ScriptedPublisher {
        pub fn new(mut outcomes: Vec<Result<(), PublishError>>) -> Self {
            outcomes.reverse();
            Self {
                outcomes: Mutex::new(outcomes),
                published: Mutex::new(Vec::new()),
            }
        }

        pub fn always_fail() -> Self {
            Self {
                outcomes: Mutex::new(Vec::new()),
                published: Mutex::new(Vec::new()),
            }
        }

        pub fn published_topics(&self) -> Vec<String> {
            self.published.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MessagePublisher for ScriptedPublisher {
        async fn publish(&self, message: OutboundMessage<'_>, _timeout: Duration) -> Result<(), PublishError> {
            let mut outcomes = self.outcomes.lock().unwrap();
            let outcome = outcomes.pop().unwrap_or(Err(PublishError::Failed("scripted failure".into())));
            if outcome.is_ok() {
                self.published.lock().unwrap().push(message.topic.to_string());
            }
            outcome
        }
    }
}
