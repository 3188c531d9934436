//! Redis `SETNX`-backed idempotency guard for push consumers (spec §4.4).
//!
//! This is the "webhook-like consumer" dedup strategy spec §4.4 calls out
//! distinctly from the media-finalize state machine: a namespaced cache key
//! per event, first-writer-wins, with a configurable TTL (`EVENTING_IDEMPOTENCY_TTL`,
//! default 720h / 30 days per spec §6). It shares the `pf:` root with the
//! session/idempotency cache contract in `session-cache` but owns its own
//! `consumer_dedup` segment — HTTP replay and consumer dedup are different
//! contracts even though both ride on `SETNX`.

mod error;

pub use error::{IdempotencyError, IdempotencyResult};

use redis::AsyncCommands;
use redis_utils::SharedConnectionManager;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Outcome of [`IdempotencyGuard::process_if_new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingResult {
    Success,
    AlreadyProcessed,
    Failed(String),
}

impl ProcessingResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, ProcessingResult::Success | ProcessingResult::AlreadyProcessed)
    }
}

#[derive(Clone)]
pub struct IdempotencyGuard {
    manager: SharedConnectionManager,
    consumer_name: String,
    ttl: Duration,
}

impl IdempotencyGuard {
    pub fn new(manager: SharedConnectionManager, consumer_name: impl Into<String>, ttl: Duration) -> Self {
        Self {
            manager,
            consumer_name: consumer_name.into(),
            ttl,
        }
    }

    /// Default TTL from `EVENTING_IDEMPOTENCY_TTL` (hours), falling back to
    /// 720h (30 days) per spec §6.
    pub fn ttl_from_env() -> Duration {
        let hours = std::env::var("EVENTING_IDEMPOTENCY_TTL")
            .ok()
            .and_then(|v| v.trim_end_matches('h').parse::<u64>().ok())
            .unwrap_or(720);
        Duration::from_secs(hours * 3600)
    }

    fn key(&self, event_id: &str) -> String {
        format!("pf:consumer_dedup:{}:{}", self.consumer_name, event_id)
    }

    /// `true` if this event_id has already claimed the key (a duplicate
    /// delivery); does not itself claim the key.
    pub async fn is_processed(&self, event_id: &str) -> IdempotencyResult<bool> {
        validate_event_id(event_id)?;
        let mut conn = self.manager.lock().await;
        let exists: bool = conn.exists(self.key(event_id)).await?;
        if exists {
            debug!(event_id = %event_id, consumer = %self.consumer_name, "event already processed");
        }
        Ok(exists)
    }

    /// Atomically claim the key for `event_id` with `SETNX` + TTL.
    /// Returns `true` if this call made the claim (first delivery).
    pub async fn mark_processed(&self, event_id: &str) -> IdempotencyResult<bool> {
        validate_event_id(event_id)?;
        let mut conn = self.manager.lock().await;
        let claimed: bool = redis::cmd("SET")
            .arg(self.key(event_id))
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(self.ttl.as_secs())
            .query_async(&mut *conn)
            .await
            .map(|v: Option<String>| v.is_some())?;

        if claimed {
            info!(event_id = %event_id, consumer = %self.consumer_name, "event claimed for processing");
        } else {
            debug!(event_id = %event_id, consumer = %self.consumer_name, "event already claimed (duplicate)");
        }
        Ok(claimed)
    }

    /// Claim `event_id` and run `f` only if this call made the claim.
    /// Concurrent duplicate deliveries (or redeliveries after a nack) see
    /// `AlreadyProcessed` and skip `f` entirely.
    pub async fn process_if_new<F, Fut>(&self, event_id: &str, f: F) -> IdempotencyResult<ProcessingResult>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), anyhow::Error>>,
    {
        if !self.mark_processed(event_id).await? {
            return Ok(ProcessingResult::AlreadyProcessed);
        }

        match f().await {
            Ok(()) => Ok(ProcessingResult::Success),
            Err(e) => {
                warn!(event_id = %event_id, consumer = %self.consumer_name, error = ?e, "handler failed after claiming idempotency key");
                Ok(ProcessingResult::Failed(e.to_string()))
            }
        }
    }
}

fn validate_event_id(event_id: &str) -> IdempotencyResult<()> {
    if event_id.is_empty() {
        return Err(IdempotencyError::InvalidEventId("event id cannot be empty".to_string()));
    }
    if event_id.len() > 255 {
        return Err(IdempotencyError::InvalidEventId(format!(
            "event id too long: {} characters (max 255)",
            event_id.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_event_id_bounds() {
        assert!(validate_event_id("ok").is_ok());
        assert!(validate_event_id("").is_err());
        assert!(validate_event_id(&"x".repeat(256)).is_err());
    }

    #[test]
    fn processing_result_is_ok() {
        assert!(ProcessingResult::Success.is_ok());
        assert!(ProcessingResult::AlreadyProcessed.is_ok());
        assert!(!ProcessingResult::Failed("x".into()).is_ok());
    }
}
