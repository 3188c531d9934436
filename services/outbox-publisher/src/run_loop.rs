//! The publisher's per-iteration protocol (spec §4.3).

use crate::config::PublisherConfig;
use crate::metrics;
use crate::publisher::{MessagePublisher, OutboundMessage, PublishError};
use chrono::SecondsFormat;
use event_registry::NonRetryableError;
use outbox_store::{DlqEntry, DlqReason, OutboxEvent, OutboxStore};
use rand::Rng;
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Whether a failed publish should be retried or archived, based solely on
/// the row's (pre-increment) attempt count against the configured bound.
/// Pure so it is covered by unit tests without a database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDecision {
    Retry,
    Terminal,
}

pub fn classify_failure(attempt_count: i32, max_attempts: i32) -> FailureDecision {
    if attempt_count + 1 >= max_attempts {
        FailureDecision::Terminal
    } else {
        FailureDecision::Retry
    }
}

/// `base + uniform(0, window)`, per spec §4.3's idle-sleep and backoff
/// jitter formulas.
fn with_jitter(base: Duration, window: Duration) -> Duration {
    if window.is_zero() {
        return base;
    }
    let jitter_ms = rand::thread_rng().gen_range(0..=window.as_millis() as u64);
    base + Duration::from_millis(jitter_ms)
}

pub struct PublisherLoop<S: OutboxStore + Clone> {
    pool: PgPool,
    store: S,
    message_publisher: Arc<dyn MessagePublisher>,
    config: PublisherConfig,
}

impl<S: OutboxStore + Clone> PublisherLoop<S> {
    pub fn new(pool: PgPool, store: S, message_publisher: Arc<dyn MessagePublisher>, config: PublisherConfig) -> Self {
        Self {
            pool,
            store,
            message_publisher,
            config,
        }
    }

    /// Run until `shutdown` fires. Checks cancellation at batch
    /// boundaries and during sleeps, per spec §5.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut backoff = self.config.poll_interval;

        info!(
            batch_size = self.config.batch_size,
            poll_interval_ms = self.config.poll_interval.as_millis(),
            max_attempts = self.config.max_attempts,
            "outbox publisher loop starting"
        );

        loop {
            if *shutdown.borrow() {
                info!("outbox publisher received shutdown signal, exiting");
                break;
            }

            match self.run_batch().await {
                Ok(processed) => {
                    backoff = self.config.poll_interval;
                    if processed == 0 {
                        if sleep_or_shutdown(with_jitter(self.config.poll_interval, self.config.jitter_window), &mut shutdown).await {
                            break;
                        }
                    }
                    // A non-empty batch loops immediately (step 7).
                }
                Err(e) => {
                    error!(error = %e, "outbox publisher batch failed");
                    metrics::inc_batch_error();
                    let delay = with_jitter(backoff, self.config.jitter_window);
                    backoff = std::cmp::min(backoff * 2, self.config.max_backoff);
                    if sleep_or_shutdown(delay, &mut shutdown).await {
                        break;
                    }
                }
            }
        }
    }

    /// One batch: fetch, resolve+publish each row in order, commit once.
    /// Returns the number of rows fetched (0 means nothing to do this tick).
    async fn run_batch(&self) -> Result<usize, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let rows = self
            .store
            .fetch_unpublished(&mut tx, self.config.batch_size, self.config.max_attempts)
            .await
            .map_err(|e| match e {
                outbox_store::OutboxError::Database(db_err) => db_err,
                other => sqlx::Error::Protocol(other.to_string()),
            })?;

        let count = rows.len();

        for event in &rows {
            self.process_row(&mut tx, event).await;
        }

        tx.commit().await?;
        Ok(count)
    }

    async fn process_row(&self, tx: &mut sqlx::Transaction<'_, sqlx::Postgres>, event: &OutboxEvent) {
        match event_registry::resolve(&event.event_type, &event.aggregate_type, event.aggregate_id, &event.payload) {
            Err(non_retryable) => {
                self.archive(tx, event, DlqReason::NonRetryable, &non_retryable).await;
            }
            Ok(resolved) => {
                let mut attributes = BTreeMap::new();
                attributes.insert("event_id", resolved.envelope.event_id.clone());
                attributes.insert("event_type", event.event_type.clone());
                attributes.insert("aggregate_type", event.aggregate_type.clone());
                attributes.insert("aggregate_id", event.aggregate_id.to_string());
                attributes.insert(
                    "created_at",
                    event.created_at.to_rfc3339_opts(SecondsFormat::Nanos, true),
                );

                let message = OutboundMessage {
                    topic: resolved.descriptor.topic.as_str(),
                    partition_key: &event.aggregate_id.to_string(),
                    payload: &event.payload,
                    attributes,
                };

                match self.message_publisher.publish(message, self.config.publish_timeout).await {
                    Ok(()) => {
                        if let Err(e) = self.store.mark_published(tx, event.id).await {
                            error!(event_id = %event.id, error = %e, "failed to mark published after successful publish");
                        } else {
                            metrics::inc_published(resolved.descriptor.topic.as_str());
                            debug!(event_id = %event.id, topic = %resolved.descriptor.topic, "event published");
                        }
                    }
                    Err(publish_err) => {
                        self.handle_publish_failure(tx, event, &publish_err).await;
                    }
                }
            }
        }
    }

    async fn handle_publish_failure(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        event: &OutboxEvent,
        err: &PublishError,
    ) {
        match classify_failure(event.attempt_count, self.config.max_attempts) {
            FailureDecision::Retry => {
                if let Err(e) = self.store.mark_failed(tx, event.id, &err.to_string()).await {
                    error!(event_id = %event.id, error = %e, "failed to mark_failed");
                }
            }
            FailureDecision::Terminal => {
                self.archive_with_reason(tx, event, DlqReason::MaxAttempts, &err.to_string()).await;
            }
        }
    }

    async fn archive(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        event: &OutboxEvent,
        reason: DlqReason,
        err: &NonRetryableError,
    ) {
        self.archive_with_reason(tx, event, reason, &err.to_string()).await;
    }

    async fn archive_with_reason(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        event: &OutboxEvent,
        reason: DlqReason,
        message: &str,
    ) {
        let entry = DlqEntry {
            event_id: event.id,
            event_type: event.event_type.clone(),
            aggregate_type: event.aggregate_type.clone(),
            aggregate_id: event.aggregate_id,
            payload: event.payload.clone(),
            error_reason: reason,
            error_message: message.to_string(),
            attempt_count: event.attempt_count,
        };

        if let Err(e) = self.store.insert_dlq(tx, &entry).await {
            error!(event_id = %event.id, error = %e, "failed to insert DLQ entry");
            return;
        }
        if let Err(e) = self.store.mark_terminal(tx, event.id, message, self.config.max_attempts).await {
            error!(event_id = %event.id, error = %e, "failed to mark_terminal after DLQ insert");
        } else {
            warn!(event_id = %event.id, reason = reason.as_str(), "event archived to DLQ");
        }
    }
}

/// Sleeps for `delay`, waking early if `shutdown` fires. Returns `true` if
/// the loop should exit.
async fn sleep_or_shutdown(delay: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => false,
        _ = shutdown.changed() => *shutdown.borrow(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retries_below_bound() {
        assert_eq!(classify_failure(0, 10), FailureDecision::Retry);
        assert_eq!(classify_failure(8, 10), FailureDecision::Retry);
    }

    #[test]
    fn terminal_at_bound() {
        assert_eq!(classify_failure(9, 10), FailureDecision::Terminal);
        assert_eq!(classify_failure(1, 2), FailureDecision::Terminal);
    }

    #[test]
    fn jitter_never_exceeds_base_plus_window() {
        let base = Duration::from_millis(500);
        let window = Duration::from_millis(250);
        for _ in 0..100 {
            let d = with_jitter(base, window);
            assert!(d >= base);
            assert!(d <= base + window);
        }
    }

    #[test]
    fn zero_jitter_window_is_deterministic() {
        let base = Duration::from_millis(500);
        assert_eq!(with_jitter(base, Duration::ZERO), base);
    }
}
