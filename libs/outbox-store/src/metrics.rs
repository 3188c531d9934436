//! Prometheus gauges/counters for outbox depth and DLQ volume.

use once_cell::sync::Lazy;
use prometheus::{register_int_counter_vec, register_int_gauge, IntCounterVec, IntGauge};

static OUTBOX_PENDING: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("outbox_pending_count", "Unpublished outbox rows")
        .expect("outbox_pending_count metric registration should succeed at startup")
});

static OUTBOX_OLDEST_PENDING_AGE: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "outbox_oldest_pending_age_seconds",
        "Age in seconds of the oldest unpublished outbox row"
    )
    .expect("outbox_oldest_pending_age_seconds metric registration should succeed at startup")
});

static OUTBOX_DLQ_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "outbox_dlq_total",
        "Rows archived to the outbox DLQ by reason",
        &["reason"]
    )
    .expect("outbox_dlq_total metric registration should succeed at startup")
});

pub(crate) fn set_pending_gauges(pending: i64, oldest_age_seconds: i64) {
    OUTBOX_PENDING.set(pending);
    OUTBOX_OLDEST_PENDING_AGE.set(oldest_age_seconds);
}

pub(crate) fn inc_dlq(reason: &str) {
    OUTBOX_DLQ_TOTAL.with_label_values(&[reason]).inc();
}
