//! Counters the publisher loop updates on top of the pending-depth gauges
//! `outbox-store` already exposes.

use once_cell::sync::Lazy;
use prometheus::{register_int_counter_vec, IntCounterVec};

static PUBLISHED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "outbox_publisher_published_total",
        "Outbox rows successfully published, by destination topic",
        &["topic"]
    )
    .expect("outbox_publisher_published_total metric registration should succeed at startup")
});

static BATCH_ERRORS_TOTAL: Lazy<prometheus::IntCounter> = Lazy::new(|| {
    prometheus::register_int_counter!(
        "outbox_publisher_batch_errors_total",
        "Uncaught errors surfaced from a single publisher batch iteration"
    )
    .expect("outbox_publisher_batch_errors_total metric registration should succeed at startup")
});

pub fn inc_published(topic: &str) {
    PUBLISHED_TOTAL.with_label_values(&[topic]).inc();
}

pub fn inc_batch_error() {
    BATCH_ERRORS_TOTAL.inc();
}
