use once_cell::sync::Lazy;
use prometheus::{register_int_counter_vec, IntCounterVec};

static MESSAGES_PROCESSED: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "consumer_messages_processed_total",
        "Messages processed by a push consumer, by topic and outcome",
        &["topic", "outcome"]
    )
    .expect("consumer_messages_processed_total metric registration should succeed at startup")
});

pub(crate) fn inc_processed(topic: &str, outcome: &str) {
    MESSAGES_PROCESSED.with_label_values(&[topic, outcome]).inc();
}
