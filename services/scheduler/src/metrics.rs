//! `job_duration_seconds{job}`, `job_success{job}`, `job_failure{job}`
//! (spec §4.5).

use once_cell::sync::Lazy;
use prometheus::{register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec};

static JOB_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "job_duration_seconds",
        "Scheduled job execution duration in seconds",
        &["job"]
    )
    .expect("job_duration_seconds metric registration should succeed at startup")
});

static JOB_SUCCESS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!("job_success", "Scheduled job runs that completed without error", &["job"])
        .expect("job_success metric registration should succeed at startup")
});

static JOB_FAILURE: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "job_failure",
        "Scheduled job runs that errored or panicked",
        &["job"]
    )
    .expect("job_failure metric registration should succeed at startup")
});

pub fn observe_duration(job: &str, seconds: f64) {
    JOB_DURATION_SECONDS.with_label_values(&[job]).observe(seconds);
}

pub fn inc_success(job: &str) {
    JOB_SUCCESS.with_label_values(&[job]).inc();
}

pub fn inc_failure(job: &str) {
    JOB_FAILURE.with_label_values(&[job]).inc();
}
