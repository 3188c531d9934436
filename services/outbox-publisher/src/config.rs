use std::time::Duration;

/// Every knob spec §4.3/§6 names, loaded through a typed `from_env`
/// constructor — no default lives outside this function.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub database_url_service_name: &'static str,
    pub kafka_brokers: String,
    pub batch_size: i64,
    pub poll_interval: Duration,
    pub max_attempts: i32,
    pub publish_timeout: Duration,
    pub max_backoff: Duration,
    pub jitter_window: Duration,
}

impl PublisherConfig {
    pub fn from_env() -> Result<Self, String> {
        let kafka_brokers = std::env::var("KAFKA_BROKERS")
            .map_err(|_| "KAFKA_BROKERS environment variable not set".to_string())?;

        Ok(Self {
            database_url_service_name: "outbox-publisher",
            kafka_brokers,
            batch_size: env_i64("OUTBOX_PUBLISH_BATCH_SIZE", 50),
            poll_interval: Duration::from_millis(env_u64("OUTBOX_PUBLISH_POLL_MS", 500)),
            max_attempts: env_i32("OUTBOX_MAX_ATTEMPTS", 10),
            publish_timeout: Duration::from_secs(env_u64("OUTBOX_PUBLISH_TIMEOUT_SECS", 15)),
            max_backoff: Duration::from_secs(env_u64("OUTBOX_MAX_BACKOFF_SECS", 10)),
            jitter_window: Duration::from_millis(env_u64("OUTBOX_JITTER_MS", 250)),
        })
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_i32(key: &str, default: i32) -> i32 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[serial_test::serial]
    fn defaults_match_spec() {
        std::env::set_var("KAFKA_BROKERS", "localhost:9092");
        std::env::remove_var("OUTBOX_PUBLISH_BATCH_SIZE");
        std::env::remove_var("OUTBOX_MAX_ATTEMPTS");

        let config = PublisherConfig::from_env().unwrap();
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.max_attempts, 10);
        assert_eq!(config.publish_timeout, Duration::from_secs(15));
        assert_eq!(config.max_backoff, Duration::from_secs(10));
        assert_eq!(config.jitter_window, Duration::from_millis(250));

        std::env::remove_var("KAFKA_BROKERS");
    }

    #[test]
    #[serial_test::serial]
    fn missing_kafka_brokers_is_an_error() {
        std::env::remove_var("KAFKA_BROKERS");
        assert!(PublisherConfig::from_env().is_err());
    }
}
