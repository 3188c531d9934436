use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub environment: String,
    pub tick_interval: Duration,
    pub lock_ttl: Duration,
    pub order_ttl: chrono::Duration,
    pub outbox_retention: chrono::Duration,
    pub notification_retention: chrono::Duration,
    pub media_grace_period: chrono::Duration,
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        Self {
            environment: std::env::var("DEPLOY_ENV").unwrap_or_else(|_| "development".to_string()),
            tick_interval: Duration::from_secs(env_u64("SCHEDULER_TICK_INTERVAL_SECS", 15)),
            lock_ttl: Duration::from_secs(env_u64("SCHEDULER_LOCK_TTL_SECS", 30)),
            order_ttl: chrono::Duration::hours(env_i64("ORDER_PENDING_TTL_HOURS", 48)),
            outbox_retention: chrono::Duration::days(env_i64("OUTBOX_RETENTION_DAYS", 30)),
            notification_retention: chrono::Duration::days(env_i64("NOTIFICATION_RETENTION_DAYS", 90)),
            media_grace_period: chrono::Duration::hours(env_i64("MEDIA_PENDING_GRACE_HOURS", 24)),
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[serial_test::serial]
    fn defaults() {
        std::env::remove_var("SCHEDULER_TICK_INTERVAL_SECS");
        std::env::remove_var("ORDER_PENDING_TTL_HOURS");
        let config = SchedulerConfig::from_env();
        assert_eq!(config.tick_interval, Duration::from_secs(15));
        assert_eq!(config.order_ttl, chrono::Duration::hours(48));
    }
}
