//! Cluster-wide mutual exclusion for the tick loop (spec §4.5).
//!
//! Grounded in the same `SET NX EX` shape [`session-cache`] and
//! [`idempotent-consumer`] already use for first-writer-wins claims — here
//! the "claim" is holding the right to run jobs this lease period rather
//! than a dedup marker.

use rand::Rng;
use redis::AsyncCommands;
use redis_utils::SharedConnectionManager;
use std::time::Duration;
use tracing::{debug, warn};

/// `pf:cron-worker:lock:<env>`.
pub fn lock_key(env: &str) -> String {
    format!("pf:cron-worker:lock:{env}")
}

fn random_token() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    hex::encode(bytes)
}

/// A held or unheld claim on the scheduler's single-writer lease.
pub struct ClusterLock {
    manager: SharedConnectionManager,
    key: String,
    ttl: Duration,
    token: String,
    held: bool,
}

impl ClusterLock {
    pub fn new(manager: SharedConnectionManager, key: String, ttl: Duration) -> Self {
        Self {
            manager,
            key,
            ttl,
            token: random_token(),
            held: false,
        }
    }

    /// Attempt to acquire or renew the lease. Renewal re-issues a fresh
    /// token and `SET ... NX` only succeeds for a holder that doesn't
    /// already own the key, so a current holder renews via
    /// [`Self::refresh`] instead of calling this again.
    pub async fn try_acquire(&mut self) -> bool {
        let mut conn = self.manager.lock().await;
        let acquired: bool = match redis::cmd("SET")
            .arg(&self.key)
            .arg(&self.token)
            .arg("NX")
            .arg("EX")
            .arg(self.ttl.as_secs())
            .query_async::<_, Option<String>>(&mut *conn)
            .await
        {
            Ok(v) => v.is_some(),
            Err(e) => {
                warn!(error = %e, "cluster lock acquisition failed");
                false
            }
        };

        if acquired {
            debug!(key = %self.key, "acquired scheduler cluster lock");
        }
        self.held = acquired;
        acquired
    }

    /// Extend the lease TTL if we still hold it. Compares the stored token
    /// before extending so an expired-and-reacquired-by-another-holder
    /// lock is never clobbered.
    pub async fn refresh(&mut self) -> bool {
        if !self.held {
            return false;
        }

        let mut conn = self.manager.lock().await;
        let current: Option<String> = match conn.get(&self.key).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "cluster lock refresh read failed");
                self.held = false;
                return false;
            }
        };

        if current.as_deref() != Some(self.token.as_str()) {
            warn!(key = %self.key, "lost scheduler cluster lock lease (token mismatch)");
            self.held = false;
            return false;
        }

        if let Err(e) = conn.expire::<_, ()>(&self.key, self.ttl.as_secs() as i64).await {
            warn!(error = %e, "cluster lock TTL refresh failed");
            self.held = false;
            return false;
        }

        true
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    /// Release the lease early if we still hold it, checking the token
    /// first so we never delete another holder's lock.
    pub async fn release(&mut self) {
        if !self.held {
            return;
        }
        let mut conn = self.manager.lock().await;
        let current: Option<String> = conn.get(&self.key).await.unwrap_or(None);
        if current.as_deref() == Some(self.token.as_str()) {
            let _: Result<(), _> = conn.del(&self.key).await;
        }
        self.held = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_key_is_scoped_by_environment() {
        assert_eq!(lock_key("production"), "pf:cron-worker:lock:production");
        assert_ne!(lock_key("staging"), lock_key("production"));
    }

    #[test]
    fn tokens_are_unique() {
        assert_ne!(random_token(), random_token());
    }
}
