//! `pf:rate_limit:<scope>` — fixed-window counter (spec §4.6 expansion).
//!
//! Listed among the recognized key segments in spec §4.6 without a full
//! operation narrative; implemented as the minimal `INCR` + `EXPIRE NX`
//! pair consistent with the other two contracts' first-writer-wins shape —
//! the first increment in a window sets the expiry, later increments in
//! the same window leave it untouched.

use redis::AsyncCommands;
use redis_utils::SharedConnectionManager;
use std::time::Duration;

use crate::error::SessionCacheResult;

#[derive(Clone)]
pub struct RateLimiter {
    manager: SharedConnectionManager,
}

impl RateLimiter {
    pub fn new(manager: SharedConnectionManager) -> Self {
        Self { manager }
    }

    fn key(scope: &str) -> String {
        format!("pf:rate_limit:{scope}")
    }

    /// Increment the counter for `scope`, setting the window TTL only on
    /// the first increment. Returns the post-increment count.
    pub async fn incr(&self, scope: &str, window: Duration) -> SessionCacheResult<i64> {
        let mut conn = self.manager.lock().await;
        let count: i64 = conn.incr(Self::key(scope), 1).await?;
        if count == 1 {
            let _: bool = conn
                .expire_nx(Self::key(scope), window.as_secs() as i64)
                .await?;
        }
        Ok(count)
    }

    pub async fn current(&self, scope: &str) -> SessionCacheResult<i64> {
        let mut conn = self.manager.lock().await;
        let count: Option<i64> = conn.get(Self::key(scope)).await?;
        Ok(count.unwrap_or(0))
    }
}
