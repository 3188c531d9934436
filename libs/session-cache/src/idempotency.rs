//! `pf:idempotency:<scope>:<key>` — POST idempotency replay (spec §4.6).

use redis::AsyncCommands;
use redis_utils::SharedConnectionManager;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::SessionCacheResult;

/// General-purpose replay TTL (24h) per spec §3/§4.6.
pub const GENERAL_TTL: Duration = Duration::from_secs(24 * 3600);
/// Extended replay TTL (7d) for money-touching operations.
pub const MONEY_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

/// The tuple spec §3 defines as the idempotency key: caller identity,
/// optional active store scope, HTTP method/path, and the client-supplied
/// idempotency key.
#[derive(Debug, Clone)]
pub struct IdempotencyScope {
    pub user_id: Uuid,
    pub active_store_id: Option<Uuid>,
    pub method: String,
    pub path: String,
    pub client_key: String,
}

impl IdempotencyScope {
    fn cache_key(&self) -> String {
        let store = self
            .active_store_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "none".to_string());
        format!(
            "pf:idempotency:{}:{}:{}:{}:{}",
            self.user_id, store, self.method, self.path, self.client_key
        )
    }
}

/// The cached response replayed byte-for-byte on a matching retry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedResponse {
    pub body_hash: String,
    pub status: u16,
    pub content_type: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Result of checking the cache before running a handler.
#[derive(Debug, Clone)]
pub enum LookupOutcome {
    /// No entry yet; caller should run its handler and [`IdempotencyCache::store`]
    /// the outcome.
    Miss,
    /// A matching entry exists for the same body fingerprint; replay it
    /// verbatim.
    Replay(CachedResponse),
    /// An entry exists under this key but for a different body fingerprint;
    /// this is the `IDEMPOTENCY_KEY_REUSED` case.
    Reused,
}

pub fn hash_body(body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body);
    hex::encode(hasher.finalize())
}

#[derive(Clone)]
pub struct IdempotencyCache {
    manager: SharedConnectionManager,
}

impl IdempotencyCache {
    pub fn new(manager: SharedConnectionManager) -> Self {
        Self { manager }
    }

    /// Check whether `scope` already has a cached outcome for `body_hash`.
    pub async fn lookup(&self, scope: &IdempotencyScope, body_hash: &str) -> SessionCacheResult<LookupOutcome> {
        let mut conn = self.manager.lock().await;
        let raw: Option<String> = conn.get(scope.cache_key()).await?;

        let Some(raw) = raw else {
            return Ok(LookupOutcome::Miss);
        };

        let cached: CachedResponse = match serde_json::from_str(&raw) {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "failed to deserialize cached idempotency entry, treating as miss");
                return Ok(LookupOutcome::Miss);
            }
        };

        if cached.body_hash == body_hash {
            debug!(key = %scope.client_key, "idempotency replay hit");
            Ok(LookupOutcome::Replay(cached))
        } else {
            warn!(key = %scope.client_key, "idempotency key reused with a different request body");
            Ok(LookupOutcome::Reused)
        }
    }

    /// First-writer-wins store of a freshly computed outcome. Returns
    /// `true` if this call won the race and the entry is now cached;
    /// `false` if a concurrent duplicate request already claimed the key
    /// (the caller should re-[`Self::lookup`] and replay that instead).
    pub async fn store(
        &self,
        scope: &IdempotencyScope,
        entry: &CachedResponse,
        ttl: Duration,
    ) -> SessionCacheResult<bool> {
        let serialized = serde_json::to_string(entry).expect("CachedResponse always serializes");

        let mut conn = self.manager.lock().await;
        let claimed: bool = redis::cmd("SET")
            .arg(scope.cache_key())
            .arg(serialized)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs())
            .query_async(&mut *conn)
            .await
            .map(|v: Option<String>| v.is_some())?;

        if claimed {
            info!(key = %scope.client_key, "idempotency entry stored");
        } else {
            debug!(key = %scope.client_key, "idempotency entry lost the write race to a concurrent duplicate");
        }
        Ok(claimed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_body_is_deterministic() {
        assert_eq!(hash_body(b"payload"), hash_body(b"payload"));
        assert_ne!(hash_body(b"payload"), hash_body(b"other"));
    }

    #[test]
    fn cache_key_distinguishes_store_scope() {
        let base = IdempotencyScope {
            user_id: Uuid::nil(),
            active_store_id: None,
            method: "POST".into(),
            path: "/api/v1/auth/register".into(),
            client_key: "k1".into(),
        };
        let scoped = IdempotencyScope {
            active_store_id: Some(Uuid::new_v4()),
            ..base.clone()
        };
        assert_ne!(base.cache_key(), scoped.cache_key());
    }
}
