//! `pf:session:access:<jti>` — refresh-token rotation (spec §4.6).

use rand::RngCore;
use redis::AsyncCommands;
use redis_utils::SharedConnectionManager;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{SessionCacheError, SessionCacheResult};

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compare two byte slices in time independent of where they first differ,
/// to avoid leaking the stored hash through response-timing side channels.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

fn session_key(jti: &str) -> String {
    format!("pf:session:access:{jti}")
}

fn random_refresh_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Refresh-token mapping keyed by the access token's `jti` claim.
#[derive(Clone)]
pub struct SessionCache {
    manager: SharedConnectionManager,
    refresh_ttl: Duration,
}

impl SessionCache {
    pub fn new(manager: SharedConnectionManager, refresh_ttl: Duration) -> Self {
        Self {
            manager,
            refresh_ttl,
        }
    }

    /// Generate a fresh refresh token for `jti`. Only the SHA-256 hash is
    /// persisted; the plaintext is returned once to the caller and never
    /// stored.
    pub async fn generate(&self, jti: &str) -> SessionCacheResult<String> {
        let token = random_refresh_token();
        let hashed = hash_token(&token);

        let mut conn = self.manager.lock().await;
        conn.set_ex::<_, _, ()>(session_key(jti), hashed, self.refresh_ttl.as_secs())
            .await?;

        debug!(jti = %jti, "session created");
        Ok(token)
    }

    /// Rotate the refresh token for `old_jti`: claim the old mapping with
    /// `GETDEL` so the read-and-delete is one atomic round-trip, then write
    /// the new jti's mapping. Two concurrent rotations against the same
    /// `old_jti` race on `GETDEL` itself rather than on a separate GET —
    /// exactly one observes the stored hash and proceeds, the other gets
    /// `nil` and fails with `InvalidRefresh`.
    pub async fn rotate(
        &self,
        old_jti: &str,
        new_jti: &str,
        provided_refresh: &str,
    ) -> SessionCacheResult<String> {
        let stored_hash: Option<String> = {
            let mut conn = self.manager.lock().await;
            conn.get_del(session_key(old_jti)).await?
        };

        let stored_hash = match stored_hash {
            Some(h) => h,
            None => {
                warn!(jti = %old_jti, "rotate attempted against missing or already-claimed session");
                return Err(SessionCacheError::InvalidRefresh);
            }
        };

        let provided_hash = hash_token(provided_refresh);
        if !constant_time_eq(stored_hash.as_bytes(), provided_hash.as_bytes()) {
            warn!(jti = %old_jti, "rotate attempted with mismatched refresh token");
            return Err(SessionCacheError::InvalidRefresh);
        }

        let new_token = random_refresh_token();
        let new_hash = hash_token(&new_token);

        let mut conn = self.manager.lock().await;
        conn.set_ex::<_, _, ()>(session_key(new_jti), new_hash, self.refresh_ttl.as_secs())
            .await?;

        info!(old_jti = %old_jti, new_jti = %new_jti, "session rotated");
        Ok(new_token)
    }

    /// Delete the session mapping outright (logout, forced revocation).
    pub async fn revoke(&self, jti: &str) -> SessionCacheResult<()> {
        let mut conn = self.manager.lock().await;
        conn.del::<_, ()>(session_key(jti)).await?;
        debug!(jti = %jti, "session revoked");
        Ok(())
    }

    /// Presence check used by HTTP middleware to reject access tokens whose
    /// session has been revoked even though the JWT itself has not expired.
    pub async fn has(&self, jti: &str) -> SessionCacheResult<bool> {
        let mut conn = self.manager.lock().await;
        let exists: bool = conn.exists(session_key(jti)).await?;
        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash_token("abc"), hash_token("abc"));
        assert_ne!(hash_token("abc"), hash_token("abd"));
    }

    #[test]
    fn constant_time_eq_rejects_different_lengths() {
        assert!(!constant_time_eq(b"short", b"longer-value"));
    }

    #[test]
    fn constant_time_eq_matches_equal_slices() {
        assert!(constant_time_eq(b"matched", b"matched"));
    }

    #[test]
    fn random_tokens_are_not_reused() {
        let a = random_refresh_token();
        let b = random_refresh_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 64); // 32 bytes hex-encoded
    }
}
