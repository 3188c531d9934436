//! Integration tests for session rotation and idempotency replay (spec §8
//! properties 8-9, scenarios S6/S9), run against a real Redis instance.
//!
//! Prerequisites:
//! - Redis reachable at `REDIS_URL`.
//!
//! Run:
//! ```bash
//! export REDIS_URL="redis://127.0.0.1:6379"
//! cargo test --package session-cache --test session_and_idempotency_test -- --ignored --nocapture
//! ```

use session_cache::idempotency::{CachedResponse, IdempotencyCache, IdempotencyScope, LookupOutcome, hash_body, GENERAL_TTL};
use session_cache::session::SessionCache;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

fn redis_url() -> String {
    env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

async fn manager() -> redis_utils::SharedConnectionManager {
    redis_utils::RedisPool::connect(&redis_url(), None)
        .await
        .expect("failed to connect to test redis")
        .manager()
}

/// S6 / property 8: two concurrent `rotate` calls against the same stored
/// refresh token race on `GETDEL`'s atomic read-and-delete; exactly one
/// claims the stored hash and succeeds, the other gets `nil` and fails
/// with `InvalidRefresh`.
#[ignore = "requires Redis"]
#[tokio::test]
async fn concurrent_rotation_has_exactly_one_winner() {
    let cache = Arc::new(SessionCache::new(manager().await, Duration::from_secs(3600)));
    let old_jti = format!("test-rotate-{}", Uuid::new_v4());
    let refresh = cache.generate(&old_jti).await.unwrap();

    let new_jti_a = format!("{old_jti}-a");
    let new_jti_b = format!("{old_jti}-b");

    let (cache_a, cache_b) = (cache.clone(), cache.clone());
    let (old_a, old_b) = (old_jti.clone(), old_jti.clone());
    let (refresh_a, refresh_b) = (refresh.clone(), refresh.clone());

    let task_a = tokio::spawn(async move { cache_a.rotate(&old_a, &new_jti_a, &refresh_a).await });
    let task_b = tokio::spawn(async move { cache_b.rotate(&old_b, &new_jti_b, &refresh_b).await });

    let (result_a, result_b) = tokio::join!(task_a, task_b);
    let results = [result_a.unwrap(), result_b.unwrap()];

    let successes = results.iter().filter(|r| r.is_ok()).count();
    let failures = results.iter().filter(|r| r.is_err()).count();
    assert_eq!(successes, 1, "exactly one concurrent rotation should succeed");
    assert_eq!(failures, 1, "the other concurrent rotation should see InvalidRefresh");

    assert!(!cache.has(&old_jti).await.unwrap(), "old session must be gone after rotation");

    cache.revoke(&format!("{old_jti}-a")).await.ok();
    cache.revoke(&format!("{old_jti}-b")).await.ok();
}

/// Property 8 (non-concurrent path): after a normal rotation, the old jti
/// is absent and the new jti is present.
#[ignore = "requires Redis"]
#[tokio::test]
async fn rotation_moves_session_from_old_to_new_jti() {
    let cache = SessionCache::new(manager().await, Duration::from_secs(3600));
    let old_jti = format!("test-rotate-seq-{}", Uuid::new_v4());
    let new_jti = format!("{old_jti}-next");
    let refresh = cache.generate(&old_jti).await.unwrap();

    cache.rotate(&old_jti, &new_jti, &refresh).await.unwrap();

    assert!(!cache.has(&old_jti).await.unwrap());
    assert!(cache.has(&new_jti).await.unwrap());

    cache.revoke(&new_jti).await.ok();
}

/// S9: two identical POSTs with the same key/body replay the same cached
/// response; the same key with a different body is rejected as reused.
#[ignore = "requires Redis"]
#[tokio::test]
async fn idempotency_replay_and_reuse_rejection() {
    let cache = IdempotencyCache::new(manager().await);
    let scope = IdempotencyScope {
        user_id: Uuid::new_v4(),
        active_store_id: None,
        method: "POST".to_string(),
        path: "/api/v1/auth/register".to_string(),
        client_key: format!("k-{}", Uuid::new_v4()),
    };

    let body_a = b"{\"email\":\"a@example.com\"}";
    let hash_a = hash_body(body_a);

    // Miss, then first-writer-wins store.
    assert!(matches!(cache.lookup(&scope, &hash_a).await.unwrap(), LookupOutcome::Miss));
    let response = CachedResponse {
        body_hash: hash_a.clone(),
        status: 201,
        content_type: "application/json".to_string(),
        headers: vec![],
        body: b"{\"id\":\"u1\"}".to_vec(),
    };
    let claimed = cache.store(&scope, &response, GENERAL_TTL).await.unwrap();
    assert!(claimed);

    // Same key, same body -> byte-identical replay.
    match cache.lookup(&scope, &hash_a).await.unwrap() {
        LookupOutcome::Replay(cached) => assert_eq!(cached.body, response.body),
        other => panic!("expected replay, got {other:?}"),
    }

    // Same key, different body -> rejected as reused.
    let body_b = b"{\"email\":\"b@example.com\"}";
    let hash_b = hash_body(body_b);
    assert!(matches!(cache.lookup(&scope, &hash_b).await.unwrap(), LookupOutcome::Reused));
}
