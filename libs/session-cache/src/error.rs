use thiserror::Error;

pub type SessionCacheResult<T> = Result<T, SessionCacheError>;

#[derive(Debug, Error)]
pub enum SessionCacheError {
    #[error("cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("refresh token invalid or session not found")]
    InvalidRefresh,

    #[error("idempotency key reused with a different request body")]
    IdempotencyReused,
}
