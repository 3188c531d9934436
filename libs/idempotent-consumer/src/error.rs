use thiserror::Error;

pub type IdempotencyResult<T> = Result<T, IdempotencyError>;

#[derive(Debug, Error)]
pub enum IdempotencyError {
    #[error("invalid event id: {0}")]
    InvalidEventId(String),

    #[error("cache error: {0}")]
    Cache(#[from] redis::RedisError),
}
