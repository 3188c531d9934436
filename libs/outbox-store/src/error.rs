use thiserror::Error;
use uuid::Uuid;

pub type OutboxResult<T> = Result<T, OutboxError>;

#[derive(Debug, Error)]
pub enum OutboxError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("outbox row {0} not found")]
    RowNotFound(Uuid),
}
