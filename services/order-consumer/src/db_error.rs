//! Classifies a raw `sqlx::Error` into the ack/nack decision spec §4.4/§7
//! describe for consumers, same split media-consumer uses.

use consumer_framework::ConsumerError;

pub fn classify(err: sqlx::Error) -> ConsumerError {
    match &err {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => ConsumerError::Transient(err.to_string()),
        sqlx::Error::Database(db_err) if db_err.message().to_lowercase().contains("timeout") => {
            ConsumerError::Transient(err.to_string())
        }
        _ => ConsumerError::Other(err.to_string()),
    }
}
