//! Unified error taxonomy for the marketplace event backbone.
//!
//! Every component-local error type (outbox, registry, consumer framework,
//! scheduler, session cache) ultimately maps into [`DomainError`] at its
//! boundary so that the HTTP edge and operator tooling see one closed,
//! serializable shape.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The closed set of error kinds from the backbone's error design.
///
/// Each variant carries its own safe, client-facing message; callers that
/// need to log the real cause should do so before converting into this type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("{0}")]
    Validation(String),

    #[error("authentication required")]
    Unauthenticated,

    #[error("not authorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("resource not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("{0}")]
    StateConflict(String),

    #[error("idempotency key reused with a different request body")]
    IdempotencyReused,

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("internal error")]
    Internal,

    #[error("dependency unavailable: {0}")]
    Dependency(String),
}

impl DomainError {
    pub fn http_status(&self) -> u16 {
        match self {
            DomainError::Validation(_) => 400,
            DomainError::Unauthenticated => 401,
            DomainError::Unauthorized => 401,
            DomainError::Forbidden => 403,
            DomainError::NotFound => 404,
            DomainError::Conflict => 409,
            DomainError::StateConflict(_) => 409,
            DomainError::IdempotencyReused => 409,
            DomainError::RateLimited => 429,
            DomainError::Internal => 500,
            DomainError::Dependency(_) => 503,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Validation(_) => "VALIDATION_ERROR",
            DomainError::Unauthenticated => "UNAUTHENTICATED",
            DomainError::Unauthorized => "UNAUTHORIZED",
            DomainError::Forbidden => "FORBIDDEN",
            DomainError::NotFound => "NOT_FOUND",
            DomainError::Conflict => "CONFLICT",
            DomainError::StateConflict(_) => "STATE_CONFLICT",
            DomainError::IdempotencyReused => "IDEMPOTENCY_KEY_REUSED",
            DomainError::RateLimited => "RATE_LIMITED",
            DomainError::Internal => "INTERNAL",
            DomainError::Dependency(_) => "DEPENDENCY_UNAVAILABLE",
        }
    }

    /// Whether `details` is safe to surface to the client for this kind.
    ///
    /// Per the error design, only validation, state-conflict, and dependency
    /// errors carry metadata worth exposing; everything else's details are
    /// suppressed to avoid leaking internal state.
    fn details_allowed(&self) -> bool {
        matches!(
            self,
            DomainError::Validation(_) | DomainError::StateConflict(_) | DomainError::Dependency(_)
        )
    }

    /// Whether this error kind should be retried by a caller driving a
    /// publish/consume loop, vs treated as terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DomainError::Dependency(_))
    }

    pub fn to_response(&self, details: Option<serde_json::Value>) -> ErrorResponse {
        ErrorResponse {
            error: ErrorBody {
                code: self.code().to_string(),
                message: self.to_string(),
                details: if self.details_allowed() { details } else { None },
            },
        }
    }
}

/// Wire format for API errors: `{"error": {"code", "message", "details"?}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Classify a `sqlx::Error` into the closed taxonomy per the error design's
/// Postgres mapping: unique violation -> Conflict, FK violation ->
/// Validation, not-null -> Validation, invalid-format -> Validation, other
/// -> Dependency.
pub fn classify_pg_error(err: &sqlx::Error) -> DomainError {
    match err {
        sqlx::Error::RowNotFound => DomainError::NotFound,
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            Some("23505") => DomainError::Conflict, // unique_violation
            Some("23503") => DomainError::Validation("invalid reference".to_string()), // fk
            Some("23502") => DomainError::Validation("missing required field".to_string()), // not_null
            Some("22P02") => DomainError::Validation("invalid input format".to_string()), // invalid_text_representation
            _ => DomainError::Dependency(db_err.message().to_string()),
        },
        _ => DomainError::Dependency(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(DomainError::NotFound.http_status(), 404);
        assert_eq!(DomainError::IdempotencyReused.http_status(), 409);
        assert_eq!(DomainError::RateLimited.http_status(), 429);
        assert_eq!(DomainError::Dependency("db down".into()).http_status(), 503);
    }

    #[test]
    fn details_suppressed_for_unsafe_kinds() {
        let details = Some(serde_json::json!({"field": "email"}));
        let resp = DomainError::Unauthorized.to_response(details.clone());
        assert!(resp.error.details.is_none());

        let resp = DomainError::Validation("bad email".into()).to_response(details);
        assert!(resp.error.details.is_some());
    }

    #[test]
    fn dependency_errors_are_retryable() {
        assert!(DomainError::Dependency("timeout".into()).is_retryable());
        assert!(!DomainError::Validation("x".into()).is_retryable());
        assert!(!DomainError::NotFound.is_retryable());
    }
}
