//! `pf:`-namespaced session and idempotency cache contract (spec §4.6).
//!
//! Three key segments share one Redis-backed contract: refresh-token
//! rotation (`session`), POST idempotency replay (`idempotency`), and a
//! fixed-window rate-limit counter (`rate_limit`).

pub mod error;
pub mod idempotency;
pub mod rate_limit;
pub mod session;

pub use error::{SessionCacheError, SessionCacheResult};
pub use idempotency::{CachedResponse, IdempotencyCache, IdempotencyScope, LookupOutcome};
pub use rate_limit::RateLimiter;
pub use session::SessionCache;
