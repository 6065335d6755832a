//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming analyze request:
//!     → auth.rs (secret configured, strong, and matching)
//!     → rate_limit/ (per-identity admission)
//!     → paths.rs (per-item containment in allowed roots)
//!     → Pass to inference
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - Misconfiguration (missing or weak secret) is reported as such, never as `401`
//! - No trust in client-supplied paths

pub mod auth;
pub mod paths;
pub mod rate_limit;

pub use auth::{AuthPolicy, KeyStrengthValidator, ENGINE_KEY_HEADER};
pub use paths::AllowedRootSet;
pub use rate_limit::{identity_key, RateLimiter, RATE_LIMIT_KEY_HEADER};
