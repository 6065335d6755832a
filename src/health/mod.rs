//! Health reporting subsystem.
//!
//! # Data Flow
//! ```text
//! GET /health
//!     → status.rs derives a HealthStatus from the inference backend,
//!       auth policy and rate-limit settings
//!     → always 200; problems are reported in `ok`, `error` and `warning`
//! ```
//!
//! # Design Decisions
//! - Nothing is stored; every check recomputes from immutable startup state
//! - Running on the heuristic fallback is a warning, not a failure
//! - No authentication so orchestrators can probe freely

pub mod status;

pub use status::HealthStatus;
