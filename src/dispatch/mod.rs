//! Batch request orchestration.
//!
//! # Data Flow
//! ```text
//! POST /analyze
//!     → auth (503 misconfigured / 401 mismatch)
//!     → rate limit (429)
//!     → body + batch validation (400)
//!     → backend availability (500)
//!     → per path, in order:
//!         containment → regular file → model | heuristic
//!     → AnalyzeResponse (ok = any item ok)
//! ```
//!
//! # Design Decisions
//! - Request-level failures short-circuit the batch
//! - Item failures are isolated and reported with fixed messages
//! - Internal inference errors are logged, never returned

pub mod dispatcher;
pub mod types;

pub use dispatcher::RequestDispatcher;
pub use types::{AnalyzeItemResult, AnalyzeRequest, AnalyzeResponse, ItemError};
