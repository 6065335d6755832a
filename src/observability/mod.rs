//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout log aggregation
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Request ID (x-request-id) set at the edge and carried on the trace span
//! - Metric calls are no-ops until an exporter is installed
//! - Inference error detail goes to logs only

pub mod logging;
pub mod metrics;
