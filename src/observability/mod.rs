//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Secret handler produces:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, JSON or pretty)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through the per-request span
//! - Metrics are cheap (atomic increments)
//! - Secret payloads are never logged

pub mod logging;
pub mod metrics;
