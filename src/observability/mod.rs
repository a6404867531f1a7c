//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Watcher, recovery plan and HTTP surface produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Metrics are cheap (atomic increments) and safe to call with no recorder
//! - Health state stays the operator-facing truth; metrics mirror it

pub mod logging;
pub mod metrics;
