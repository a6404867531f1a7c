//! Health monitoring subsystem.
//!
//! # Data Flow
//! ```text
//! Watcher (watcher.rs):
//!     Timer fires
//!     → probe.rs GET /health with timeout
//!     → state bookkeeping, persisted
//!     → recovery plan on repeated failure
//!
//! Reporter (reporter.rs):
//!     GET /health on this daemon
//!     → read persisted state + uptime
//! ```
//!
//! # Design Decisions
//! - The watcher is the only writer; the reporter never mutates state
//! - State transitions require consecutive failures to prevent flapping
//! - A lock stops automatic remediation until an operator clears it

pub mod probe;
pub mod reporter;
pub mod watcher;

pub use probe::{HealthProbe, ProbeError};
pub use reporter::{HealthReport, HealthReporter};
pub use watcher::{RecoveryEvent, TickOutcome, Watcher};
