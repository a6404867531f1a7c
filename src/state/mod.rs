//! Durable health state subsystem.
//!
//! # Data Flow
//! ```text
//! Watcher tick
//!     → store.rs load (defaults merged with salvaged fields)
//!     → types.rs bookkeeping (record_failure / record_success)
//!     → store.rs save (roll windows → temp file → fsync → rename)
//! ```
//!
//! # Design Decisions
//! - One JSON record per monitor; the file is the source of truth across ticks
//! - Loading never fails; a corrupt record is a fresh record
//! - Saving is best-effort; failures are logged, not propagated

pub mod store;
pub mod types;

pub use store::{StateStore, StoreError};
pub use types::{unix_now, HealthState, Status};
