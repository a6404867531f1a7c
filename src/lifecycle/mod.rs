//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     trigger() → every subscriber (HTTP server, watcher loop) wakes → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop serving, disarm the watcher, let an in-flight tick finish
//! - Triggering is idempotent; late subscribers still observe it

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
