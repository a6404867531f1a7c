//! Recovery subsystem.
//!
//! # Data Flow
//! ```text
//! HealthState (failures, last_error, active_model)
//!     → plan.rs decide (pure fix ladder)
//!     → FixAction
//!     → plan.rs apply (counter bookkeeping, persist)
//!     → hooks.rs (host-supplied restart / cache callbacks)
//! ```
//!
//! # Design Decisions
//! - Deciding is separate from executing so the ladder is testable alone
//! - Hooks are optional; a missing hook makes its action bookkeeping-only
//! - Actions never retry; the watcher decides what happens next tick

pub mod commands;
pub mod hooks;
pub mod plan;

pub use hooks::{HookError, RecoveryHooks};
pub use plan::{FixAction, ModelPair, RecoveryError, RecoveryPlan};
