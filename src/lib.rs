//! Self-heal monitor and recovery engine.

pub mod admin;
pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod recovery;
pub mod state;

pub use config::schema::MonitorConfig;
pub use health::{HealthReporter, TickOutcome, Watcher};
pub use recovery::{RecoveryHooks, RecoveryPlan};
pub use state::{HealthState, StateStore, Status};
