//! Read-only health report for dashboards and orchestrators.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::state::{HealthState, StateStore, Status};

/// Message reported when the state record cannot be read.
pub const STATE_UNAVAILABLE: &str = "health state unavailable";

/// Report served at `/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: Status,
    pub uptime_sec: u64,
    pub active_model: String,
    pub last_error: Option<String>,
    pub restarts_24h: u32,
}

/// Builds [`HealthReport`]s from the persisted state. Never writes.
#[derive(Debug, Clone)]
pub struct HealthReporter {
    store: StateStore,
    defaults: HealthState,
    started: Instant,
}

impl HealthReporter {
    pub fn new(store: StateStore, defaults: HealthState) -> Self {
        Self::with_start(store, defaults, Instant::now())
    }

    /// Use an explicit process start time for uptime.
    pub fn with_start(store: StateStore, defaults: HealthState, started: Instant) -> Self {
        Self {
            store,
            defaults,
            started,
        }
    }

    pub fn uptime_sec(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    /// Current report. An unreadable record reports critical.
    pub fn report(&self) -> HealthReport {
        let uptime_sec = self.uptime_sec();
        match self.store.read_strict(&self.defaults) {
            Ok(state) => {
                let state = state.unwrap_or_else(|| self.defaults.clone());
                HealthReport {
                    status: state.status,
                    uptime_sec,
                    active_model: state.active_model,
                    last_error: state
                        .last_error
                        .map(|e| e.trim().to_string())
                        .filter(|e| !e.is_empty()),
                    restarts_24h: state.restart_count_24h,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Health report fell back to critical");
                HealthReport {
                    status: Status::Critical,
                    uptime_sec,
                    active_model: self.defaults.active_model.clone(),
                    last_error: Some(STATE_UNAVAILABLE.to_string()),
                    restarts_24h: 0,
                }
            }
        }
    }

    /// Full persisted record, defaulted when absent or corrupt.
    pub fn state(&self) -> HealthState {
        self.store.load(&self.defaults)
    }
}
