use axum::{
    extract::State,
    Json,
};
use serde::Serialize;
use crate::health::TickOutcome;
use crate::http::server::AppState;
use crate::state::HealthState;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub watcher_running: bool,
    pub uptime_sec: u64,
}

pub async fn get_status(
    State(state): State<AppState>,
) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        watcher_running: state.watcher.is_running(),
        uptime_sec: state.reporter.uptime_sec(),
    })
}

/// Full persisted health state.
pub async fn get_state(
    State(state): State<AppState>,
) -> Json<HealthState> {
    Json(state.reporter.state())
}

/// Clear the lock after manual intervention.
pub async fn post_unlock(
    State(state): State<AppState>,
) -> Json<HealthState> {
    Json(state.watcher.unlock().await)
}

/// Run one tick now instead of waiting for the timer.
pub async fn post_tick(
    State(state): State<AppState>,
) -> Json<TickOutcome> {
    Json(state.watcher.tick().await)
}
