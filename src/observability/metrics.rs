//! Metrics collection and exposition.
//!
//! # Metrics
//! - `self_heal_ticks_total` (counter): ticks by outcome
//! - `self_heal_probe_duration_seconds` (histogram): probe latency
//! - `self_heal_failures` (gauge): current consecutive failures
//! - `self_heal_locked` (gauge): 1 when automatic remediation has stopped
//! - `self_heal_fixes_total` (counter): remediation attempts by fix and result

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::state::HealthState;

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_tick(outcome: &'static str) {
    metrics::counter!("self_heal_ticks_total", "outcome" => outcome).increment(1);
}

pub fn record_probe(elapsed: Duration, healthy: bool) {
    metrics::histogram!(
        "self_heal_probe_duration_seconds",
        "healthy" => if healthy { "true" } else { "false" }
    )
    .record(elapsed.as_secs_f64());
}

pub fn record_state(state: &HealthState) {
    metrics::gauge!("self_heal_failures").set(state.failures as f64);
    metrics::gauge!("self_heal_locked").set(if state.lock { 1.0 } else { 0.0 });
}

pub fn record_fix(fix: &str, succeeded: bool) {
    metrics::counter!(
        "self_heal_fixes_total",
        "fix" => fix.to_string(),
        "result" => if succeeded { "ok" } else { "failed" }
    )
    .increment(1);
}
