//! Health state record and its bookkeeping rules.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Consecutive failures at which health is considered degraded.
pub const DEGRADED_THRESHOLD: u32 = 2;

/// Consecutive failures at which health is considered critical.
pub const CRITICAL_THRESHOLD: u32 = 5;

/// Length of the restart counting window in seconds.
pub const RESTART_WINDOW_SECS: u64 = 24 * 60 * 60;

/// Length of the model switch counting window in seconds.
pub const SWITCH_WINDOW_SECS: u64 = 5 * 60;

/// Seconds since the unix epoch.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Health classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Ok,
    Degraded,
    Critical,
}

impl Status {
    /// Classify a consecutive failure count.
    pub fn from_failures(failures: u32) -> Self {
        if failures >= CRITICAL_THRESHOLD {
            Status::Critical
        } else if failures >= DEGRADED_THRESHOLD {
            Status::Degraded
        } else {
            Status::Ok
        }
    }

    /// Parse a status string. Anything unrecognized is `Degraded`.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "ok" => Status::Ok,
            "critical" => Status::Critical,
            _ => Status::Degraded,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Ok => "ok",
            Status::Degraded => "degraded",
            Status::Critical => "critical",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(match value {
            serde_json::Value::String(s) => Status::parse_lenient(&s),
            _ => Status::Degraded,
        })
    }
}

/// The persisted health and recovery record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthState {
    pub status: Status,
    /// Backend/model variant currently selected.
    pub active_model: String,
    /// Consecutive failures since the last success.
    pub failures: u32,
    pub last_error: Option<String>,
    /// Name of the last remediation applied.
    pub last_fix: Option<String>,
    /// Unix seconds of the last restart-class action, 0 if never.
    pub last_restart: u64,
    pub restart_count_24h: u32,
    pub model_switches_5m: u32,
    /// Unix seconds of the last model switch, 0 if never.
    #[serde(default)]
    pub last_model_switch: u64,
    /// Terminal flag. Only manual intervention clears it.
    pub lock: bool,
}

impl HealthState {
    /// Fresh state with the given model selected.
    pub fn new(active_model: impl Into<String>) -> Self {
        Self {
            status: Status::Ok,
            active_model: active_model.into(),
            failures: 0,
            last_error: None,
            last_fix: None,
            last_restart: 0,
            restart_count_24h: 0,
            model_switches_5m: 0,
            last_model_switch: 0,
            lock: false,
        }
    }

    /// Record a failed probe.
    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.failures = self.failures.saturating_add(1);
        self.last_error = Some(error.into());
        self.status = if self.lock {
            Status::Critical
        } else {
            Status::from_failures(self.failures)
        };
    }

    /// Record a successful probe.
    ///
    /// A locked state stays critical: the failure streak is over but automatic
    /// remediation has already given up, and an operator still has to look.
    pub fn record_success(&mut self) {
        self.failures = 0;
        self.last_error = None;
        self.last_fix = None;
        self.status = if self.lock { Status::Critical } else { Status::Ok };
    }

    /// Enter the terminal state.
    pub fn engage_lock(&mut self) {
        self.lock = true;
        self.status = Status::Critical;
    }

    /// Manual intervention: leave the terminal state and start over.
    pub fn unlock(&mut self) {
        self.lock = false;
        self.failures = 0;
        self.last_error = None;
        self.last_fix = None;
        self.status = Status::Ok;
    }

    /// Count a restart-class action at `now`.
    pub fn note_restart(&mut self, now: u64) {
        self.roll_windows(now);
        self.restart_count_24h = self.restart_count_24h.saturating_add(1);
        self.last_restart = now;
    }

    /// Count a model switch at `now`.
    pub fn note_model_switch(&mut self, target: &str, now: u64) {
        self.roll_windows(now);
        self.active_model = target.to_string();
        self.model_switches_5m = self.model_switches_5m.saturating_add(1);
        self.last_model_switch = now;
    }

    /// Reset windowed counters whose window has elapsed.
    pub fn roll_windows(&mut self, now: u64) {
        if self.restart_count_24h > 0
            && now.saturating_sub(self.last_restart) > RESTART_WINDOW_SECS
        {
            self.restart_count_24h = 0;
        }
        if self.model_switches_5m > 0
            && now.saturating_sub(self.last_model_switch) > SWITCH_WINDOW_SECS
        {
            self.model_switches_5m = 0;
        }
    }
}
