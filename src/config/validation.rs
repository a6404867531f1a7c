//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, probe URL parses)
//! - Reject failover pairs that cannot alternate
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: MonitorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use crate::config::schema::MonitorConfig;
use crate::health::probe::probe_url;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &MonitorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.watcher.interval_ms == 0 {
        errors.push(ValidationError::new("watcher.interval_ms", "must be greater than 0"));
    }
    if config.watcher.state_path.as_os_str().is_empty() {
        errors.push(ValidationError::new("watcher.state_path", "must not be empty"));
    }

    if config.probe.timeout_ms == 0 {
        errors.push(ValidationError::new("probe.timeout_ms", "must be greater than 0"));
    }
    if config.probe.timeout_ms > config.watcher.interval_ms && config.watcher.interval_ms > 0 {
        errors.push(ValidationError::new(
            "probe.timeout_ms",
            "must not exceed watcher.interval_ms",
        ));
    }
    if let Err(e) = probe_url(&config.probe) {
        errors.push(ValidationError::new("probe.base_url", e.to_string()));
    }

    if config.models.primary.trim().is_empty() {
        errors.push(ValidationError::new("models.primary", "must not be empty"));
    }
    if config.models.fallback.trim().is_empty() {
        errors.push(ValidationError::new("models.fallback", "must not be empty"));
    }
    if config.models.primary == config.models.fallback {
        errors.push(ValidationError::new(
            "models.fallback",
            "must differ from models.primary",
        ));
    }

    if config.server.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::new("server.bind_address", "not a socket address"));
    }
    if config.admin.enabled && config.admin.api_key.is_empty() {
        errors.push(ValidationError::new("admin.api_key", "required when admin is enabled"));
    }
    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "not a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
