//! Fix ladder and remediation actions.
//!
//! # Fix Ladder
//! ```text
//! failures 2-3, error names the active provider or "timeout" → switch_model_to_<alternate>
//! failures 2-3, anything else                                → graceful_restart
//! failures 4                                                 → clear_caches
//! failures >= 5                                              → hard_restart
//! failures < 2                                               → nothing yet
//! ```

use std::fmt;

use thiserror::Error;

use crate::config::ModelsConfig;
use crate::recovery::hooks::{invoke, HookError, RecoveryHooks};
use crate::state::{unix_now, HealthState, StateStore};

/// Error raised while applying a fix.
#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("{action} hook failed: {source}")]
    Hook {
        action: String,
        #[source]
        source: HookError,
    },
}

/// One remediation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixAction {
    SwitchModel { target: String },
    GracefulRestart,
    ClearCaches,
    HardRestart,
}

impl FixAction {
    /// Stable name, recorded as `last_fix`.
    pub fn name(&self) -> String {
        match self {
            FixAction::SwitchModel { target } => format!("switch_model_to_{}", target),
            FixAction::GracefulRestart => "graceful_restart".to_string(),
            FixAction::ClearCaches => "clear_caches".to_string(),
            FixAction::HardRestart => "hard_restart".to_string(),
        }
    }
}

impl fmt::Display for FixAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// The two model providers failover alternates between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPair {
    pub primary: String,
    pub fallback: String,
}

impl ModelPair {
    pub fn new(primary: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            fallback: fallback.into(),
        }
    }

    /// The provider to switch to when `active` is failing.
    pub fn alternate(&self, active: &str) -> &str {
        if active == self.primary {
            &self.fallback
        } else {
            &self.primary
        }
    }
}

impl From<&ModelsConfig> for ModelPair {
    fn from(config: &ModelsConfig) -> Self {
        Self::new(config.primary.clone(), config.fallback.clone())
    }
}

/// Decides and executes remediation.
#[derive(Debug, Clone)]
pub struct RecoveryPlan {
    models: ModelPair,
    hooks: RecoveryHooks,
}

impl RecoveryPlan {
    pub fn new(models: ModelPair, hooks: RecoveryHooks) -> Self {
        Self { models, hooks }
    }

    pub fn models(&self) -> &ModelPair {
        &self.models
    }

    /// Pick the next fix for `state`, or `None` if there is not enough evidence.
    pub fn decide(&self, state: &HealthState) -> Option<FixAction> {
        let error = state
            .last_error
            .as_deref()
            .unwrap_or_default()
            .to_ascii_lowercase();
        let active = state.active_model.to_ascii_lowercase();

        match state.failures {
            0..=1 => None,
            2..=3 => {
                let provider_failing = !active.is_empty() && error.contains(&active);
                if provider_failing || error.contains("timeout") {
                    Some(FixAction::SwitchModel {
                        target: self.models.alternate(&state.active_model).to_string(),
                    })
                } else {
                    Some(FixAction::GracefulRestart)
                }
            }
            4 => Some(FixAction::ClearCaches),
            _ => Some(FixAction::HardRestart),
        }
    }

    /// Execute `action`: bookkeeping first, persisted, then the host hook.
    pub async fn apply(
        &self,
        action: &FixAction,
        state: &mut HealthState,
        store: &StateStore,
    ) -> Result<(), RecoveryError> {
        let now = unix_now();
        let hook = match action {
            FixAction::SwitchModel { target } => {
                state.note_model_switch(target, now);
                None
            }
            FixAction::GracefulRestart => {
                state.note_restart(now);
                self.hooks.graceful_restart.as_ref()
            }
            FixAction::ClearCaches => self.hooks.clear_caches.as_ref(),
            FixAction::HardRestart => {
                state.note_restart(now);
                self.hooks.hard_restart.as_ref()
            }
        };
        store.save(state);

        tracing::info!(
            fix = %action,
            active_model = %state.active_model,
            restarts_24h = state.restart_count_24h,
            model_switches_5m = state.model_switches_5m,
            hook = hook.is_some(),
            "Applying fix"
        );

        invoke(hook).await.map_err(|source| RecoveryError::Hook {
            action: action.name(),
            source,
        })
    }
}
