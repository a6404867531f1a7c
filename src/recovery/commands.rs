//! Recovery hooks backed by shell commands from config.

use tokio::process::Command;

use crate::config::HooksConfig;
use crate::recovery::hooks::{HookError, RecoveryHooks};

impl RecoveryHooks {
    /// Build hooks that run the configured commands through `sh -c`.
    ///
    /// Unset commands leave the hook absent. A non-zero exit is a hook error.
    pub fn from_commands(config: &HooksConfig) -> Self {
        let mut hooks = RecoveryHooks::new();
        if let Some(cmd) = config.graceful_restart.clone() {
            hooks = hooks.on_graceful_restart(move || run_command("graceful_restart", cmd.clone()));
        }
        if let Some(cmd) = config.hard_restart.clone() {
            hooks = hooks.on_hard_restart(move || run_command("hard_restart", cmd.clone()));
        }
        if let Some(cmd) = config.clear_caches.clone() {
            hooks = hooks.on_clear_caches(move || run_command("clear_caches", cmd.clone()));
        }
        hooks
    }
}

async fn run_command(hook: &'static str, command: String) -> Result<(), HookError> {
    tracing::info!(hook, command = %command, "Running recovery command");
    let output = Command::new("sh")
        .arg("-c")
        .arg(&command)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| HookError::new(format!("failed to spawn `{}`: {}", command, e)))?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    tracing::warn!(hook, status = %output.status, stderr = %stderr.trim(), "Recovery command failed");
    Err(HookError::new(format!("`{}` exited with {}", command, output.status)))
}
