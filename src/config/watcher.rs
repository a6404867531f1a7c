//! Configuration file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use arc_swap::ArcSwap;
use notify::{Watcher, RecursiveMode, Event, RecommendedWatcher, Config};
use tokio::sync::mpsc;
use crate::config::loader::load_config;
use crate::config::schema::MonitorConfig;

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<MonitorConfig>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<MonitorConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (Self {
            path: path.to_path_buf(),
            update_tx,
        }, update_rx)
    }

    /// Start watching the file in a background thread.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Config file change detected, reloading...");
                        match load_config(&path) {
                            Ok(new_config) => {
                                let _ = tx.send(new_config);
                            }
                            Err(e) => {
                                tracing::error!("Failed to reload config: {}. Keeping current configuration.", e);
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            }
        }, Config::default().with_poll_interval(Duration::from_secs(2)))?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

/// Apply configuration updates to the shared live config until the channel closes.
///
/// Only the tick-time settings (interval, probe target) take effect live;
/// state path, model pair, hooks and listeners need a restart.
pub async fn apply_updates(
    live: Arc<ArcSwap<MonitorConfig>>,
    mut updates: mpsc::UnboundedReceiver<MonitorConfig>,
) {
    while let Some(new_config) = updates.recv().await {
        let current = live.load_full();
        if *current == new_config {
            continue;
        }
        if current.watcher.state_path != new_config.watcher.state_path
            || current.models != new_config.models
            || current.hooks != new_config.hooks
            || current.server != new_config.server
        {
            tracing::warn!("Some changed settings only apply after a restart");
        }
        tracing::info!(
            interval_ms = new_config.watcher.interval_ms,
            probe_port = new_config.probe.port,
            probe_timeout_ms = new_config.probe.timeout_ms,
            "Configuration reloaded"
        );
        live.store(Arc::new(new_config));
    }
}
