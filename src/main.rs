//! Self-heal daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!                ┌──────────────────────────────────────────────────────┐
//!                │                     SELF-HEAL                         │
//!                │                                                       │
//!  Monitored     │  ┌─────────┐   ┌───────────┐   ┌──────────────────┐   │
//!  service  ◀────┼──│  probe  │◀──│  watcher  │──▶│  recovery plan   │───┼──▶ restart /
//!  /health       │  └─────────┘   └─────┬─────┘   └──────────────────┘   │    cache hooks
//!                │                      │                                │
//!                │                      ▼                                │
//!                │               ┌────────────┐                          │
//!                │               │ state store│ (JSON, atomic rename)    │
//!                │               └─────┬──────┘                          │
//!                │                      │                                │
//!  Dashboards ◀──┼── GET /health ◀──────┘ reporter                       │
//!  Operators  ◀──┼── /admin/* (state, unlock, tick)                      │
//!                └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;
use clap::Parser;
use tokio::net::TcpListener;

use self_heal::config::watcher::{apply_updates, ConfigWatcher};
use self_heal::config::{load_config, MonitorConfig};
use self_heal::health::{HealthReporter, Watcher};
use self_heal::http::{AppState, HttpServer};
use self_heal::lifecycle::signals::trigger_on_signal;
use self_heal::lifecycle::Shutdown;
use self_heal::observability::{logging, metrics};
use self_heal::recovery::{ModelPair, RecoveryHooks, RecoveryPlan};

#[derive(Parser)]
#[command(name = "self-heal")]
#[command(about = "Self-heal monitor and recovery engine", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => MonitorConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!("self-heal v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        state_path = %config.watcher.state_path.display(),
        interval_ms = config.watcher.interval_ms,
        probe_port = config.probe.port,
        probe_timeout_ms = config.probe.timeout_ms,
        primary_model = %config.models.primary,
        fallback_model = %config.models.fallback,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let live = Arc::new(ArcSwap::from_pointee(config.clone()));

    // Hot reload of tick-time settings
    let _config_watcher = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            tokio::spawn(apply_updates(live.clone(), updates));
            match watcher.run() {
                Ok(w) => Some(w),
                Err(e) => {
                    tracing::error!(error = %e, "Config hot reload unavailable");
                    None
                }
            }
        }
        None => None,
    };

    let plan = RecoveryPlan::new(
        ModelPair::from(&config.models),
        RecoveryHooks::from_commands(&config.hooks),
    );
    let watcher = Arc::new(Watcher::new(live.clone(), plan).with_observer(|event| {
        tracing::warn!(fix = %event.fix, reason = %event.reason, "Self-heal remediation");
    }));
    let reporter = Arc::new(HealthReporter::new(
        watcher.store().clone(),
        watcher.defaults().clone(),
    ));

    if config.watcher.enabled {
        watcher.start();
    } else {
        tracing::info!("Watcher disabled; serving reports only");
    }

    let shutdown = Shutdown::new();
    tokio::spawn(trigger_on_signal(shutdown.clone()));

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    let server = HttpServer::new(
        &config.server,
        AppState {
            reporter,
            watcher: watcher.clone(),
            admin: config.admin.clone(),
        },
    );
    server.run(listener, shutdown.subscribe()).await?;

    watcher.stop().await;
    tracing::info!("Shutdown complete");
    Ok(())
}
