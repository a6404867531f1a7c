//! The self-heal tick loop.
//!
//! # Responsibilities
//! - Periodically probe the monitored service
//! - Fold the result into the persisted health state
//! - Escalate through the fix ladder, at most one fix per tick
//! - Stop escalating for good once remediation has demonstrably failed
//!
//! # Design Decisions
//! - Every tick starts from the persisted record; nothing is cached between ticks
//! - Ticks are serialized by a mutex, so timer ticks, manual ticks and
//!   manual unlocks never interleave
//! - A started tick always runs to completion, even when stop is requested
//! - The same fix twice in a row without a success in between locks the
//!   state instead of running the fix again. Only the fix name is compared,
//!   so two distinct failures that map to the same fix also lock.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use arc_swap::ArcSwap;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time;

use crate::config::MonitorConfig;
use crate::health::probe::{HealthProbe, ProbeError};
use crate::lifecycle::shutdown::{Shutdown, ShutdownListener};
use crate::observability::metrics;
use crate::recovery::RecoveryPlan;
use crate::state::types::DEGRADED_THRESHOLD;
use crate::state::{HealthState, StateStore, Status};

/// Passed to the recovery observer right before a fix runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecoveryEvent {
    pub fix: String,
    pub reason: String,
}

/// Observer invoked before each remediation.
pub type RecoveryObserver = Arc<dyn Fn(&RecoveryEvent) + Send + Sync>;

/// What a single tick did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TickOutcome {
    /// Probe reported ok.
    Healthy,
    /// Probe failed; not enough evidence to act yet.
    Failed { failures: u32 },
    /// Probe failed but the state is already locked.
    Suppressed { failures: u32 },
    /// This tick engaged the lock.
    Locked { failures: u32 },
    /// A fix was applied.
    Remediated { fix: String },
    /// A fix was attempted and its hook failed.
    FixFailed { fix: String },
}

impl TickOutcome {
    fn label(&self) -> &'static str {
        match self {
            TickOutcome::Healthy => "healthy",
            TickOutcome::Failed { .. } => "failed",
            TickOutcome::Suppressed { .. } => "suppressed",
            TickOutcome::Locked { .. } => "locked",
            TickOutcome::Remediated { .. } => "remediated",
            TickOutcome::FixFailed { .. } => "fix_failed",
        }
    }
}

struct Running {
    shutdown: Shutdown,
    handle: JoinHandle<()>,
}

/// Probes, records and escalates.
pub struct Watcher {
    config: Arc<ArcSwap<MonitorConfig>>,
    store: StateStore,
    defaults: HealthState,
    plan: RecoveryPlan,
    probe: Result<HealthProbe, ProbeError>,
    on_recovery: Option<RecoveryObserver>,
    tick_lock: tokio::sync::Mutex<()>,
    running: Mutex<Option<Running>>,
}

impl Watcher {
    /// Create a watcher over live (hot-reloadable) configuration.
    ///
    /// The state path is fixed at construction; interval and probe target are
    /// re-read every tick.
    pub fn new(config: Arc<ArcSwap<MonitorConfig>>, plan: RecoveryPlan) -> Self {
        let current = config.load();
        let store = StateStore::new(current.watcher.state_path.clone());
        let defaults = HealthState::new(plan.models().primary.clone());
        drop(current);

        // Without a client every tick counts as a failed probe.
        let probe = HealthProbe::new();
        if let Err(e) = &probe {
            tracing::error!(error = %e, "Failed to build probe client");
        }

        Self {
            config,
            store,
            defaults,
            plan,
            probe,
            on_recovery: None,
            tick_lock: tokio::sync::Mutex::new(()),
            running: Mutex::new(None),
        }
    }

    /// Create a watcher over a fixed configuration.
    pub fn from_config(config: MonitorConfig, plan: RecoveryPlan) -> Self {
        Self::new(Arc::new(ArcSwap::from_pointee(config)), plan)
    }

    /// Register the observer called with `{fix, reason}` before each fix.
    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(&RecoveryEvent) + Send + Sync + 'static,
    {
        self.on_recovery = Some(Arc::new(observer));
        self
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// State a fresh monitor starts from.
    pub fn defaults(&self) -> &HealthState {
        &self.defaults
    }

    /// Arm the timer. Does nothing if already running.
    pub fn start(self: &Arc<Self>) {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            return;
        }

        let shutdown = Shutdown::new();
        let listener = shutdown.subscribe();
        let watcher = Arc::clone(self);
        let handle = tokio::spawn(async move { watcher.run(listener).await });

        tracing::info!(
            interval_ms = self.config.load().watcher.interval_ms,
            state_path = %self.store.path().display(),
            "Watcher started"
        );
        *running = Some(Running { shutdown, handle });
    }

    /// Disarm the timer and wait for an in-flight tick. Idempotent.
    pub async fn stop(&self) {
        let running = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(running) = running else {
            return;
        };

        running.shutdown.trigger();
        if let Err(e) = running.handle.await {
            tracing::error!(error = %e, "Watcher task ended abnormally");
        }
        tracing::info!("Watcher stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    async fn run(&self, mut shutdown: ShutdownListener) {
        loop {
            // Sleeping after each tick keeps ticks from overlapping and picks
            // up interval changes from config reloads.
            let interval = self.config.load().watcher.interval();
            tokio::select! {
                _ = time::sleep(interval) => {
                    self.tick().await;
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Watcher received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Run one probe → record → escalate cycle.
    pub async fn tick(&self) -> TickOutcome {
        let _guard = self.tick_lock.lock().await;
        let config = self.config.load_full();
        let mut state = self.store.load(&self.defaults);

        let started = Instant::now();
        let result = match &self.probe {
            Ok(probe) => probe.check(&config.probe).await,
            Err(e) => Err(e.clone()),
        };
        metrics::record_probe(started.elapsed(), result.is_ok());

        let outcome = match result {
            Ok(()) => {
                if state.failures > 0 {
                    tracing::info!(previous_failures = state.failures, "Health recovered");
                }
                state.record_success();
                self.store.save(&mut state);
                TickOutcome::Healthy
            }
            Err(e) => {
                state.record_failure(e.to_string());
                tracing::warn!(
                    failures = state.failures,
                    status = %state.status,
                    error = %e,
                    "Health probe failed"
                );
                self.store.save(&mut state);
                self.escalate(&mut state).await
            }
        };

        metrics::record_tick(outcome.label());
        metrics::record_state(&state);
        outcome
    }

    async fn escalate(&self, state: &mut HealthState) -> TickOutcome {
        if state.lock {
            return TickOutcome::Suppressed {
                failures: state.failures,
            };
        }
        if state.failures < DEGRADED_THRESHOLD {
            return TickOutcome::Failed {
                failures: state.failures,
            };
        }

        let Some(action) = self.plan.decide(state) else {
            return self.engage_lock(state, "fix ladder exhausted");
        };
        let fix = action.name();
        if state.last_fix.as_deref() == Some(fix.as_str()) {
            return self.engage_lock(state, "fix already tried without recovery");
        }

        let reason = state.last_error.clone().unwrap_or_default();
        state.last_fix = Some(fix.clone());
        self.store.save(state);
        self.notify(RecoveryEvent {
            fix: fix.clone(),
            reason,
        });

        match self.plan.apply(&action, state, &self.store).await {
            Ok(()) => {
                self.store.save(state);
                metrics::record_fix(&fix, true);
                TickOutcome::Remediated { fix }
            }
            Err(e) => {
                tracing::error!(fix = %fix, error = %e, "Fix failed");
                state.last_error = Some(format!("fix_failed:{}", fix));
                state.status = Status::Critical;
                self.store.save(state);
                metrics::record_fix(&fix, false);
                TickOutcome::FixFailed { fix }
            }
        }
    }

    fn engage_lock(&self, state: &mut HealthState, why: &str) -> TickOutcome {
        state.engage_lock();
        self.store.save(state);
        tracing::error!(
            failures = state.failures,
            last_fix = ?state.last_fix,
            last_error = ?state.last_error,
            "Self-heal locked ({}); manual intervention required",
            why
        );
        TickOutcome::Locked {
            failures: state.failures,
        }
    }

    fn notify(&self, event: RecoveryEvent) {
        let Some(observer) = &self.on_recovery else {
            return;
        };
        if std::panic::catch_unwind(AssertUnwindSafe(|| observer(&event))).is_err() {
            tracing::warn!(fix = %event.fix, "Recovery observer panicked");
        }
    }

    /// Manual intervention: clear the lock and the failure streak.
    pub async fn unlock(&self) -> HealthState {
        let _guard = self.tick_lock.lock().await;
        let mut state = self.store.load(&self.defaults);
        let was_locked = state.lock;
        state.unlock();
        self.store.save(&mut state);
        metrics::record_state(&state);
        tracing::info!(was_locked, "Health state unlocked by operator");
        state
    }
}
