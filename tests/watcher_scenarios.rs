//! End-to-end watcher behavior against a programmable health endpoint.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use self_heal::health::{RecoveryEvent, TickOutcome, Watcher};
use self_heal::recovery::{HookError, ModelPair, RecoveryHooks, RecoveryPlan};
use self_heal::state::{unix_now, HealthState, StateStore, Status};

mod common;

type Reply = Arc<Mutex<(u16, String)>>;

async fn backend(status: u16, body: String) -> (std::net::SocketAddr, Reply) {
    let reply: Reply = Arc::new(Mutex::new((status, body)));
    let r = reply.clone();
    let addr = common::start_programmable_backend(move || {
        let r = r.clone();
        async move { r.lock().unwrap().clone() }
    })
    .await;
    (addr, reply)
}

fn counting_hook(counter: &Arc<AtomicU32>) -> impl Fn() -> std::future::Ready<Result<(), HookError>> + Send + Sync + 'static {
    let counter = counter.clone();
    move || {
        counter.fetch_add(1, Ordering::SeqCst);
        std::future::ready(Ok(()))
    }
}

fn plan(hooks: RecoveryHooks) -> RecoveryPlan {
    RecoveryPlan::new(ModelPair::new("openrouter", "gemini"), hooks)
}

fn load(watcher: &Watcher) -> HealthState {
    watcher.store().load(watcher.defaults())
}

#[tokio::test]
async fn test_full_escalation_ladder_ends_locked() {
    let (addr, _) = backend(200, common::health_body("degraded", Some("openrouter timeout"))).await;
    let hard = Arc::new(AtomicU32::new(0));
    let caches = Arc::new(AtomicU32::new(0));
    let events = Arc::new(Mutex::new(Vec::<RecoveryEvent>::new()));
    let ev = events.clone();

    let watcher = Watcher::from_config(
        common::test_config(addr, "ladder"),
        plan(
            RecoveryHooks::new()
                .on_hard_restart(counting_hook(&hard))
                .on_clear_caches(counting_hook(&caches)),
        ),
    )
    .with_observer(move |event| ev.lock().unwrap().push(event.clone()));

    assert_eq!(watcher.tick().await, TickOutcome::Failed { failures: 1 });
    assert_eq!(load(&watcher).status, Status::Ok);

    // Scenario A: timeout on the active provider switches models.
    assert_eq!(
        watcher.tick().await,
        TickOutcome::Remediated { fix: "switch_model_to_gemini".into() }
    );
    let state = load(&watcher);
    assert_eq!(state.status, Status::Degraded);
    assert_eq!(state.active_model, "gemini");
    assert_eq!(state.model_switches_5m, 1);

    // Still timing out: switch back, a different fix name.
    assert_eq!(
        watcher.tick().await,
        TickOutcome::Remediated { fix: "switch_model_to_openrouter".into() }
    );
    assert_eq!(load(&watcher).model_switches_5m, 2);

    assert_eq!(watcher.tick().await, TickOutcome::Remediated { fix: "clear_caches".into() });
    assert_eq!(caches.load(Ordering::SeqCst), 1);
    assert_eq!(load(&watcher).restart_count_24h, 0);

    assert_eq!(watcher.tick().await, TickOutcome::Remediated { fix: "hard_restart".into() });
    let state = load(&watcher);
    assert_eq!(state.status, Status::Critical);
    assert_eq!(state.restart_count_24h, 1);

    // Scenario D: hard restart would repeat, so lock instead.
    assert_eq!(watcher.tick().await, TickOutcome::Locked { failures: 6 });
    let state = load(&watcher);
    assert!(state.lock);
    assert_eq!(state.status, Status::Critical);
    assert_eq!(hard.load(Ordering::SeqCst), 1);

    assert_eq!(watcher.tick().await, TickOutcome::Suppressed { failures: 7 });
    assert_eq!(hard.load(Ordering::SeqCst), 1);

    let events = events.lock().unwrap();
    let fixes: Vec<_> = events.iter().map(|e| e.fix.as_str()).collect();
    assert_eq!(
        fixes,
        vec!["switch_model_to_gemini", "switch_model_to_openrouter", "clear_caches", "hard_restart"]
    );
    assert_eq!(events[0].reason, "openrouter timeout");
}

#[tokio::test]
async fn test_observer_runs_before_hook() {
    let (addr, _) = backend(200, common::health_body("critical", Some("disk full"))).await;
    let order = Arc::new(Mutex::new(Vec::<&'static str>::new()));
    let hook_order = order.clone();
    let observer_order = order.clone();

    let watcher = Watcher::from_config(
        common::test_config(addr, "observer-order"),
        plan(RecoveryHooks::new().on_graceful_restart(move || {
            hook_order.lock().unwrap().push("hook");
            std::future::ready(Ok::<(), HookError>(()))
        })),
    )
    .with_observer(move |_| observer_order.lock().unwrap().push("observer"));

    watcher.tick().await;
    assert_eq!(watcher.tick().await, TickOutcome::Remediated { fix: "graceful_restart".into() });
    assert_eq!(*order.lock().unwrap(), vec!["observer", "hook"]);
}

#[tokio::test]
async fn test_panicking_observer_does_not_stop_the_fix() {
    let (addr, _) = backend(200, common::health_body("critical", Some("disk full"))).await;
    let graceful = Arc::new(AtomicU32::new(0));
    let watcher = Watcher::from_config(
        common::test_config(addr, "observer-panic"),
        plan(RecoveryHooks::new().on_graceful_restart(counting_hook(&graceful))),
    )
    .with_observer(|event| {
        if event.fix == "graceful_restart" {
            panic!("dashboard unavailable");
        }
    });

    watcher.tick().await;
    assert_eq!(watcher.tick().await, TickOutcome::Remediated { fix: "graceful_restart".into() });
    assert_eq!(graceful.load(Ordering::SeqCst), 1);

    let state = load(&watcher);
    assert_eq!(state.last_fix.as_deref(), Some("graceful_restart"));
    assert_eq!(state.restart_count_24h, 1);
}

#[tokio::test]
async fn test_unwritable_state_path_never_escalates() {
    let (addr, _) = backend(200, common::health_body("critical", Some("disk full"))).await;
    let mut config = common::test_config(addr, "unwritable");
    let dir = config.watcher.state_path.parent().unwrap().to_path_buf();
    std::fs::create_dir_all(&dir).unwrap();
    let blocker = dir.join("blocker");
    std::fs::write(&blocker, b"not a directory").unwrap();
    config.watcher.state_path = blocker.join("sub").join("health_state.json");

    let graceful = Arc::new(AtomicU32::new(0));
    let watcher = Watcher::from_config(
        config,
        plan(RecoveryHooks::new().on_graceful_restart(counting_hook(&graceful))),
    );

    // Each tick starts over from defaults because nothing was persisted.
    for _ in 0..3 {
        assert_eq!(watcher.tick().await, TickOutcome::Failed { failures: 1 });
    }
    assert_eq!(graceful.load(Ordering::SeqCst), 0);
    assert_eq!(load(&watcher), *watcher.defaults());
}

#[tokio::test]
async fn test_same_fix_twice_locks_instead_of_rerunning() {
    let (addr, _) = backend(200, common::health_body("critical", Some("disk full"))).await;
    let graceful = Arc::new(AtomicU32::new(0));
    let watcher = Watcher::from_config(
        common::test_config(addr, "double-fix"),
        plan(RecoveryHooks::new().on_graceful_restart(counting_hook(&graceful))),
    );

    assert_eq!(watcher.tick().await, TickOutcome::Failed { failures: 1 });
    assert_eq!(watcher.tick().await, TickOutcome::Remediated { fix: "graceful_restart".into() });
    assert_eq!(watcher.tick().await, TickOutcome::Locked { failures: 3 });

    assert_eq!(graceful.load(Ordering::SeqCst), 1);
    let state = load(&watcher);
    assert!(state.lock);
    assert_eq!(state.last_fix.as_deref(), Some("graceful_restart"));
    assert_eq!(state.restart_count_24h, 1);
}

#[tokio::test]
async fn test_success_resets_failure_streak() {
    let (addr, reply) = backend(200, common::health_body("degraded", Some("disk full"))).await;
    let watcher = Watcher::from_config(common::test_config(addr, "reset"), plan(RecoveryHooks::new()));

    watcher.tick().await;
    watcher.tick().await;
    assert_eq!(load(&watcher).failures, 2);

    *reply.lock().unwrap() = (200, common::health_body("ok", None));
    assert_eq!(watcher.tick().await, TickOutcome::Healthy);

    let state = load(&watcher);
    assert_eq!(state.failures, 0);
    assert_eq!(state.last_error, None);
    assert_eq!(state.last_fix, None);
    assert_eq!(state.status, Status::Ok);

    // A new streak may use the same fix again.
    *reply.lock().unwrap() = (200, common::health_body("degraded", Some("disk full")));
    watcher.tick().await;
    assert_eq!(watcher.tick().await, TickOutcome::Remediated { fix: "graceful_restart".into() });
}

#[tokio::test]
async fn test_clear_caches_at_four_failures() {
    let (addr, _) = backend(200, common::health_body("degraded", Some("queue backlog"))).await;
    let config = common::test_config(addr, "scenario-b");
    let store = StateStore::new(config.watcher.state_path.clone());
    let mut seeded = HealthState::new("openrouter");
    seeded.failures = 3;
    seeded.last_error = Some("queue backlog".into());
    seeded.last_fix = Some("graceful_restart".into());
    store.try_save(&mut seeded).unwrap();

    let watcher = Watcher::from_config(config, plan(RecoveryHooks::new()));
    assert_eq!(watcher.tick().await, TickOutcome::Remediated { fix: "clear_caches".into() });

    let state = load(&watcher);
    assert_eq!(state.failures, 4);
    assert_eq!(state.restart_count_24h, 0);
    assert_eq!(state.last_restart, 0);
}

#[tokio::test]
async fn test_hard_restart_at_five_failures() {
    let (addr, _) = backend(503, String::new()).await;
    let config = common::test_config(addr, "scenario-c");
    let store = StateStore::new(config.watcher.state_path.clone());
    let mut seeded = HealthState::new("openrouter");
    seeded.failures = 4;
    seeded.last_fix = Some("clear_caches".into());
    store.try_save(&mut seeded).unwrap();

    let before = unix_now();
    let watcher = Watcher::from_config(config, plan(RecoveryHooks::new()));
    assert_eq!(watcher.tick().await, TickOutcome::Remediated { fix: "hard_restart".into() });

    let state = load(&watcher);
    assert_eq!(state.status, Status::Critical);
    assert_eq!(state.restart_count_24h, 1);
    assert!(state.last_restart >= before);
    assert_eq!(state.last_error.as_deref(), Some("probe returned HTTP 503"));
}

#[tokio::test]
async fn test_failing_hook_marks_critical_then_locks() {
    let (addr, _) = backend(200, common::health_body("degraded", Some("worker crashed"))).await;
    let watcher = Watcher::from_config(
        common::test_config(addr, "hook-fails"),
        plan(RecoveryHooks::new().on_graceful_restart(|| async {
            Err(HookError::new("supervisor unavailable"))
        })),
    );

    watcher.tick().await;
    assert_eq!(watcher.tick().await, TickOutcome::FixFailed { fix: "graceful_restart".into() });
    let state = load(&watcher);
    assert_eq!(state.status, Status::Critical);
    assert_eq!(state.last_error.as_deref(), Some("fix_failed:graceful_restart"));
    assert!(!state.lock);

    assert_eq!(watcher.tick().await, TickOutcome::Locked { failures: 3 });
}

#[tokio::test]
async fn test_probe_timeout_counts_as_failure() {
    let addr = common::start_programmable_backend(|| async {
        common::sleep_ms(1_000).await;
        (200, common::health_body("ok", None))
    })
    .await;
    let mut config = common::test_config(addr, "timeout");
    config.probe.timeout_ms = 100;
    let watcher = Watcher::from_config(config, plan(RecoveryHooks::new()));

    assert_eq!(watcher.tick().await, TickOutcome::Failed { failures: 1 });
    assert_eq!(load(&watcher).last_error.as_deref(), Some("probe timeout after 100ms"));

    // "timeout" in the error picks the model switch.
    assert_eq!(
        watcher.tick().await,
        TickOutcome::Remediated { fix: "switch_model_to_gemini".into() }
    );
}

#[tokio::test]
async fn test_unreachable_and_malformed_probes_fail() {
    let dead = common::dead_addr().await;
    let watcher = Watcher::from_config(common::test_config(dead, "unreachable"), plan(RecoveryHooks::new()));
    assert_eq!(watcher.tick().await, TickOutcome::Failed { failures: 1 });
    assert!(load(&watcher)
        .last_error
        .unwrap()
        .starts_with("probe unreachable"));

    let (addr, _) = backend(200, "<html>fine</html>".into()).await;
    let watcher = Watcher::from_config(common::test_config(addr, "malformed"), plan(RecoveryHooks::new()));
    assert_eq!(watcher.tick().await, TickOutcome::Failed { failures: 1 });
    assert!(load(&watcher)
        .last_error
        .unwrap()
        .starts_with("malformed health response"));
}

#[tokio::test]
async fn test_locked_state_survives_success_until_unlocked() {
    let (addr, reply) = backend(200, common::health_body("ok", None)).await;
    let config = common::test_config(addr, "unlock");
    let store = StateStore::new(config.watcher.state_path.clone());
    let mut seeded = HealthState::new("openrouter");
    seeded.failures = 6;
    seeded.last_fix = Some("hard_restart".into());
    seeded.engage_lock();
    store.try_save(&mut seeded).unwrap();

    let watcher = Watcher::from_config(config, plan(RecoveryHooks::new()));
    assert_eq!(watcher.tick().await, TickOutcome::Healthy);
    let state = load(&watcher);
    assert_eq!(state.failures, 0);
    assert!(state.lock);
    assert_eq!(state.status, Status::Critical);

    let state = watcher.unlock().await;
    assert!(!state.lock);
    assert_eq!(state.status, Status::Ok);
    assert_eq!(load(&watcher), state);

    *reply.lock().unwrap() = (200, common::health_body("degraded", Some("disk full")));
    watcher.tick().await;
    assert_eq!(watcher.tick().await, TickOutcome::Remediated { fix: "graceful_restart".into() });
}

#[tokio::test]
async fn test_start_and_stop() {
    let (addr, _) = backend(200, common::health_body("degraded", Some("disk full"))).await;
    let mut config = common::test_config(addr, "start-stop");
    config.watcher.interval_ms = 30;
    let watcher = Arc::new(Watcher::from_config(config, plan(RecoveryHooks::new())));

    assert!(!watcher.is_running());
    watcher.start();
    watcher.start();
    assert!(watcher.is_running());

    common::sleep_ms(400).await;
    watcher.stop().await;
    assert!(!watcher.is_running());

    let after_stop = load(&watcher);
    assert!(after_stop.failures >= 2);

    common::sleep_ms(150).await;
    assert_eq!(load(&watcher), after_stop);

    // Stopping twice is harmless.
    watcher.stop().await;
}
