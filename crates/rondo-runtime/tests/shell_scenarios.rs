//! End-to-end scenarios for the telemetry shell: a real tick loop driving
//! step advancement, telemetry integration, and gestalt broadcast.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use serial_test::serial;

use rondo_core::{CoreId, Step};
use rondo_mesh::{CoreKind, LocalCore};
use rondo_orchestra::ScheduledTask;
use rondo_runtime::{ShellConfig, TelemetryShell};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn fast_config(step_millis: u64) -> ShellConfig {
    init_tracing();
    let mut config = ShellConfig::with_step_duration(Duration::from_millis(step_millis));
    config.telemetry_rate = Duration::from_millis(step_millis / 2 + 1);
    config
}

fn worker(id: &str) -> Arc<LocalCore> {
    Arc::new(
        LocalCore::new(id, id, CoreKind::Worker).with_processor(|_, input| Ok(input)),
    )
}

#[tokio::test]
#[serial]
async fn scenario_step_wraps_and_cycle_advances() {
    let shell = TelemetryShell::new(fast_config(10));
    shell.start().unwrap();

    // Well past one full cycle (12 steps x 10ms)
    tokio::time::sleep(Duration::from_millis(180)).await;
    shell.stop().unwrap();

    assert!(shell.cycle_count() >= 1, "cycle count {}", shell.cycle_count());
    assert!(shell.current_step().value() < 12);
}

#[tokio::test]
#[serial]
async fn scenario_step_bound_task_fires_once_per_cycle() {
    let shell = TelemetryShell::new(fast_config(10));
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);

    shell.register_core(worker("c1")).unwrap();
    shell
        .schedule_task(ScheduledTask::new("count", "c1", Step::new(5), 0, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }))
        .unwrap();

    shell.start().unwrap();
    // One full cycle and change; the step-5 slot comes around exactly once
    tokio::time::sleep(Duration::from_millis(140)).await;
    shell.stop().unwrap();

    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test]
#[serial]
async fn scenario_telemetry_buffer_caps_collection() {
    let mut config = fast_config(10);
    config.buffer_size = 2;
    let shell = TelemetryShell::new(config);

    for i in 0..5 {
        shell.register_core(worker(&format!("c{i}"))).unwrap();
    }

    // One manual sampling pass: five observations offered, room for two
    let telemetry = shell.telemetry();
    telemetry.sample();
    let drained = telemetry.collect_all();
    assert!(drained.len() <= 2, "drained {}", drained.len());
}

#[tokio::test]
#[serial]
async fn scenario_all_cores_see_the_same_broadcast() {
    let shell = TelemetryShell::new(fast_config(20));
    let cores: Vec<_> = (0..3).map(|i| worker(&format!("c{i}"))).collect();
    for core in &cores {
        shell.register_core(Arc::clone(core)).unwrap();
    }

    shell.start().unwrap();
    // Reach the first synchronization window (steps 1-4)
    tokio::time::sleep(Duration::from_millis(90)).await;
    shell.stop().unwrap();

    let snapshots: Vec<_> = cores
        .iter()
        .map(|core| core.context().gestalt.expect("core received a broadcast"))
        .collect();

    let timestamp = snapshots[0].timestamp;
    for snapshot in &snapshots[1..] {
        assert_eq!(snapshot.timestamp, timestamp);
        assert!(Arc::ptr_eq(snapshot, &snapshots[0]));
    }
}

#[tokio::test]
#[serial]
async fn scenario_running_shell_integrates_core_state() {
    let shell = TelemetryShell::new(fast_config(10));
    let core = worker("echo");
    shell.register_core(Arc::clone(&core)).unwrap();

    core.process(json!({"phase": "warm"})).unwrap();

    shell.start().unwrap();
    tokio::time::sleep(Duration::from_millis(80)).await;
    shell.stop().unwrap();

    let state = shell.gestalt().global_state();
    assert_eq!(state["echo"], json!({"phase": "warm"}));
    // Standard metrics are flattened under the core id
    assert_eq!(state["echo.kind"], json!("worker"));

    let node = shell.gestalt().node(&CoreId::new("echo")).unwrap();
    assert_eq!(node.state, json!({"phase": "warm"}));
}

#[tokio::test]
#[serial]
async fn scenario_history_accumulates_at_sync_points() {
    let shell = TelemetryShell::new(fast_config(10));
    shell.register_core(worker("c1")).unwrap();

    shell.start().unwrap();
    // Four sync broadcasts per cycle; run a bit over one cycle
    tokio::time::sleep(Duration::from_millis(150)).await;
    shell.stop().unwrap();

    let history = shell.gestalt().history().len();
    assert!(history >= 4, "history holds {history} snapshots");
    assert!(history <= shell.config().max_history_size);
}
