//! The telemetry shell - top-level owner and tick loop

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::time::{interval_at, MissedTickBehavior};

use rondo_core::{
    ChannelId, CoreId, PipeId, ProtocolId, RondoError, RondoResult, Step, TaskId, Timestamp,
};
use rondo_gestalt::{GestaltBroadcast, GestaltState};
use rondo_mesh::{Channel, LocalCore, Pipe};
use rondo_orchestra::{EventLoop, Orchestra, ProtocolSpec, ScheduledTask};
use rondo_telemetry::{Observer, TelemetryCollector};

use crate::{CoordinateSystem, ShellConfig};

/// The substrate's top-level owner: wires the orchestra, collector, and
/// gestalt together, hosts the core/channel/pipe registries, and drives
/// the fixed-cadence tick loop.
pub struct TelemetryShell {
    config: ShellConfig,
    coordinates: CoordinateSystem,
    gestalt: Arc<GestaltState>,
    orchestra: Arc<Orchestra>,
    telemetry: Arc<TelemetryCollector>,
    cores: Arc<RwLock<HashMap<CoreId, Arc<LocalCore>>>>,
    channels: RwLock<HashMap<ChannelId, Arc<Channel>>>,
    pipes: RwLock<HashMap<PipeId, Arc<Pipe>>>,
    cycle_count: Arc<AtomicU64>,
    started_at: Mutex<Option<Instant>>,
    running: Mutex<Option<mpsc::Sender<()>>>,
}

impl TelemetryShell {
    pub fn new(config: ShellConfig) -> Self {
        let telemetry = TelemetryCollector::new(config.telemetry_rate, config.buffer_size);
        let gestalt = GestaltState::new(config.max_history_size);
        TelemetryShell {
            coordinates: CoordinateSystem::new(),
            gestalt: Arc::new(gestalt),
            orchestra: Arc::new(Orchestra::new()),
            telemetry: Arc::new(telemetry),
            cores: Arc::new(RwLock::new(HashMap::new())),
            channels: RwLock::new(HashMap::new()),
            pipes: RwLock::new(HashMap::new()),
            cycle_count: Arc::new(AtomicU64::new(0)),
            started_at: Mutex::new(None),
            running: Mutex::new(None),
            config,
        }
    }

    /// Start the collector, the orchestra, and the shell's own tick loop.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> RondoResult<()> {
        let mut running = self.running.lock();
        if running.is_some() {
            return Err(RondoError::AlreadyRunning {
                component: "telemetry shell",
            });
        }

        self.telemetry.start()?;
        if let Err(e) = self.orchestra.start() {
            let _ = self.telemetry.stop();
            return Err(e);
        }

        let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);
        let orchestra = Arc::clone(&self.orchestra);
        let telemetry = Arc::clone(&self.telemetry);
        let gestalt = Arc::clone(&self.gestalt);
        let cores = Arc::clone(&self.cores);
        let cycle_count = Arc::clone(&self.cycle_count);
        let step_duration = self.config.step_duration;

        tokio::spawn(async move {
            let mut ticker =
                interval_at(tokio::time::Instant::now() + step_duration, step_duration);
            // A delayed tick is skipped, never replayed: one step per
            // elapsed period, Go-ticker style
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = stop_rx.recv() => break,
                    _ = ticker.tick() => {
                        // Cores registered after this point join at the
                        // next tick; no retroactive snapshot delivery
                        let eligible: Vec<Arc<LocalCore>> =
                            cores.read().values().cloned().collect();

                        let step = orchestra.advance_step();
                        let observations = telemetry.collect_all();
                        gestalt.integrate(&observations);

                        if step.is_synchronization_point() {
                            broadcast_to(&gestalt, &eligible);
                        }
                        if step == Step::ZERO {
                            cycle_count.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            }
            tracing::debug!("telemetry shell tick loop stopped");
        });

        *self.started_at.lock() = Some(Instant::now());
        *running = Some(stop_tx);
        Ok(())
    }

    /// Signal the tick loop to halt, then stop the orchestra and the
    /// collector.
    pub fn stop(&self) -> RondoResult<()> {
        let mut running = self.running.lock();
        let stop = running.take().ok_or(RondoError::NotRunning {
            component: "telemetry shell",
        })?;
        let _ = stop.try_send(());

        self.orchestra.stop()?;
        self.telemetry.stop()?;
        *self.started_at.lock() = None;
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Register a core: derive its execution context, bind its sampler as
    /// a telemetry observer, and add it to the registry. Duplicate ids
    /// are rejected with nothing mutated.
    pub fn register_core(&self, core: Arc<LocalCore>) -> RondoResult<()> {
        let mut cores = self.cores.write();
        if cores.contains_key(&core.id) {
            return Err(RondoError::DuplicateId {
                kind: "core",
                id: core.id.to_string(),
            });
        }

        core.set_context(self.coordinates.derive_context(&core.id));

        let sampled = Arc::clone(&core);
        let observer = Observer::new(format!("observer-{}", core.id), core.id.clone(), move || {
            sampled.telemetry()
        });
        self.telemetry.register_observer(observer)?;

        cores.insert(core.id.clone(), core);
        Ok(())
    }

    pub fn register_channel(&self, channel: Arc<Channel>) -> RondoResult<()> {
        let mut channels = self.channels.write();
        if channels.contains_key(&channel.id) {
            return Err(RondoError::DuplicateId {
                kind: "channel",
                id: channel.id.to_string(),
            });
        }
        channels.insert(channel.id.clone(), channel);
        Ok(())
    }

    pub fn register_pipe(&self, pipe: Arc<Pipe>) -> RondoResult<()> {
        let mut pipes = self.pipes.write();
        if pipes.contains_key(&pipe.id) {
            return Err(RondoError::DuplicateId {
                kind: "pipe",
                id: pipe.id.to_string(),
            });
        }
        pipes.insert(pipe.id.clone(), pipe);
        Ok(())
    }

    pub fn register_event_loop(&self, event_loop: EventLoop) -> RondoResult<()> {
        self.orchestra.register_event_loop(event_loop)
    }

    pub fn register_protocol(&self, protocol: ProtocolSpec) -> RondoResult<()> {
        self.orchestra.register_protocol(protocol)
    }

    pub fn schedule_task(&self, task: ScheduledTask) -> RondoResult<()> {
        self.orchestra.schedule_task(task)
    }

    pub fn remove_task(&self, id: &TaskId) -> RondoResult<()> {
        self.orchestra.remove_task(id)
    }

    /// Manually drain the collector and fold the result into the gestalt,
    /// outside the tick loop.
    pub fn update_gestalt(&self) {
        let observations = self.telemetry.collect_all();
        self.gestalt.integrate(&observations);
    }

    /// Snapshot the gestalt once and deliver it to every currently
    /// registered core. Fire-and-forget: the shell does not wait for
    /// cores to act on it.
    pub fn broadcast_gestalt(&self) {
        let cores: Vec<Arc<LocalCore>> = self.cores.read().values().cloned().collect();
        broadcast_to(&self.gestalt, &cores);
    }

    pub fn core(&self, id: &CoreId) -> Option<Arc<LocalCore>> {
        self.cores.read().get(id).cloned()
    }

    pub fn channel(&self, id: &ChannelId) -> Option<Arc<Channel>> {
        self.channels.read().get(id).cloned()
    }

    pub fn pipe(&self, id: &PipeId) -> Option<Arc<Pipe>> {
        self.pipes.read().get(id).cloned()
    }

    pub fn protocol(&self, id: &ProtocolId) -> Option<ProtocolSpec> {
        self.orchestra.protocol(id)
    }

    pub fn gestalt(&self) -> Arc<GestaltState> {
        Arc::clone(&self.gestalt)
    }

    pub fn orchestra(&self) -> Arc<Orchestra> {
        Arc::clone(&self.orchestra)
    }

    pub fn telemetry(&self) -> Arc<TelemetryCollector> {
        Arc::clone(&self.telemetry)
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// Completed cycles since start.
    pub fn cycle_count(&self) -> u64 {
        self.cycle_count.load(Ordering::Relaxed)
    }

    pub fn current_step(&self) -> Step {
        self.orchestra.current_step()
    }

    /// Time since start; zero while stopped.
    pub fn uptime(&self) -> Duration {
        match *self.started_at.lock() {
            Some(started) => started.elapsed(),
            None => Duration::ZERO,
        }
    }
}

/// Deliver one shared snapshot to a set of cores.
fn broadcast_to(gestalt: &GestaltState, cores: &[Arc<LocalCore>]) {
    let snapshot = Arc::new(gestalt.snapshot());
    let broadcast = GestaltBroadcast {
        timestamp: Timestamp::now(),
        snapshot,
    };
    for core in cores {
        core.receive_gestalt(&broadcast);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use rondo_core::TelemetryObservation;
    use rondo_mesh::CoreKind;

    use super::*;

    fn shell() -> TelemetryShell {
        TelemetryShell::new(ShellConfig::default())
    }

    fn core(id: &str) -> Arc<LocalCore> {
        Arc::new(LocalCore::new(id, id, CoreKind::Worker))
    }

    #[tokio::test]
    async fn test_lifecycle_guards() {
        let shell = shell();
        assert!(matches!(shell.stop(), Err(RondoError::NotRunning { .. })));

        shell.start().unwrap();
        assert!(matches!(
            shell.start(),
            Err(RondoError::AlreadyRunning { .. })
        ));
        assert!(shell.is_running());

        shell.stop().unwrap();
        assert!(matches!(shell.stop(), Err(RondoError::NotRunning { .. })));
        assert_eq!(shell.uptime(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_duplicate_core_rejected() {
        let shell = shell();
        shell.register_core(core("c1")).unwrap();

        let err = shell.register_core(core("c1")).unwrap_err();
        assert!(matches!(err, RondoError::DuplicateId { kind: "core", .. }));
        assert!(shell.core(&CoreId::new("c1")).is_some());
    }

    #[tokio::test]
    async fn test_registration_derives_context() {
        let shell = shell();
        let c = core("c1");
        shell.register_core(Arc::clone(&c)).unwrap();

        let context = c.context();
        assert_eq!(context.frame, "core-c1");
        assert!(!context.coordinates.is_empty());
    }

    #[test]
    fn test_channel_and_pipe_registries() {
        let shell = shell();
        let ch = Arc::new(Channel::new("ch1", "link", "a", "b", 8));
        shell.register_channel(Arc::clone(&ch)).unwrap();
        assert!(matches!(
            shell.register_channel(ch),
            Err(RondoError::DuplicateId { kind: "channel", .. })
        ));

        let p = Arc::new(Pipe::new(
            "p1",
            "stream",
            "a",
            "b",
            rondo_mesh::PipeDirection::Outbound,
            8,
        ));
        shell.register_pipe(Arc::clone(&p)).unwrap();
        assert!(matches!(
            shell.register_pipe(p),
            Err(RondoError::DuplicateId { kind: "pipe", .. })
        ));
    }

    #[tokio::test]
    async fn test_manual_update_and_broadcast() {
        let shell = shell();
        let c = core("c1");
        shell.register_core(Arc::clone(&c)).unwrap();

        // Sample outside the loop, then integrate and broadcast manually
        shell.telemetry().sample();
        shell.update_gestalt();
        shell.broadcast_gestalt();

        let snapshot = c.context().gestalt.expect("core received a snapshot");
        assert!(snapshot.state.contains_key("c1"));
        assert_eq!(shell.gestalt().history().len(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_shares_one_snapshot() {
        let shell = shell();
        let cores: Vec<_> = (0..3).map(|i| core(&format!("c{i}"))).collect();
        for c in &cores {
            shell.register_core(Arc::clone(c)).unwrap();
        }

        shell
            .gestalt()
            .integrate(&[TelemetryObservation::new(CoreId::new("c0"), json!(1))]);
        shell.broadcast_gestalt();

        let first = cores[0].context().gestalt.unwrap();
        for c in &cores[1..] {
            let held = c.context().gestalt.unwrap();
            assert!(Arc::ptr_eq(&first, &held));
        }
    }
}
