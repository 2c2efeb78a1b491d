//! Telemetry collector and observer registry

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use rondo_core::{CoreId, RondoError, RondoResult, TelemetryObservation};

/// Sampler supplied by a core: must be non-blocking and side-effect-free
/// so it never stalls the sampling tick.
pub type SamplerFn = Arc<dyn Fn() -> TelemetryObservation + Send + Sync>;

/// Binds a core to its sampler.
#[derive(Clone)]
pub struct Observer {
    pub id: String,
    pub core_id: CoreId,
    pub sampler: SamplerFn,
}

impl Observer {
    pub fn new(
        id: impl Into<String>,
        core_id: impl Into<CoreId>,
        sampler: impl Fn() -> TelemetryObservation + Send + Sync + 'static,
    ) -> Self {
        Observer {
            id: id.into(),
            core_id: core_id.into(),
            sampler: Arc::new(sampler),
        }
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("id", &self.id)
            .field("core_id", &self.core_id)
            .finish_non_exhaustive()
    }
}

/// Polls every registered sampler on a fixed period and buffers the
/// observations for the shell to drain each tick.
pub struct TelemetryCollector {
    observers: Arc<RwLock<HashMap<String, Observer>>>,
    queue_tx: mpsc::Sender<TelemetryObservation>,
    queue_rx: Mutex<mpsc::Receiver<TelemetryObservation>>,
    sampling_rate: Duration,
    buffer_size: usize,
    running: Mutex<Option<mpsc::Sender<()>>>,
}

impl TelemetryCollector {
    pub fn new(sampling_rate: Duration, buffer_size: usize) -> Self {
        let (queue_tx, queue_rx) = mpsc::channel(buffer_size);
        TelemetryCollector {
            observers: Arc::new(RwLock::new(HashMap::new())),
            queue_tx,
            queue_rx: Mutex::new(queue_rx),
            sampling_rate,
            buffer_size,
            running: Mutex::new(None),
        }
    }

    /// Start the sampling loop.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> RondoResult<()> {
        let mut running = self.running.lock();
        if running.is_some() {
            return Err(RondoError::AlreadyRunning {
                component: "telemetry collector",
            });
        }

        let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);
        let observers = Arc::clone(&self.observers);
        let queue = self.queue_tx.clone();
        let rate = self.sampling_rate;

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + rate, rate);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = stop_rx.recv() => break,
                    _ = ticker.tick() => sample_observers(&observers, &queue),
                }
            }
            tracing::debug!("telemetry sampling loop stopped");
        });

        *running = Some(stop_tx);
        Ok(())
    }

    /// Stop the sampling loop.
    pub fn stop(&self) -> RondoResult<()> {
        let mut running = self.running.lock();
        let stop = running.take().ok_or(RondoError::NotRunning {
            component: "telemetry collector",
        })?;
        let _ = stop.try_send(());
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Register an observer; duplicate observer ids are rejected and the
    /// registry is unchanged.
    pub fn register_observer(&self, observer: Observer) -> RondoResult<()> {
        let mut observers = self.observers.write();
        if observers.contains_key(&observer.id) {
            return Err(RondoError::DuplicateId {
                kind: "observer",
                id: observer.id.clone(),
            });
        }
        observers.insert(observer.id.clone(), observer);
        Ok(())
    }

    /// Poll every sampler once, pushing each observation into the bounded
    /// queue. Observations that do not fit are dropped silently.
    pub fn sample(&self) {
        sample_observers(&self.observers, &self.queue_tx);
    }

    /// Drain pending observations without blocking. Returns whatever is
    /// present — possibly nothing — and at most `buffer_size` entries per
    /// call.
    pub fn collect_all(&self) -> Vec<TelemetryObservation> {
        let mut queue = self.queue_rx.lock();
        let mut observations = Vec::new();
        while observations.len() < self.buffer_size {
            match queue.try_recv() {
                Ok(obs) => observations.push(obs),
                Err(_) => break,
            }
        }
        observations
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }
}

fn sample_observers(
    observers: &RwLock<HashMap<String, Observer>>,
    queue: &mpsc::Sender<TelemetryObservation>,
) {
    // Snapshot samplers so no registry lock is held while sampling
    let samplers: Vec<SamplerFn> = observers.read().values().map(|o| o.sampler.clone()).collect();

    for sampler in samplers {
        let observation = sampler();
        if let Err(TrySendError::Full(obs)) = queue.try_send(observation) {
            tracing::trace!(core_id = %obs.core_id, "telemetry queue full, observation dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;

    fn observer(id: &str) -> Observer {
        let core = CoreId::new(id);
        Observer::new(format!("observer-{id}"), core.clone(), move || {
            TelemetryObservation::new(core.clone(), json!("alive"))
        })
    }

    #[test]
    fn test_duplicate_observer_rejected() {
        let collector = TelemetryCollector::new(Duration::from_millis(50), 10);
        collector.register_observer(observer("c1")).unwrap();

        let err = collector.register_observer(observer("c1")).unwrap_err();
        assert!(matches!(err, RondoError::DuplicateId { kind: "observer", .. }));
        assert_eq!(collector.observer_count(), 1);
    }

    #[test]
    fn test_collect_all_caps_at_buffer_size() {
        // Five observers, room for two observations
        let collector = TelemetryCollector::new(Duration::from_millis(50), 2);
        for i in 0..5 {
            collector.register_observer(observer(&format!("c{i}"))).unwrap();
        }

        collector.sample();
        let drained = collector.collect_all();
        assert!(drained.len() <= 2, "drained {} observations", drained.len());

        // Channel is drained and usable again
        collector.sample();
        assert!(!collector.collect_all().is_empty());
    }

    #[test]
    fn test_collect_all_empty_when_idle() {
        let collector = TelemetryCollector::new(Duration::from_millis(50), 4);
        assert!(collector.collect_all().is_empty());
    }

    #[tokio::test]
    async fn test_sampling_loop_lifecycle() {
        let collector = TelemetryCollector::new(Duration::from_millis(5), 100);
        collector.register_observer(observer("c1")).unwrap();

        collector.start().unwrap();
        assert!(matches!(
            collector.start(),
            Err(RondoError::AlreadyRunning { .. })
        ));

        tokio::time::sleep(Duration::from_millis(40)).await;
        collector.stop().unwrap();
        assert!(matches!(collector.stop(), Err(RondoError::NotRunning { .. })));

        let drained = collector.collect_all();
        assert!(drained.len() >= 2, "sampled {} observations", drained.len());
        assert!(drained.iter().all(|o| o.core_id == CoreId::new("c1")));
    }
}
