//! Orchestra - coordination of steps, tasks, loops, and protocols

use std::collections::HashMap;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, mpsc};

use rondo_core::{LoopId, ProtocolId, RondoError, RondoResult, Step, TaskId};

use crate::{spawn_loop, EventLoop, ProtocolSpec, ScheduledTask, Scheduler};

/// Capacity of the lossy step feed; lagging subscribers lose the oldest
/// step values rather than stalling the tick.
const STEP_FEED_CAPACITY: usize = 64;

struct LoopEntry {
    definition: EventLoop,
    stop: Option<mpsc::Sender<()>>,
}

/// Coordinates the 12-step round: advances the step counter, fires due
/// scheduled tasks, drives event loops, and hosts the protocol registry.
///
/// The orchestra has no clock of its own; the owning shell calls
/// `advance_step` at the configured cadence.
pub struct Orchestra {
    scheduler: Scheduler,
    // Lock order: `running` before `loops`, never the reverse
    running: Mutex<bool>,
    loops: Mutex<HashMap<LoopId, LoopEntry>>,
    protocols: RwLock<HashMap<ProtocolId, ProtocolSpec>>,
    step: RwLock<Step>,
    step_feed: broadcast::Sender<Step>,
}

impl Orchestra {
    pub fn new() -> Self {
        let (step_feed, _) = broadcast::channel(STEP_FEED_CAPACITY);
        Orchestra {
            scheduler: Scheduler::new(),
            running: Mutex::new(false),
            loops: Mutex::new(HashMap::new()),
            protocols: RwLock::new(HashMap::new()),
            step: RwLock::new(Step::ZERO),
            step_feed,
        }
    }

    /// Start the orchestra and every queued event loop.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> RondoResult<()> {
        let mut running = self.running.lock();
        if *running {
            return Err(RondoError::AlreadyRunning {
                component: "orchestra",
            });
        }
        *running = true;

        let mut loops = self.loops.lock();
        for entry in loops.values_mut() {
            if entry.stop.is_none() {
                entry.stop = Some(spawn_loop(entry.definition.clone()));
            }
        }
        Ok(())
    }

    /// Stop the orchestra and signal every running event loop.
    pub fn stop(&self) -> RondoResult<()> {
        let mut running = self.running.lock();
        if !*running {
            return Err(RondoError::NotRunning {
                component: "orchestra",
            });
        }
        *running = false;

        let mut loops = self.loops.lock();
        for entry in loops.values_mut() {
            if let Some(stop) = entry.stop.take() {
                let _ = stop.try_send(());
            }
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        *self.running.lock()
    }

    /// Advance to the next step, publish it, and fire every task bound to
    /// it. Callbacks run as spawned tasks in descending priority order;
    /// a failing callback is logged and never aborts the tick.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn advance_step(&self) -> Step {
        let step = {
            let mut current = self.step.write();
            let (next, _) = current.next();
            *current = next;
            next
        };

        // Lossy notification; no subscribers is fine
        let _ = self.step_feed.send(step);

        for task in self.scheduler.tasks_for_step(step) {
            let callback = task.callback.clone();
            let task_id = task.id.clone();
            tokio::spawn(async move {
                if let Err(e) = callback() {
                    tracing::warn!(task_id = %task_id, error = %e, "scheduled task failed");
                }
            });
        }

        step
    }

    pub fn current_step(&self) -> Step {
        *self.step.read()
    }

    /// Subscribe to step changes. The feed is bounded and lossy: a slow
    /// subscriber sees gaps, never backpressure on the tick.
    pub fn subscribe_steps(&self) -> broadcast::Receiver<Step> {
        self.step_feed.subscribe()
    }

    /// Register an event loop. If the orchestra is already running the
    /// loop starts immediately; otherwise it starts on `start`.
    pub fn register_event_loop(&self, definition: EventLoop) -> RondoResult<()> {
        let running = self.running.lock();
        let mut loops = self.loops.lock();
        if loops.contains_key(&definition.id) {
            return Err(RondoError::DuplicateId {
                kind: "event loop",
                id: definition.id.to_string(),
            });
        }

        let stop = if *running {
            Some(spawn_loop(definition.clone()))
        } else {
            None
        };
        loops.insert(definition.id.clone(), LoopEntry { definition, stop });
        Ok(())
    }

    /// Tear down one event loop independently of the rest.
    pub fn stop_event_loop(&self, id: &LoopId) -> RondoResult<()> {
        let mut loops = self.loops.lock();
        let entry = loops.get_mut(id).ok_or_else(|| RondoError::NotFound {
            kind: "event loop",
            id: id.to_string(),
        })?;
        if let Some(stop) = entry.stop.take() {
            let _ = stop.try_send(());
        }
        Ok(())
    }

    pub fn schedule_task(&self, task: ScheduledTask) -> RondoResult<()> {
        self.scheduler.add(task)
    }

    pub fn remove_task(&self, id: &TaskId) -> RondoResult<()> {
        self.scheduler.remove(id)
    }

    pub fn register_protocol(&self, protocol: ProtocolSpec) -> RondoResult<()> {
        let mut protocols = self.protocols.write();
        if protocols.contains_key(&protocol.id) {
            return Err(RondoError::DuplicateId {
                kind: "protocol",
                id: protocol.id.to_string(),
            });
        }
        protocols.insert(protocol.id.clone(), protocol);
        Ok(())
    }

    pub fn protocol(&self, id: &ProtocolId) -> Option<ProtocolSpec> {
        self.protocols.read().get(id).cloned()
    }
}

impl Default for Orchestra {
    fn default() -> Self {
        Orchestra::new()
    }
}
