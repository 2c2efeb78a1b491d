//! Per-step task scheduler

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use rondo_core::{CoreId, RondoError, RondoResult, Step, TaskId};

/// Callback fired when a scheduled task's step comes around.
pub type TaskCallback = Arc<dyn Fn() -> RondoResult<()> + Send + Sync>;

/// A task bound to exactly one step value; it fires every cycle at that
/// step.
#[derive(Clone)]
pub struct ScheduledTask {
    pub id: TaskId,
    pub core_id: CoreId,
    pub step: Step,
    pub priority: i32,
    pub callback: TaskCallback,
}

impl ScheduledTask {
    pub fn new(
        id: impl Into<TaskId>,
        core_id: impl Into<CoreId>,
        step: Step,
        priority: i32,
        callback: impl Fn() -> RondoResult<()> + Send + Sync + 'static,
    ) -> Self {
        ScheduledTask {
            id: id.into(),
            core_id: core_id.into(),
            step,
            priority,
            callback: Arc::new(callback),
        }
    }
}

impl fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("id", &self.id)
            .field("core_id", &self.core_id)
            .field("step", &self.step)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// The orchestra's task list.
#[derive(Default)]
pub struct Scheduler {
    tasks: RwLock<Vec<ScheduledTask>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler::default()
    }

    /// Add a task; duplicate ids are rejected and the list is unchanged.
    pub fn add(&self, task: ScheduledTask) -> RondoResult<()> {
        let mut tasks = self.tasks.write();
        if tasks.iter().any(|t| t.id == task.id) {
            return Err(RondoError::DuplicateId {
                kind: "task",
                id: task.id.to_string(),
            });
        }
        tasks.push(task);
        Ok(())
    }

    pub fn remove(&self, id: &TaskId) -> RondoResult<()> {
        let mut tasks = self.tasks.write();
        let position = tasks.iter().position(|t| &t.id == id);
        match position {
            Some(index) => {
                tasks.remove(index);
                Ok(())
            }
            None => Err(RondoError::NotFound {
                kind: "task",
                id: id.to_string(),
            }),
        }
    }

    /// Tasks bound to a step, in descending priority order.
    pub fn tasks_for_step(&self, step: Step) -> Vec<ScheduledTask> {
        let mut due: Vec<ScheduledTask> = self
            .tasks
            .read()
            .iter()
            .filter(|t| t.step == step)
            .cloned()
            .collect();
        due.sort_by(|a, b| b.priority.cmp(&a.priority));
        due
    }

    pub fn len(&self) -> usize {
        self.tasks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.read().is_empty()
    }
}
