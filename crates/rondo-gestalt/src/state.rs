//! Gestalt state - integration, snapshots, and broadcast values

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use rondo_core::{CoreId, StateValue, TelemetryObservation, Timestamp};

use crate::{ProcessEdge, ProcessGraph, ProcessNode, StateHistory};

/// Immutable deep copy of the gestalt at one instant.
///
/// Fully owned: mutating a snapshot never touches the live gestalt, and
/// holding one grants no access back into the shell.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GestaltSnapshot {
    pub timestamp: Timestamp,
    pub state: HashMap<String, StateValue>,
    pub graph: ProcessGraph,
}

/// The value delivered to every core at a synchronization point. All
/// recipients of one broadcast share the same snapshot.
#[derive(Clone, Debug)]
pub struct GestaltBroadcast {
    pub timestamp: Timestamp,
    pub snapshot: Arc<GestaltSnapshot>,
}

/// The integrated composite state of all cores.
///
/// The global map and the process graph are guarded by separate locks; an
/// `integrate` call is two locked updates, not one atomic transaction
/// across both structures.
pub struct GestaltState {
    global: RwLock<HashMap<String, StateValue>>,
    graph: RwLock<ProcessGraph>,
    history: StateHistory,
    current: RwLock<Timestamp>,
}

impl GestaltState {
    pub fn new(max_history_size: usize) -> Self {
        GestaltState {
            global: RwLock::new(HashMap::new()),
            graph: RwLock::new(ProcessGraph::new()),
            history: StateHistory::new(max_history_size),
            current: RwLock::new(Timestamp::now()),
        }
    }

    /// Fold a batch of observations into the gestalt.
    ///
    /// Each observation overwrites the core's entry in the global map
    /// (keyed by core id, and by `core_id.metric` for each metric) and
    /// its node in the process graph. Last write wins per core.
    pub fn integrate(&self, observations: &[TelemetryObservation]) {
        *self.current.write() = Timestamp::now();

        {
            let mut global = self.global.write();
            for obs in observations {
                global.insert(obs.core_id.to_string(), obs.state.clone());
                for (key, value) in &obs.metrics {
                    global.insert(format!("{}.{}", obs.core_id, key), value.clone());
                }
            }
        }

        {
            let mut graph = self.graph.write();
            for obs in observations {
                graph.upsert_node(ProcessNode {
                    core_id: obs.core_id.clone(),
                    state: obs.state.clone(),
                    timestamp: obs.timestamp,
                });
            }
        }
    }

    /// Deep-copy the current state and graph, record the snapshot in the
    /// bounded history, and return it.
    pub fn snapshot(&self) -> GestaltSnapshot {
        let snapshot = GestaltSnapshot {
            timestamp: *self.current.read(),
            state: self.global.read().clone(),
            graph: self.graph.read().clone(),
        };
        self.history.push(snapshot.clone());
        snapshot
    }

    /// Copy of the flat global state map.
    pub fn global_state(&self) -> HashMap<String, StateValue> {
        self.global.read().clone()
    }

    /// Copy of one core's graph node, if it has been integrated.
    pub fn node(&self, core_id: &CoreId) -> Option<ProcessNode> {
        self.graph.read().node(core_id).cloned()
    }

    /// Add an explicit relational edge between two cores.
    pub fn add_edge(&self, edge: ProcessEdge) {
        self.graph.write().add_edge(edge);
    }

    pub fn history(&self) -> &StateHistory {
        &self.history
    }

    /// Timestamp of the most recent integration.
    pub fn timestamp(&self) -> Timestamp {
        *self.current.read()
    }
}
