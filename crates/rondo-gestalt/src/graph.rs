//! Process graph - cross-core structure of the gestalt

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use rondo_core::{ChannelId, CoreId, EdgeId, StateValue, Timestamp};

/// One node per registered core, overwritten on each integration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProcessNode {
    pub core_id: CoreId,
    pub state: StateValue,
    pub timestamp: Timestamp,
}

/// Explicit relational annotation between two cores. Edges are never
/// derived automatically; callers add them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProcessEdge {
    pub id: EdgeId,
    pub from: CoreId,
    pub to: CoreId,
    pub channel: ChannelId,
    pub weight: f64,
}

/// The graph of cores and their relationships.
///
/// Plain owned data: the gestalt guards it with its own lock, and a
/// `clone` is a deep copy suitable for snapshots.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProcessGraph {
    pub nodes: HashMap<CoreId, ProcessNode>,
    pub edges: HashMap<EdgeId, ProcessEdge>,
}

impl ProcessGraph {
    pub fn new() -> Self {
        ProcessGraph::default()
    }

    /// Insert or overwrite the node for a core.
    pub fn upsert_node(&mut self, node: ProcessNode) {
        self.nodes.insert(node.core_id.clone(), node);
    }

    pub fn add_edge(&mut self, edge: ProcessEdge) {
        self.edges.insert(edge.id.clone(), edge);
    }

    pub fn node(&self, core_id: &CoreId) -> Option<&ProcessNode> {
        self.nodes.get(core_id)
    }

    pub fn edge(&self, id: &EdgeId) -> Option<&ProcessEdge> {
        self.edges.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_upsert_overwrites_node() {
        let mut graph = ProcessGraph::new();
        let core = CoreId::new("c1");

        graph.upsert_node(ProcessNode {
            core_id: core.clone(),
            state: json!(1),
            timestamp: Timestamp::from_millis(1),
        });
        graph.upsert_node(ProcessNode {
            core_id: core.clone(),
            state: json!(2),
            timestamp: Timestamp::from_millis(2),
        });

        assert_eq!(graph.len(), 1);
        assert_eq!(graph.node(&core).unwrap().state, json!(2));
    }

    #[test]
    fn test_edges_are_explicit() {
        let mut graph = ProcessGraph::new();
        graph.upsert_node(ProcessNode {
            core_id: CoreId::new("a"),
            state: json!(null),
            timestamp: Timestamp::ZERO,
        });
        graph.upsert_node(ProcessNode {
            core_id: CoreId::new("b"),
            state: json!(null),
            timestamp: Timestamp::ZERO,
        });

        // Nodes alone never imply edges
        assert!(graph.edges.is_empty());

        graph.add_edge(ProcessEdge {
            id: EdgeId::new("a->b"),
            from: CoreId::new("a"),
            to: CoreId::new("b"),
            channel: ChannelId::new("ch1"),
            weight: 0.8,
        });
        assert_eq!(graph.edge(&EdgeId::new("a->b")).unwrap().weight, 0.8);
    }
}
