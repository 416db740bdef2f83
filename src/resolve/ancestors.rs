//! Upstream node discovery for `{{nodeId.field}}` suggestions and checks.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::parse::graph::{WorkflowGraph, node_map};
use crate::parse::types::{NodeKind, Workflow, WorkflowNode};

/// Reference name of the program's entry value.
pub const INPUT_REF: &str = "input";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AncestorInfo {
    pub node_id: String,
    pub label: String,
    /// `None` for the synthetic entry-value row.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<NodeKind>,
    pub fields: Vec<String>,
}

impl AncestorInfo {
    fn from_node(node: &WorkflowNode) -> Self {
        AncestorInfo {
            node_id: node.id().to_string(),
            label: node.label().to_string(),
            kind: Some(node.kind()),
            fields: node.referenceable_fields(),
        }
    }

    fn input() -> Self {
        AncestorInfo {
            node_id: INPUT_REF.to_string(),
            label: "Workflow input".to_string(),
            kind: None,
            fields: vec![],
        }
    }

    pub fn is_input(&self) -> bool {
        self.kind.is_none() && self.node_id == INPUT_REF
    }
}

/// Every node upstream of `node_id`, closest first, followed by the
/// synthetic `input` entry.
///
/// Standalone entry point for the node configuration UI: builds its own
/// adjacency and needs no validation pass.
pub fn ancestors_of(workflow: &Workflow, node_id: &str) -> Vec<AncestorInfo> {
    let graph = WorkflowGraph::build(workflow);
    let nodes = node_map(workflow);
    ancestors_in(&graph, &nodes, node_id)
}

/// Breadth-first walk over incoming edges.
///
/// A node is marked visited when it is dequeued and visited nodes are never
/// enqueued again, so feedback loop cycles are walked once and the cost stays
/// O(V + E). Ties at equal distance follow edge insertion order.
pub fn ancestors_in(
    graph: &WorkflowGraph,
    nodes: &HashMap<&str, &WorkflowNode>,
    node_id: &str,
) -> Vec<AncestorInfo> {
    let mut result = Vec::new();

    if let Some(start) = graph.index_of(node_id) {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([start]);

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            let current_id = graph.id_of(current);
            if current != start {
                if let Some(node) = nodes.get(current_id) {
                    result.push(AncestorInfo::from_node(node));
                }
            }
            for pred in graph.predecessors(current_id) {
                if let Some(idx) = graph.index_of(pred.node_id) {
                    if !visited.contains(&idx) {
                        queue.push_back(idx);
                    }
                }
            }
        }
    }

    result.push(AncestorInfo::input());
    result
}
