//! petgraph-based directed graph wrapper for the workflow snapshot.

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

use super::types::{BranchLabel, Workflow, WorkflowEdge, WorkflowNode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeLabel {
    pub id: String,
    pub branch_label: Option<BranchLabel>,
    pub output_slot: Option<String>,
}

impl From<&WorkflowEdge> for EdgeLabel {
    fn from(edge: &WorkflowEdge) -> Self {
        EdgeLabel {
            id: edge.id.clone(),
            branch_label: edge.branch_label,
            output_slot: edge.output_slot.clone(),
        }
    }
}

/// Adjacency view over a [`Workflow`]. Node weights are node ids, edge
/// weights carry the edge id and its branch label / output slot.
///
/// Edges naming an unknown endpoint are left out of the graph; the validator
/// reports them separately. When node ids repeat, the first one wins.
#[derive(Debug, Clone)]
pub struct WorkflowGraph {
    pub graph: DiGraph<String, EdgeLabel>,
    pub node_indices: HashMap<String, NodeIndex>,
}

/// One outgoing or incoming edge, resolved to the node on the other end.
#[derive(Debug, Clone, Copy)]
pub struct Adjacent<'a> {
    pub node_id: &'a str,
    pub edge: &'a EdgeLabel,
    pub index: EdgeIndex,
}

impl WorkflowGraph {
    pub fn build(workflow: &Workflow) -> Self {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();

        for node in &workflow.nodes {
            let id = node.id().to_string();
            if node_indices.contains_key(&id) {
                continue;
            }
            let idx = graph.add_node(id.clone());
            node_indices.insert(id, idx);
        }

        for edge in &workflow.edges {
            let source = node_indices.get(&edge.source_node_id);
            let target = node_indices.get(&edge.target_node_id);
            if let (Some(&s), Some(&t)) = (source, target) {
                graph.add_edge(s, t, EdgeLabel::from(edge));
            }
        }

        WorkflowGraph {
            graph,
            node_indices,
        }
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.node_indices.contains_key(node_id)
    }

    pub fn index_of(&self, node_id: &str) -> Option<NodeIndex> {
        self.node_indices.get(node_id).copied()
    }

    pub fn id_of(&self, idx: NodeIndex) -> &str {
        self.graph[idx].as_str()
    }

    /// Outgoing edges in insertion order.
    pub fn successors(&self, node_id: &str) -> Vec<Adjacent<'_>> {
        self.adjacent(node_id, Direction::Outgoing)
    }

    /// Incoming edges in insertion order.
    pub fn predecessors(&self, node_id: &str) -> Vec<Adjacent<'_>> {
        self.adjacent(node_id, Direction::Incoming)
    }

    pub fn incoming_count(&self, node_id: &str) -> usize {
        self.predecessors(node_id).len()
    }

    pub fn outgoing_count(&self, node_id: &str) -> usize {
        self.successors(node_id).len()
    }

    /// The first edge id connecting two nodes, if any.
    pub fn edge_between(&self, from: NodeIndex, to: NodeIndex) -> Option<&str> {
        self.graph
            .edges_connecting(from, to)
            .map(|e| (e.id(), e.weight()))
            .min_by_key(|(idx, _)| *idx)
            .map(|(_, w)| w.id.as_str())
    }

    fn adjacent(&self, node_id: &str, dir: Direction) -> Vec<Adjacent<'_>> {
        let Some(idx) = self.index_of(node_id) else {
            return vec![];
        };
        // petgraph walks adjacency lists newest-first; sort back to insertion order.
        let mut edges: Vec<(EdgeIndex, NodeIndex, &EdgeLabel)> = self
            .graph
            .edges_directed(idx, dir)
            .map(|e| {
                let other = match dir {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                (e.id(), other, e.weight())
            })
            .collect();
        edges.sort_by_key(|(edge_idx, _, _)| *edge_idx);
        edges
            .into_iter()
            .map(|(index, other, edge)| Adjacent {
                node_id: self.graph[other].as_str(),
                edge,
                index,
            })
            .collect()
    }
}

/// Lookup table from node id to node, first occurrence wins.
pub fn node_map(workflow: &Workflow) -> HashMap<&str, &WorkflowNode> {
    let mut map = HashMap::new();
    for node in &workflow.nodes {
        map.entry(node.id()).or_insert(node);
    }
    map
}
