//! Feedback loop analysis (V012–V013).
//!
//! A DFS from the trigger classifies back-edges. The cycle closed by a
//! back-edge must contain a feedback loop node, which becomes the loop head.
//! The cycle is usually entered at the head; when it is entered at a plain
//! node instead (`draft -> review(loop) -> draft`) the loop body starts at
//! that entry node and the head closes each iteration. The body is the
//! natural loop of the back-edges (every node that reaches a back-edge tail
//! without passing through the entry), minus the head.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::{DfsEvent, EdgeRef, depth_first_search};
use petgraph::Direction;

use crate::error::Diagnostic;
use crate::parse::graph::{WorkflowGraph, node_map};
use crate::parse::types::Workflow;

#[derive(Debug, Clone)]
pub struct LoopInfo {
    pub head: String,
    /// Where the cycle is first entered from the trigger. Equal to `head`
    /// unless the feedback loop node sits further round the cycle.
    pub entry: String,
    /// Nodes strictly inside the loop (head excluded).
    pub body: BTreeSet<String>,
    /// First node planned inside the `for`.
    pub body_entry: String,
    /// Ids of the edges returning to `entry`.
    pub back_edges: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LoopAnalysis {
    pub loops: HashMap<String, LoopInfo>,
    back_edges: HashSet<EdgeIndex>,
}

impl LoopAnalysis {
    pub fn get(&self, head: &str) -> Option<&LoopInfo> {
        self.loops.get(head)
    }

    /// The loop whose cycle is entered at `id` when `id` is not the
    /// feedback loop node itself.
    pub fn entered_at(&self, id: &str) -> Option<&LoopInfo> {
        self.loops.values().find(|l| l.entry == id && l.head != id)
    }

    pub fn is_back_edge(&self, edge: EdgeIndex) -> bool {
        self.back_edges.contains(&edge)
    }

    pub fn back_edge_count(&self) -> usize {
        self.back_edges.len()
    }
}

pub fn analyze_loops(
    workflow: &Workflow,
    graph: &WorkflowGraph,
    errors: &mut Vec<Diagnostic>,
) -> LoopAnalysis {
    let mut analysis = LoopAnalysis::default();
    let nodes = node_map(workflow);
    let is_loop_node = |idx: NodeIndex| {
        nodes
            .get(graph.id_of(idx))
            .is_some_and(|n| n.is_feedback_loop())
    };

    let Some(trigger_idx) = workflow
        .nodes
        .iter()
        .find(|n| n.is_trigger())
        .and_then(|n| graph.index_of(n.id()))
    else {
        return analysis;
    };

    let mut discovered = HashSet::new();
    let mut retreating = Vec::new();
    depth_first_search(&graph.graph, Some(trigger_idx), |event| match event {
        DfsEvent::Discover(n, _) => {
            discovered.insert(n);
        }
        DfsEvent::BackEdge(u, v) if u != v => retreating.push((u, v)),
        _ => {}
    });

    // entry -> (tails, back-edge indices)
    let mut by_entry: BTreeMap<String, (Vec<NodeIndex>, BTreeSet<EdgeIndex>)> = BTreeMap::new();
    for (u, v) in retreating {
        let entry = by_entry.entry(graph.id_of(v).to_string()).or_default();
        if !entry.0.contains(&u) {
            entry.0.push(u);
        }
        for e in graph.graph.edges_connecting(u, v) {
            entry.1.insert(e.id());
        }
    }

    for (entry_id, (tails, edges)) in by_entry {
        let Some(entry) = graph.index_of(&entry_id) else {
            continue;
        };
        let natural = natural_loop(graph, &tails, entry);

        // A cycle first entered at a plain node is headed by the feedback
        // loop on it; cycles without any feedback loop are reported as V004.
        let head = if is_loop_node(entry) {
            entry
        } else {
            let guard = natural
                .iter()
                .copied()
                .filter(|&n| is_loop_node(n))
                .min_by(|&a, &b| graph.id_of(a).cmp(graph.id_of(b)));
            match guard {
                Some(guard) => guard,
                None => continue,
            }
        };
        let head_id = graph.id_of(head).to_string();

        let body: BTreeSet<String> = natural
            .iter()
            .filter(|&&n| n != head)
            .map(|&n| graph.id_of(n).to_string())
            .collect();

        for bypass in reachable_avoiding(graph, trigger_idx, entry) {
            let id = graph.id_of(bypass);
            if bypass != trigger_idx && natural.contains(&bypass) {
                errors.push(Diagnostic::validate(
                    "V013",
                    format!(
                        "Node '{}' lies on the cycle of feedback loop '{}' but can be reached \
                         without passing through '{}'",
                        id, head_id, entry_id
                    ),
                    Some(id.to_string()),
                ));
            }
        }

        let body_entry = if head == entry {
            let entries: Vec<&str> = graph
                .successors(&head_id)
                .into_iter()
                .filter(|a| body.contains(a.node_id))
                .map(|a| a.node_id)
                .collect();
            if entries.len() > 1 {
                errors.push(Diagnostic::validate(
                    "V012",
                    format!(
                        "Feedback loop '{}' must have exactly one body edge, found {}",
                        head_id,
                        entries.len()
                    ),
                    Some(head_id.clone()),
                ));
            }
            let Some(&first) = entries.first() else {
                continue;
            };
            first.to_string()
        } else {
            let detours: Vec<&str> = graph
                .successors(&head_id)
                .into_iter()
                .filter(|a| body.contains(a.node_id) && a.node_id != entry_id)
                .map(|a| a.node_id)
                .collect();
            if !detours.is_empty() {
                errors.push(Diagnostic::validate(
                    "V012",
                    format!(
                        "Feedback loop '{}' must route straight back to '{}', found an edge to '{}'",
                        head_id, entry_id, detours[0]
                    ),
                    Some(head_id.clone()),
                ));
                continue;
            }
            entry_id.clone()
        };

        if analysis.loops.contains_key(&head_id) {
            errors.push(Diagnostic::validate(
                "V012",
                format!("Feedback loop '{}' closes more than one cycle", head_id),
                Some(head_id.clone()),
            ));
            continue;
        }

        analysis.back_edges.extend(edges.iter().copied());
        analysis.loops.insert(
            head_id.clone(),
            LoopInfo {
                head: head_id,
                entry: entry_id,
                body_entry,
                back_edges: edges.iter().map(|&e| graph.graph[e].id.clone()).collect(),
                body,
            },
        );
    }

    for node in &workflow.nodes {
        let Some(idx) = graph.index_of(node.id()) else {
            continue;
        };
        if node.is_feedback_loop() && discovered.contains(&idx) && !analysis.loops.contains_key(node.id())
        {
            errors.push(Diagnostic::validate(
                "V012",
                format!(
                    "Feedback loop '{}' has no back-edge; nothing routes back into it",
                    node.id()
                ),
                Some(node.id().to_string()),
            ));
        }
    }

    analysis
}

/// The head plus every node that reaches one of `tails` without passing
/// through the head.
fn natural_loop(graph: &WorkflowGraph, tails: &[NodeIndex], head: NodeIndex) -> HashSet<NodeIndex> {
    let mut members = HashSet::from([head]);
    let mut stack: Vec<NodeIndex> = tails.to_vec();
    while let Some(n) = stack.pop() {
        if !members.insert(n) {
            continue;
        }
        for pred in graph.graph.neighbors_directed(n, Direction::Incoming) {
            if !members.contains(&pred) {
                stack.push(pred);
            }
        }
    }
    members
}

/// Nodes reachable from `start` when `blocked` is removed from the graph.
fn reachable_avoiding(graph: &WorkflowGraph, start: NodeIndex, blocked: NodeIndex) -> Vec<NodeIndex> {
    let mut visited = HashSet::from([start]);
    let mut order = Vec::new();
    let mut queue = VecDeque::from([start]);
    while let Some(n) = queue.pop_front() {
        order.push(n);
        for next in graph.graph.neighbors_directed(n, Direction::Outgoing) {
            if next != blocked && visited.insert(next) {
                queue.push_back(next);
            }
        }
    }
    order
}
