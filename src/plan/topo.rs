//! Deterministic topological sort of the forward graph.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use petgraph::Direction;
use petgraph::visit::EdgeRef;

use crate::validate::ValidatedGraph;

/// Node ids in topological order over every edge that is not a feedback
/// loop back-edge. Among ready nodes the smallest id goes first, so the
/// order depends only on the graph, never on array order.
///
/// Nodes left on a cycle (impossible after validation) are appended in id
/// order.
pub fn topo_order(validated: &ValidatedGraph<'_>) -> Vec<String> {
    let g = &validated.graph.graph;
    let forward = |e: petgraph::graph::EdgeReference<'_, _>| !validated.loops.is_back_edge(e.id());

    let mut in_degree: HashMap<_, usize> = g
        .node_indices()
        .map(|n| {
            let count = g
                .edges_directed(n, Direction::Incoming)
                .filter(|e| forward(*e))
                .count();
            (n, count)
        })
        .collect();

    let mut ready: BinaryHeap<Reverse<(&str, _)>> = in_degree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(&n, _)| Reverse((g[n].as_str(), n)))
        .collect();

    let mut order = Vec::with_capacity(g.node_count());
    while let Some(Reverse((id, n))) = ready.pop() {
        order.push(id.to_string());
        for e in g.edges_directed(n, Direction::Outgoing).filter(|e| forward(*e)) {
            if let Some(d) = in_degree.get_mut(&e.target()) {
                *d -= 1;
                if *d == 0 {
                    ready.push(Reverse((g[e.target()].as_str(), e.target())));
                }
            }
        }
    }

    if order.len() < g.node_count() {
        let mut rest: Vec<String> = g
            .node_indices()
            .map(|n| g[n].clone())
            .filter(|id| !order.contains(id))
            .collect();
        rest.sort_unstable();
        order.extend(rest);
    }
    order
}
