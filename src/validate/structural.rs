//! Graph-level structural validation rules (V001–V014).

use std::collections::{HashMap, HashSet};

use petgraph::graph::NodeIndex;
use petgraph::visit::{Bfs, DfsEvent, NodeFiltered, depth_first_search};

use crate::error::Diagnostic;
use crate::parse::graph::{WorkflowGraph, node_map};
use crate::parse::types::{BranchLabel, NodeKind, Workflow, WorkflowNode};

/// Run all structural validation rules. Returns every violation found.
pub fn validate_structural(workflow: &Workflow, graph: &WorkflowGraph) -> Vec<Diagnostic> {
    let mut errors = Vec::new();

    v001_exactly_one_trigger(workflow, &mut errors);
    v002_edges_reference_existing_nodes(workflow, graph, &mut errors);
    v003_no_duplicate_edge_ids(workflow, &mut errors);
    v011_no_duplicate_node_ids(workflow, &mut errors);
    v004_no_accidental_cycles(workflow, graph, &mut errors);
    v005_all_reachable_from_trigger(workflow, graph, &mut errors);
    v006_trigger_no_incoming(workflow, graph, &mut errors);
    v008_condition_has_true_false(workflow, graph, &mut errors);
    v009_parallel_has_distinct_slots(workflow, graph, &mut errors);
    v010_no_self_loops(workflow, &mut errors);
    v014_stray_edge_annotations(workflow, &mut errors);

    errors
}

fn v001_exactly_one_trigger(workflow: &Workflow, errors: &mut Vec<Diagnostic>) {
    let trigger_count = workflow.nodes.iter().filter(|n| n.is_trigger()).count();
    if trigger_count != 1 {
        errors.push(Diagnostic::validate(
            "V001",
            format!(
                "Workflow must have exactly 1 trigger node, found {}",
                trigger_count
            ),
            None,
        ));
    }
}

fn v002_edges_reference_existing_nodes(
    workflow: &Workflow,
    graph: &WorkflowGraph,
    errors: &mut Vec<Diagnostic>,
) {
    for edge in &workflow.edges {
        if !graph.contains(&edge.source_node_id) {
            errors.push(
                Diagnostic::validate(
                    "V002",
                    format!(
                        "Edge '{}' references unknown source node '{}'",
                        edge.id, edge.source_node_id
                    ),
                    None,
                )
                .on_edge(&edge.id),
            );
        }
        if !graph.contains(&edge.target_node_id) {
            errors.push(
                Diagnostic::validate(
                    "V002",
                    format!(
                        "Edge '{}' references unknown target node '{}'",
                        edge.id, edge.target_node_id
                    ),
                    None,
                )
                .on_edge(&edge.id),
            );
        }
    }
}

fn v003_no_duplicate_edge_ids(workflow: &Workflow, errors: &mut Vec<Diagnostic>) {
    let mut seen = HashSet::new();
    for edge in &workflow.edges {
        if !seen.insert(edge.id.as_str()) {
            errors.push(
                Diagnostic::validate("V003", format!("Duplicate edge id '{}'", edge.id), None)
                    .on_edge(&edge.id),
            );
        }
    }
}

fn v011_no_duplicate_node_ids(workflow: &Workflow, errors: &mut Vec<Diagnostic>) {
    let mut seen = HashSet::new();
    for node in &workflow.nodes {
        if !seen.insert(node.id()) {
            errors.push(Diagnostic::validate(
                "V011",
                format!("Duplicate node id '{}'", node.id()),
                Some(node.id().to_string()),
            ));
        }
    }
}

/// A cycle is only allowed when it runs through a feedback loop. Removing
/// every feedback loop node must therefore leave an acyclic graph; each DFS
/// back-edge that survives the removal closes an unguarded cycle.
fn v004_no_accidental_cycles(
    workflow: &Workflow,
    graph: &WorkflowGraph,
    errors: &mut Vec<Diagnostic>,
) {
    let nodes = node_map(workflow);
    let guarded: HashSet<NodeIndex> = graph
        .graph
        .node_indices()
        .filter(|&idx| {
            nodes
                .get(graph.id_of(idx))
                .is_some_and(|n| n.is_feedback_loop())
        })
        .collect();

    let unguarded = NodeFiltered::from_fn(&graph.graph, |idx| !guarded.contains(&idx));
    let starts: Vec<NodeIndex> = graph
        .graph
        .node_indices()
        .filter(|idx| !guarded.contains(idx))
        .collect();

    let mut back_edges = Vec::new();
    depth_first_search(&unguarded, starts, |event| {
        if let DfsEvent::BackEdge(u, v) = event {
            // Self-loops are reported by V010.
            if u != v {
                back_edges.push((u, v));
            }
        }
    });

    let mut reported = HashSet::new();
    for (u, v) in back_edges {
        if !reported.insert((u, v)) {
            continue;
        }
        let edge_id = graph.edge_between(u, v).unwrap_or_default().to_string();
        errors.push(
            Diagnostic::validate(
                "V004",
                format!(
                    "Accidental cycle: edge '{}' from '{}' back to '{}' closes a cycle \
                     that passes through no feedback loop node",
                    edge_id,
                    graph.id_of(u),
                    graph.id_of(v)
                ),
                Some(graph.id_of(v).to_string()),
            )
            .on_edge(edge_id),
        );
    }
}

fn v005_all_reachable_from_trigger(
    workflow: &Workflow,
    graph: &WorkflowGraph,
    errors: &mut Vec<Diagnostic>,
) {
    let triggers: Vec<NodeIndex> = workflow
        .nodes
        .iter()
        .filter(|n| n.is_trigger())
        .filter_map(|n| graph.index_of(n.id()))
        .collect();
    if triggers.is_empty() {
        return;
    }

    let mut reachable = HashSet::new();
    for trigger_idx in triggers {
        let mut bfs = Bfs::new(&graph.graph, trigger_idx);
        while let Some(nx) = bfs.next(&graph.graph) {
            reachable.insert(nx);
        }
    }

    let mut reported = HashSet::new();
    for node in &workflow.nodes {
        let Some(idx) = graph.index_of(node.id()) else {
            continue;
        };
        if !reachable.contains(&idx) && reported.insert(idx) {
            errors.push(Diagnostic::validate(
                "V005",
                format!("Node '{}' is not reachable from the trigger", node.id()),
                Some(node.id().to_string()),
            ));
        }
    }
}

fn v006_trigger_no_incoming(
    workflow: &Workflow,
    graph: &WorkflowGraph,
    errors: &mut Vec<Diagnostic>,
) {
    for node in &workflow.nodes {
        if node.is_trigger() && graph.incoming_count(node.id()) > 0 {
            errors.push(Diagnostic::validate(
                "V006",
                format!("Trigger node '{}' must not have incoming edges", node.id()),
                Some(node.id().to_string()),
            ));
        }
    }
}

fn v008_condition_has_true_false(
    workflow: &Workflow,
    graph: &WorkflowGraph,
    errors: &mut Vec<Diagnostic>,
) {
    for node in &workflow.nodes {
        let WorkflowNode::Condition(_) = node else {
            continue;
        };
        let edges = graph.successors(node.id());
        if edges.len() != 2 {
            errors.push(Diagnostic::validate(
                "V008",
                format!(
                    "Condition node '{}' must have exactly 2 outgoing edges (true/false), found {}",
                    node.id(),
                    edges.len()
                ),
                Some(node.id().to_string()),
            ));
            continue;
        }

        let labels: HashSet<Option<BranchLabel>> =
            edges.iter().map(|a| a.edge.branch_label).collect();
        if !labels.contains(&Some(BranchLabel::True)) || !labels.contains(&Some(BranchLabel::False))
        {
            errors.push(Diagnostic::validate(
                "V008",
                format!(
                    "Condition node '{}' outgoing edges must carry branchLabel 'true' and 'false'",
                    node.id()
                ),
                Some(node.id().to_string()),
            ));
        }
    }
}

fn v009_parallel_has_distinct_slots(
    workflow: &Workflow,
    graph: &WorkflowGraph,
    errors: &mut Vec<Diagnostic>,
) {
    for node in &workflow.nodes {
        let WorkflowNode::Parallel(_) = node else {
            continue;
        };
        let edges = graph.successors(node.id());
        if edges.len() < 2 {
            errors.push(Diagnostic::validate(
                "V009",
                format!(
                    "Parallel node '{}' must have at least 2 outgoing edges, found {}",
                    node.id(),
                    edges.len()
                ),
                Some(node.id().to_string()),
            ));
        }

        let mut slots = HashSet::new();
        for adj in &edges {
            match adj.edge.output_slot.as_deref().map(str::trim) {
                None | Some("") => errors.push(
                    Diagnostic::validate(
                        "V009",
                        format!(
                            "Edge '{}' leaving parallel node '{}' has no outputSlot",
                            adj.edge.id,
                            node.id()
                        ),
                        Some(node.id().to_string()),
                    )
                    .on_edge(&adj.edge.id),
                ),
                Some(slot) => {
                    if !slots.insert(slot) {
                        errors.push(
                            Diagnostic::validate(
                                "V009",
                                format!(
                                    "Parallel node '{}' uses outputSlot '{}' more than once",
                                    node.id(),
                                    slot
                                ),
                                Some(node.id().to_string()),
                            )
                            .on_edge(&adj.edge.id),
                        );
                    }
                }
            }
        }
    }
}

fn v010_no_self_loops(workflow: &Workflow, errors: &mut Vec<Diagnostic>) {
    for edge in &workflow.edges {
        if edge.source_node_id == edge.target_node_id {
            errors.push(
                Diagnostic::validate(
                    "V010",
                    format!("Self-loop detected on node '{}'", edge.source_node_id),
                    Some(edge.source_node_id.clone()),
                )
                .on_edge(&edge.id),
            );
        }
    }
}

fn v014_stray_edge_annotations(workflow: &Workflow, errors: &mut Vec<Diagnostic>) {
    let kinds: HashMap<&str, NodeKind> = workflow
        .nodes
        .iter()
        .map(|n| (n.id(), n.kind()))
        .collect();

    for edge in &workflow.edges {
        let Some(&kind) = kinds.get(edge.source_node_id.as_str()) else {
            continue;
        };
        if edge.branch_label.is_some() && kind != NodeKind::Condition {
            errors.push(
                Diagnostic::validate_warning(
                    "V014",
                    format!(
                        "branchLabel on edge '{}' is ignored: source '{}' is a {} node",
                        edge.id, edge.source_node_id, kind
                    ),
                    Some(edge.source_node_id.clone()),
                )
                .on_edge(&edge.id),
            );
        }
        if edge.output_slot.is_some() && kind != NodeKind::Parallel {
            errors.push(
                Diagnostic::validate_warning(
                    "V014",
                    format!(
                        "outputSlot on edge '{}' is ignored: source '{}' is a {} node",
                        edge.id, edge.source_node_id, kind
                    ),
                    Some(edge.source_node_id.clone()),
                )
                .on_edge(&edge.id),
            );
        }
    }
}
