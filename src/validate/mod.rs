//! Graph-level validation phase.
//!
//! Validates the raw snapshot before planning: structural invariants, node
//! configs and feedback loop shapes. Every violation is collected.

pub mod loops;
pub mod node_rules;
pub mod structural;

use std::collections::HashMap;

use tracing::{debug, instrument};

use crate::error::{Diagnostic, has_errors};
use crate::parse::graph::{WorkflowGraph, node_map};
use crate::parse::types::{Workflow, WorkflowNode};

pub use loops::{LoopAnalysis, LoopInfo};

/// A snapshot that passed validation, with the analysis the planner needs.
#[derive(Debug)]
pub struct ValidatedGraph<'a> {
    pub workflow: &'a Workflow,
    pub graph: WorkflowGraph,
    pub nodes: HashMap<&'a str, &'a WorkflowNode>,
    pub loops: LoopAnalysis,
    /// Non-fatal diagnostics raised during validation.
    pub warnings: Vec<Diagnostic>,
}

impl<'a> ValidatedGraph<'a> {
    pub fn node(&self, id: &str) -> Option<&'a WorkflowNode> {
        self.nodes.get(id).copied()
    }

    pub fn trigger(&self) -> Option<&'a WorkflowNode> {
        self.workflow.nodes.iter().find(|n| n.is_trigger())
    }
}

/// Validate the whole snapshot. On failure every diagnostic (errors and
/// warnings) is returned.
#[instrument(level = "debug", skip_all, fields(nodes = workflow.nodes.len(), edges = workflow.edges.len()))]
pub fn validate(workflow: &Workflow) -> Result<ValidatedGraph<'_>, Vec<Diagnostic>> {
    let graph = WorkflowGraph::build(workflow);
    let mut diagnostics = validate_graph(workflow, &graph);
    let loops = loops::analyze_loops(workflow, &graph, &mut diagnostics);

    if has_errors(&diagnostics) {
        debug!(count = diagnostics.len(), "validation failed");
        return Err(diagnostics);
    }

    Ok(ValidatedGraph {
        workflow,
        graph,
        nodes: node_map(workflow),
        loops,
        warnings: diagnostics,
    })
}

/// Structural + node config rules, without loop analysis.
pub fn validate_graph(workflow: &Workflow, graph: &WorkflowGraph) -> Vec<Diagnostic> {
    let mut errors = structural::validate_structural(workflow, graph);
    for node in &workflow.nodes {
        errors.extend(validate_node(node));
    }
    errors
}

/// Validate a single node's configuration.
pub fn validate_node(node: &WorkflowNode) -> Vec<Diagnostic> {
    node_rules::validate_node_config(node)
}
