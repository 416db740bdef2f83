//! Control-flow planning: turns a validated graph into a block tree.

mod builder;
pub mod topo;

use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::Diagnostic;
use crate::ir::types::Block;
use crate::ir::validate::validate_plan;
use crate::validate::ValidatedGraph;

use builder::Planner;

#[derive(Debug, Clone, Serialize)]
pub struct PlanOutput {
    pub block: Block,
    /// Info notes about joins and loop exits, plus any plan invariant errors.
    pub diagnostics: Vec<Diagnostic>,
}

/// Plan the whole graph starting at its trigger.
#[instrument(level = "debug", skip_all, fields(nodes = validated.graph.graph.node_count()))]
pub fn plan(validated: &ValidatedGraph<'_>) -> PlanOutput {
    let Some(trigger) = validated.trigger() else {
        return PlanOutput {
            block: Block::End,
            diagnostics: vec![],
        };
    };

    let order = topo::topo_order(validated);
    let mut planner = Planner::new(validated, &order);
    let block = planner.plan_node(trigger.id());
    let mut diagnostics = planner.diagnostics;

    diagnostics.extend(validate_plan(
        &block,
        validated.graph.node_indices.keys().map(String::as_str),
    ));
    debug!(diagnostics = diagnostics.len(), "plan built");

    PlanOutput { block, diagnostics }
}
