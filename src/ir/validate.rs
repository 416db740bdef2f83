//! Plan invariant validation.
//!
//! Checks that a block tree owns every graph node exactly once and that
//! every `Visited` reference points at an owned node, before codegen.

use std::collections::{BTreeSet, HashMap};

use crate::error::Diagnostic;
use crate::ir::types::Block;

/// Validate a planned tree against the node ids of the graph. Returns all
/// errors found.
pub fn validate_plan<'n>(block: &Block, node_ids: impl IntoIterator<Item = &'n str>) -> Vec<Diagnostic> {
    let mut errors = Vec::new();

    let mut owners: HashMap<&str, usize> = HashMap::new();
    for id in block.owned_nodes() {
        *owners.entry(id).or_default() += 1;
    }

    let mut duplicated: Vec<&str> = owners
        .iter()
        .filter(|(_, count)| **count > 1)
        .map(|(id, _)| *id)
        .collect();
    duplicated.sort_unstable();
    for id in duplicated {
        errors.push(Diagnostic::plan_error(
            "E001",
            format!("Node '{}' is emitted more than once", id),
            Some(id.to_string()),
        ));
    }

    let expected: BTreeSet<&str> = node_ids.into_iter().collect();
    for id in &expected {
        if !owners.contains_key(id) {
            errors.push(Diagnostic::plan_error(
                "E002",
                format!("Node '{}' is never emitted", id),
                Some(id.to_string()),
            ));
        }
    }

    let mut dangling = BTreeSet::new();
    collect_visited(block, &mut dangling);
    for id in dangling {
        if !owners.contains_key(id) {
            errors.push(Diagnostic::plan_error(
                "E003",
                format!("Reference to node '{}' which no block owns", id),
                Some(id.to_string()),
            ));
        }
    }

    errors
}

fn collect_visited<'b>(block: &'b Block, out: &mut BTreeSet<&'b str>) {
    if let Block::Visited { node_id } = block {
        out.insert(node_id.as_str());
    }
    for child in block.children() {
        collect_visited(child, out);
    }
}
