//! Variable names bound to each node in the emitted program.

use std::collections::{HashMap, HashSet};

use crate::parse::types::Workflow;

/// Maps node ids to unique `step_<id>` identifiers.
///
/// Names are assigned in sorted id order, so the table does not depend on
/// the order of the node array. Ids that sanitize to the same identifier get
/// a numeric suffix (`step_a_1`, `step_a_1_2`).
#[derive(Debug, Clone, Default)]
pub struct BindingNames {
    names: HashMap<String, String>,
}

impl BindingNames {
    pub fn build(workflow: &Workflow) -> Self {
        let mut ids: Vec<&str> = workflow.nodes.iter().map(|n| n.id()).collect();
        ids.sort_unstable();
        ids.dedup();

        let mut taken = HashSet::new();
        let mut names = HashMap::new();
        for id in ids {
            let base = format!("step_{}", sanitize_ident(id));
            let mut name = base.clone();
            let mut n = 2;
            while !taken.insert(name.clone()) {
                name = format!("{}_{}", base, n);
                n += 1;
            }
            names.insert(id.to_string(), name);
        }
        BindingNames { names }
    }

    /// The variable bound to `node_id`.
    pub fn var(&self, node_id: &str) -> String {
        self.names
            .get(node_id)
            .cloned()
            .unwrap_or_else(|| format!("step_{}", sanitize_ident(node_id)))
    }
}

/// Replace every character that cannot appear in a JS identifier with `_`.
pub fn sanitize_ident(raw: &str) -> String {
    let mut out: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// `.name` when `name` is a plain identifier, `["name"]` otherwise.
pub fn property_access(name: &str) -> String {
    let is_ident = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if is_ident {
        format!(".{}", name)
    } else {
        format!("[{}]", serde_json::Value::String(name.to_string()))
    }
}
