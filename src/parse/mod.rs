//! Parse phase: JSON → Rust types + graph construction.

pub mod graph;
pub mod types;

pub use graph::WorkflowGraph;
pub use types::*;

use crate::error::CompilerError;

/// Deserialize a workflow JSON string into a `Workflow`.
pub fn parse(json: &str) -> Result<Workflow, CompilerError> {
    Ok(serde_json::from_str::<Workflow>(json)?)
}

/// Deserialize a compile request (`nodes`, `edges`, optional `options`).
pub fn parse_request(json: &str) -> Result<CompileRequest, CompilerError> {
    serde_json::from_str::<CompileRequest>(json).map_err(|source| CompilerError::Malformed {
        what: "compile request",
        source,
    })
}
