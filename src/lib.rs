//! Compiles a workflow graph snapshot into a TypeScript program.
//!
//! Pipeline: parse → validate → plan → codegen. Invalid graphs never fail
//! with `Err`; they produce empty code and error diagnostics.

pub mod codegen;
pub mod config;
pub mod error;
pub mod ir;
pub mod parse;
pub mod plan;
pub mod resolve;
pub mod validate;
pub mod wasm;

use serde::Serialize;
use tracing::{info, instrument};

pub use config::CompileOptions;
pub use error::{CompilerError, Diagnostic, Phase, Severity};
pub use parse::types::{Workflow, WorkflowEdge, WorkflowNode};
pub use resolve::{AncestorInfo, ancestors_of};

/// Program text for a canvas with no nodes.
pub const EMPTY_PROGRAM: &str = "// This workflow is empty. Add a trigger to get started.\n";

#[derive(Debug, Clone, Default, Serialize)]
pub struct CompileOutput {
    /// Empty whenever `diagnostics` contains an error.
    pub code: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileOutput {
    pub fn has_errors(&self) -> bool {
        error::has_errors(&self.diagnostics)
    }

    fn failed(diagnostics: Vec<Diagnostic>) -> Self {
        CompileOutput {
            code: String::new(),
            diagnostics,
        }
    }
}

pub fn compile(nodes: Vec<WorkflowNode>, edges: Vec<WorkflowEdge>) -> CompileOutput {
    compile_with_options(nodes, edges, &CompileOptions::default())
}

pub fn compile_with_options(
    nodes: Vec<WorkflowNode>,
    edges: Vec<WorkflowEdge>,
    options: &CompileOptions,
) -> CompileOutput {
    compile_workflow(&Workflow { nodes, edges }, options)
}

/// Parse a compile request (`nodes`, `edges`, optional `options`) and
/// compile it. Only malformed JSON is an `Err`.
pub fn compile_json(json: &str) -> Result<CompileOutput, CompilerError> {
    let request = parse::parse_request(json)?;
    Ok(compile_workflow(&request.workflow, &request.options))
}

#[instrument(skip_all, fields(nodes = workflow.nodes.len(), edges = workflow.edges.len()))]
pub fn compile_workflow(workflow: &Workflow, options: &CompileOptions) -> CompileOutput {
    if workflow.nodes.is_empty() {
        return CompileOutput {
            code: EMPTY_PROGRAM.to_string(),
            diagnostics: vec![],
        };
    }

    let workflow = canonicalize(workflow);

    let validated = match validate::validate(&workflow) {
        Ok(v) => v,
        Err(diagnostics) => {
            info!(diagnostics = diagnostics.len(), "workflow rejected by validation");
            return CompileOutput::failed(diagnostics);
        }
    };
    let mut diagnostics = validated.warnings.clone();

    let planned = plan::plan(&validated);
    let plan_failed = error::has_errors(&planned.diagnostics);
    diagnostics.extend(planned.diagnostics);
    if plan_failed {
        info!(diagnostics = diagnostics.len(), "workflow could not be planned");
        return CompileOutput::failed(diagnostics);
    }

    let emitted = codegen::emit(&planned.block, &validated, options);
    diagnostics.extend(emitted.diagnostics);

    info!(
        loops = validated.loops.loops.len(),
        bytes = emitted.code.len(),
        diagnostics = diagnostics.len(),
        "workflow compiled"
    );
    CompileOutput {
        code: emitted.code,
        diagnostics,
    }
}

/// Sort nodes by id and edges by endpoints so output never depends on the
/// order of the input arrays.
fn canonicalize(workflow: &Workflow) -> Workflow {
    let mut nodes = workflow.nodes.clone();
    nodes.sort_by(|a, b| a.id().cmp(b.id()));

    let mut edges = workflow.edges.clone();
    edges.sort_by(|a, b| {
        (
            &a.source_node_id,
            &a.target_node_id,
            a.branch_label,
            &a.output_slot,
            &a.id,
        )
            .cmp(&(
                &b.source_node_id,
                &b.target_node_id,
                b.branch_label,
                &b.output_slot,
                &b.id,
            ))
    });

    Workflow { nodes, edges }
}
