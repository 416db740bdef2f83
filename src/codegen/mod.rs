//! Codegen pass: block tree → TypeScript source.
//!
//! Public API: `emit(block, validated, options) -> EmitOutput`

mod handler;
mod operations;
mod trigger;
mod value_expr;
mod writer;

use serde::Serialize;
use tracing::{debug, instrument};

use crate::config::CompileOptions;
use crate::error::Diagnostic;
use crate::ir::types::Block;
use crate::resolve::ancestors::{AncestorInfo, ancestors_in};
use crate::resolve::bindings::BindingNames;
use crate::resolve::template::Resolved;
use crate::validate::ValidatedGraph;
use writer::CodeWriter;

#[derive(Debug, Clone, Serialize)]
pub struct EmitOutput {
    pub code: String,
    /// Reference warnings raised while resolving templates.
    pub diagnostics: Vec<Diagnostic>,
}

/// State shared by every emission function during one `emit` call.
pub(crate) struct EmitContext<'v, 'a> {
    pub v: &'v ValidatedGraph<'a>,
    pub names: &'v BindingNames,
    pub options: &'v CompileOptions,
    pub diagnostics: Vec<Diagnostic>,
}

impl EmitContext<'_, '_> {
    pub fn var(&self, node_id: &str) -> String {
        self.names.var(node_id)
    }

    pub fn ancestors(&self, node_id: &str) -> Vec<AncestorInfo> {
        ancestors_in(&self.v.graph, &self.v.nodes, node_id)
    }

    /// Record a resolution's warnings and hand the resolution back.
    pub fn keep(&mut self, mut resolved: Resolved) -> Resolved {
        self.diagnostics.append(&mut resolved.warnings);
        resolved
    }
}

/// Generate the program for a planned, validated graph.
#[instrument(level = "debug", skip_all)]
pub fn emit(block: &Block, validated: &ValidatedGraph<'_>, options: &CompileOptions) -> EmitOutput {
    let names = BindingNames::build(validated.workflow);
    let mut ctx = EmitContext {
        v: validated,
        names: &names,
        options,
        diagnostics: Vec::new(),
    };
    let mut w = CodeWriter::new();

    trigger::emit_entry_open(&ctx, &mut w);
    handler::emit_block(block, &mut ctx, &mut w);
    trigger::emit_epilogue(&ctx, &mut w);

    debug!(warnings = ctx.diagnostics.len(), "program emitted");
    EmitOutput {
        code: w.finish(),
        diagnostics: ctx.diagnostics,
    }
}
