//! Program entry: imports, the exported async function, binding
//! declarations, the trigger assignment and the result epilogue.

use std::collections::BTreeSet;

use super::EmitContext;
use super::value_expr::string_literal;
use super::writer::CodeWriter;
use crate::parse::types::{NodeBase, TriggerConfig, TriggerType};

/// Everything up to the first node statement.
pub fn emit_entry_open(ctx: &EmitContext<'_, '_>, w: &mut CodeWriter) {
    if let Some(header) = ctx.options.header.as_deref().filter(|h| !h.trim().is_empty()) {
        w.comment(header);
    }
    w.line(&format!(
        "import type {{ Runtime }} from {};",
        string_literal(&ctx.options.runtime_import)
    ));
    w.blank();
    w.open(&format!(
        "export async function {}(runtime: Runtime, input: unknown): Promise<Record<string, unknown>>",
        ctx.options.entry_name()
    ));

    // Hoisted so branches, loop bodies and parallel closures can all assign.
    let ids: BTreeSet<&str> = ctx.v.workflow.nodes.iter().map(|n| n.id()).collect();
    for id in ids {
        w.line(&format!("let {}: any;", ctx.var(id)));
    }
    w.blank();
}

pub fn emit_trigger(n: &NodeBase<TriggerConfig>, ctx: &mut EmitContext<'_, '_>, w: &mut CodeWriter) {
    let cfg = &n.data.config;
    if ctx.options.emit_comments {
        match cfg.trigger_type {
            TriggerType::Manual => {}
            TriggerType::Webhook => w.comment("Invoked by webhook; `input` is the request payload."),
            TriggerType::Schedule => w.comment(&format!(
                "Invoked on schedule {}",
                cfg.schedule.as_deref().unwrap_or_default()
            )),
        }
        if let Some(schema) = &cfg.input_schema {
            w.comment(&format!("Input schema: {}", schema));
        }
    }
    w.line(&format!("{} = {{ output: input }};", ctx.var(&n.id)));
}

/// Return the bindings of every node without outgoing edges, keyed by node
/// id, and close the function.
pub fn emit_epilogue(ctx: &EmitContext<'_, '_>, w: &mut CodeWriter) {
    let graph = &ctx.v.graph;
    let leaves: BTreeSet<&str> = ctx
        .v
        .workflow
        .nodes
        .iter()
        .map(|n| n.id())
        .filter(|id| graph.outgoing_count(id) == 0)
        .collect();

    w.blank();
    if leaves.is_empty() {
        w.line("return {};");
    } else {
        w.open("return");
        for id in leaves {
            w.line(&format!("{}: {},", string_literal(id), ctx.var(id)));
        }
        w.close_with("};");
    }
    w.close();
}
