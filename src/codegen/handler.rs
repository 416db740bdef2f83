//! Emit the function body by walking the block tree once.
//!
//! Branch, Fan and Loop blocks own the control flow around their node; every
//! other node is delegated to `operations.rs`.

use super::EmitContext;
use super::operations::{emit_header, emit_node};
use super::value_expr::emit_expression;
use super::writer::CodeWriter;
use crate::ir::types::{Block, FanArm};
use crate::parse::types::{MergeStrategy, WorkflowNode};
use crate::resolve::template::TemplateResolver;

pub fn emit_block(block: &Block, ctx: &mut EmitContext<'_, '_>, w: &mut CodeWriter) {
    match block {
        Block::Seq { node_id, next } => {
            if let Some(node) = ctx.v.node(node_id) {
                emit_header(node, ctx, w);
                emit_node(node, ctx, w);
            }
            emit_block(next, ctx, w);
        }
        Block::Branch {
            node_id,
            on_true,
            on_false,
            then,
        } => {
            emit_branch(node_id, on_true, on_false, ctx, w);
            emit_block(then, ctx, w);
        }
        Block::Fan {
            node_id,
            branches,
            merge_strategy,
            then,
        } => {
            emit_fan(node_id, branches, *merge_strategy, ctx, w);
            emit_block(then, ctx, w);
        }
        Block::Loop {
            node_id,
            body,
            max_iterations,
            stop_condition,
            then,
        } => {
            emit_loop(node_id, body, *max_iterations, stop_condition, ctx, w);
            emit_block(then, ctx, w);
        }
        Block::Fork { branches, then } => {
            for branch in branches {
                emit_block(branch, ctx, w);
            }
            emit_block(then, ctx, w);
        }
        Block::Visited { node_id } => {
            if ctx.options.emit_comments {
                w.comment(&format!("'{}' already ran on another path", node_id));
            }
        }
        Block::End => {}
    }
}

fn emit_branch(
    node_id: &str,
    on_true: &Block,
    on_false: &Block,
    ctx: &mut EmitContext<'_, '_>,
    w: &mut CodeWriter,
) {
    let Some(node) = ctx.v.node(node_id) else {
        return;
    };
    let (expression, true_label, false_label) = match node {
        WorkflowNode::Condition(n) => (
            n.data.config.expression.as_str(),
            n.data.config.true_label.as_str(),
            n.data.config.false_label.as_str(),
        ),
        _ => ("", "true", "false"),
    };

    emit_header(node, ctx, w);
    let ancestors = ctx.ancestors(node_id);
    let resolver = TemplateResolver::new(node_id, &ancestors, ctx.names);
    let condition = ctx.keep(resolver.resolve(expression));
    let var = ctx.var(node_id);
    w.line(&format!(
        "{} = {{ output: Boolean({}) }};",
        var,
        emit_expression(&condition)
    ));

    match (on_true.is_end(), on_false.is_end()) {
        (true, true) => {}
        (false, true) => {
            w.open(&format!("if ({}.output)", var));
            emit_arm(true_label, on_true, ctx, w);
            w.close();
        }
        (true, false) => {
            w.open(&format!("if (!{}.output)", var));
            emit_arm(false_label, on_false, ctx, w);
            w.close();
        }
        (false, false) => {
            w.open(&format!("if ({}.output)", var));
            emit_arm(true_label, on_true, ctx, w);
            w.else_branch();
            emit_arm(false_label, on_false, ctx, w);
            w.close();
        }
    }
}

fn emit_arm(label: &str, block: &Block, ctx: &mut EmitContext<'_, '_>, w: &mut CodeWriter) {
    if ctx.options.emit_comments {
        w.comment(label);
    }
    emit_block(block, ctx, w);
}

fn emit_fan(
    node_id: &str,
    branches: &[FanArm],
    merge: MergeStrategy,
    ctx: &mut EmitContext<'_, '_>,
    w: &mut CodeWriter,
) {
    if let Some(node) = ctx.v.node(node_id) {
        emit_header(node, ctx, w);
    }
    let combinator = match merge {
        MergeStrategy::All => "Promise.all",
        MergeStrategy::First => "Promise.race",
    };

    // Arms whose nodes all run elsewhere are left out of the merge.
    let running: Vec<&FanArm> = branches
        .iter()
        .filter(|arm| !arm.block.owned_nodes().is_empty())
        .collect();
    if running.is_empty() {
        let empty = match merge {
            MergeStrategy::All => "[]",
            MergeStrategy::First => "undefined",
        };
        w.line(&format!("{} = {{ output: {} }};", ctx.var(node_id), empty));
        return;
    }

    w.open_raw(&format!("{} = {{", ctx.var(node_id)));
    w.open_raw(&format!("output: await {}([", combinator));
    for arm in running {
        w.open_raw("(async () => {");
        if ctx.options.emit_comments {
            w.comment(&format!("slot: {}", arm.slot));
        }
        emit_block(&arm.block, ctx, w);
        if let Some(tail) = arm.block.tail() {
            w.line(&format!("return {};", ctx.var(tail)));
        }
        w.close_with("})(),");
    }
    w.close_with("]),");
    w.close_with("};");
}

fn emit_loop(
    node_id: &str,
    body: &Block,
    max_iterations: u32,
    stop_condition: &str,
    ctx: &mut EmitContext<'_, '_>,
    w: &mut CodeWriter,
) {
    if let Some(node) = ctx.v.node(node_id) {
        emit_header(node, ctx, w);
    }
    let var = ctx.var(node_id);
    let ancestors = ctx.ancestors(node_id);
    let resolver = TemplateResolver::new(node_id, &ancestors, ctx.names);

    w.line(&format!("{} = {{ output: undefined, iterations: 0 }};", var));
    w.open(&format!("for (let i = 0; i < {}; i++)", max_iterations));
    emit_block(body, ctx, w);
    w.line(&format!("{}.iterations = i + 1;", var));
    if let Some(tail) = body.tail() {
        w.line(&format!("{}.output = {};", var, ctx.var(tail)));
    }
    if !stop_condition.trim().is_empty() {
        let stop = ctx.keep(resolver.resolve(stop_condition));
        w.open(&format!("if ({})", emit_expression(&stop)));
        w.line("break;");
        w.close();
    }
    w.close();
}
