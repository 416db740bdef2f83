//! Per-kind TypeScript emission for nodes that call into the runtime.
//!
//! Each function writes exactly one `step_<id> = ...` assignment.
//! Condition/Parallel/FeedbackLoop control flow is handled in `handler.rs`.

use super::EmitContext;
use super::value_expr::{emit_string, object_key, string_array, string_literal};
use super::writer::CodeWriter;
use crate::parse::types::*;
use crate::resolve::template::TemplateResolver;

/// `// label [kind] (id)` above a node's statements.
pub fn emit_header(node: &WorkflowNode, ctx: &EmitContext<'_, '_>, w: &mut CodeWriter) {
    if !ctx.options.emit_comments {
        return;
    }
    let label = node.label().replace(['\n', '\r'], " ");
    if label == node.id() {
        w.comment(&format!("{} [{}]", label, node.kind()));
    } else {
        w.comment(&format!("{} [{}] ({})", label, node.kind(), node.id()));
    }
}

/// Emit the assignment for a node that is not a control-flow construct.
pub fn emit_node(node: &WorkflowNode, ctx: &mut EmitContext<'_, '_>, w: &mut CodeWriter) {
    match node {
        WorkflowNode::Trigger(n) => super::trigger::emit_trigger(n, ctx, w),
        WorkflowNode::Agent(n) => emit_agent(n, ctx, w),
        WorkflowNode::ToolCall(n) => emit_tool_call(n, ctx, w),
        WorkflowNode::Retrieval(n) => emit_retrieval(n, ctx, w),
        WorkflowNode::MultiAgentTeam(n) => emit_team(n, ctx, w),
        WorkflowNode::Condition(_) | WorkflowNode::Parallel(_) | WorkflowNode::FeedbackLoop(_) => {
            w.line(&format!("{} = {{ output: undefined }};", ctx.var(node.id())));
        }
    }
}

fn emit_agent(n: &NodeBase<AgentConfig>, ctx: &mut EmitContext<'_, '_>, w: &mut CodeWriter) {
    let cfg = &n.data.config;
    let ancestors = ctx.ancestors(&n.id);
    let resolver = TemplateResolver::new(&n.id, &ancestors, ctx.names);

    w.open_raw(&format!("{} = await runtime.runAgent({{", ctx.var(&n.id)));
    w.line(&format!("nodeId: {},", string_literal(&n.id)));
    if let Some(model) = &cfg.model {
        w.line(&format!("model: {},", string_literal(model)));
    }
    if let Some(system) = &cfg.system_prompt {
        let system = ctx.keep(resolver.resolve(system));
        w.line(&format!("systemPrompt: {},", emit_string(&system)));
    }
    let prompt = ctx.keep(resolver.resolve(&cfg.prompt));
    w.line(&format!("prompt: {},", emit_string(&prompt)));
    if !cfg.tools.is_empty() {
        w.line(&format!("tools: {},", string_array(&cfg.tools)));
    }
    if let Some(t) = cfg.temperature {
        w.line(&format!("temperature: {},", t));
    }
    if let Some(max) = cfg.max_tokens {
        w.line(&format!("maxTokens: {},", max));
    }
    emit_output_fields(cfg.output_fields.as_deref(), w);
    w.close_with("});");
}

fn emit_tool_call(n: &NodeBase<ToolCallConfig>, ctx: &mut EmitContext<'_, '_>, w: &mut CodeWriter) {
    let cfg = &n.data.config;
    let ancestors = ctx.ancestors(&n.id);
    let resolver = TemplateResolver::new(&n.id, &ancestors, ctx.names);

    w.open_raw(&format!("{} = await runtime.callTool({{", ctx.var(&n.id)));
    w.line(&format!("nodeId: {},", string_literal(&n.id)));
    w.line(&format!("tool: {},", string_literal(&cfg.tool)));
    if cfg.arguments.is_empty() {
        w.line("arguments: {},");
    } else {
        w.open("arguments:");
        for (name, template) in &cfg.arguments {
            let value = ctx.keep(resolver.resolve(template));
            w.line(&format!("{}: {},", object_key(name), emit_string(&value)));
        }
        w.close_with("},");
    }
    emit_output_fields(cfg.output_fields.as_deref(), w);
    w.close_with("});");
}

fn emit_retrieval(n: &NodeBase<RetrievalConfig>, ctx: &mut EmitContext<'_, '_>, w: &mut CodeWriter) {
    let cfg = &n.data.config;
    let ancestors = ctx.ancestors(&n.id);
    let resolver = TemplateResolver::new(&n.id, &ancestors, ctx.names);

    w.open_raw(&format!("{} = await runtime.retrieve({{", ctx.var(&n.id)));
    w.line(&format!("nodeId: {},", string_literal(&n.id)));
    w.line(&format!("source: {},", string_literal(&cfg.source)));
    let query = ctx.keep(resolver.resolve(&cfg.query));
    w.line(&format!("query: {},", emit_string(&query)));
    if let Some(k) = cfg.top_k {
        w.line(&format!("topK: {},", k));
    }
    emit_output_fields(cfg.output_fields.as_deref(), w);
    w.close_with("});");
}

/// The whole team is a single runtime call; members are configuration,
/// not separately scheduled steps.
fn emit_team(n: &NodeBase<MultiAgentTeamConfig>, ctx: &mut EmitContext<'_, '_>, w: &mut CodeWriter) {
    let cfg = &n.data.config;
    let ancestors = ctx.ancestors(&n.id);
    let resolver = TemplateResolver::new(&n.id, &ancestors, ctx.names);

    w.open_raw(&format!("{} = await runtime.runTeam({{", ctx.var(&n.id)));
    w.line(&format!("nodeId: {},", string_literal(&n.id)));
    w.line(&format!("strategy: {},", string_literal(cfg.strategy.as_str())));
    let task = ctx.keep(resolver.resolve(&cfg.task));
    w.line(&format!("task: {},", emit_string(&task)));
    w.open_raw("members: [");
    for member in &cfg.members {
        let mut props = vec![format!("name: {}", string_literal(&member.name))];
        if let Some(role) = &member.role {
            props.push(format!("role: {}", string_literal(role)));
        }
        if let Some(model) = &member.model {
            props.push(format!("model: {}", string_literal(model)));
        }
        if let Some(instructions) = &member.instructions {
            let instructions = ctx.keep(resolver.resolve(instructions));
            props.push(format!("instructions: {}", emit_string(&instructions)));
        }
        w.line(&format!("{{ {} }},", props.join(", ")));
    }
    w.close_with("],");
    if let Some(rounds) = cfg.max_rounds {
        w.line(&format!("maxRounds: {},", rounds));
    }
    emit_output_fields(cfg.output_fields.as_deref(), w);
    w.close_with("});");
}

fn emit_output_fields(fields: Option<&[OutputField]>, w: &mut CodeWriter) {
    let Some(fields) = fields.filter(|f| !f.is_empty()) else {
        return;
    };
    let names: Vec<String> = fields.iter().map(|f| f.name.clone()).collect();
    w.line(&format!("outputFields: {},", string_array(&names)));
}
