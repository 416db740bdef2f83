//! Per-node configuration validation (N001–N009).
//! Match arms here must track `WorkflowNode` in `parse/types.rs`.

use std::collections::HashSet;

use crate::error::Diagnostic;
use crate::parse::types::*;

/// Validate a single node's config. Returns all problems found.
///
/// Every finding here is a warning: a misconfigured node still has a
/// well-defined emission, so only graph shape can block compilation.
pub fn validate_node_config(node: &WorkflowNode) -> Vec<Diagnostic> {
    let mut errors = Vec::new();
    let node_id = Some(node.id().to_string());

    match node {
        WorkflowNode::Trigger(n) => {
            let schedule_missing = n
                .data
                .config
                .schedule
                .as_deref()
                .is_none_or(|s| s.trim().is_empty());
            if n.data.config.trigger_type == TriggerType::Schedule && schedule_missing {
                errors.push(Diagnostic::validate_warning(
                    "N001",
                    "Schedule trigger must define a schedule",
                    node_id.clone(),
                ));
            }
        }
        WorkflowNode::Agent(n) => {
            if n.data.config.prompt.trim().is_empty() {
                errors.push(Diagnostic::validate_warning(
                    "N002",
                    "Agent prompt is empty; the agent will only see its system prompt",
                    node_id.clone(),
                ));
            }
            if let Some(t) = n.data.config.temperature {
                if !(0.0..=2.0).contains(&t) {
                    errors.push(Diagnostic::validate_warning(
                        "N002",
                        format!("Agent temperature {} is outside 0.0..=2.0", t),
                        node_id.clone(),
                    ));
                }
            }
        }
        WorkflowNode::ToolCall(n) => {
            if n.data.config.tool.trim().is_empty() {
                errors.push(Diagnostic::validate_warning(
                    "N003",
                    "Tool call must name a tool",
                    node_id.clone(),
                ));
            }
        }
        WorkflowNode::Condition(n) => {
            if n.data.config.expression.trim().is_empty() {
                errors.push(Diagnostic::validate_warning(
                    "N004",
                    "Condition expression must not be empty",
                    node_id.clone(),
                ));
            }
        }
        WorkflowNode::Parallel(_) => {}
        WorkflowNode::FeedbackLoop(n) => {
            if n.data.config.max_iterations < 1 {
                errors.push(Diagnostic::validate_warning(
                    "N005",
                    "Feedback loop maxIterations must be at least 1",
                    node_id.clone(),
                ));
            }
            if n.data.config.stop_condition.trim().is_empty() {
                errors.push(Diagnostic::validate_warning(
                    "N006",
                    format!(
                        "Feedback loop has no stop condition; it always runs {} iteration(s)",
                        n.data.config.max_iterations
                    ),
                    node_id.clone(),
                ));
            }
        }
        WorkflowNode::Retrieval(n) => {
            if n.data.config.source.trim().is_empty() {
                errors.push(Diagnostic::validate_warning(
                    "N007",
                    "Retrieval source must not be empty",
                    node_id.clone(),
                ));
            }
            if n.data.config.query.trim().is_empty() {
                errors.push(Diagnostic::validate_warning(
                    "N007",
                    "Retrieval query must not be empty",
                    node_id.clone(),
                ));
            }
        }
        WorkflowNode::MultiAgentTeam(n) => {
            let members = &n.data.config.members;
            if members.is_empty() {
                errors.push(Diagnostic::validate_warning(
                    "N008",
                    "Multi-agent team must have at least one member",
                    node_id.clone(),
                ));
            }
            let mut names = HashSet::new();
            for member in members {
                if member.name.trim().is_empty() {
                    errors.push(Diagnostic::validate_warning(
                        "N008",
                        "Team member name must not be empty",
                        node_id.clone(),
                    ));
                } else if !names.insert(member.name.as_str()) {
                    errors.push(Diagnostic::validate_warning(
                        "N008",
                        format!("Duplicate team member '{}'", member.name),
                        node_id.clone(),
                    ));
                }
            }
        }
    }

    if let Some(fields) = node.output_fields() {
        let mut seen = HashSet::new();
        for field in fields {
            if field.name.trim().is_empty() || !seen.insert(field.name.as_str()) {
                errors.push(Diagnostic::validate_warning(
                    "N009",
                    format!("Output field name '{}' is empty or repeated", field.name),
                    node_id.clone(),
                ));
            }
        }
    }

    errors
}
