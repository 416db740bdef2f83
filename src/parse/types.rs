//! Rust types for the editor's workflow snapshot.
//!
//! These are the serde target for the canvas JSON. Every node kind carries
//! its own closed config so per-kind dispatch in validate/plan/codegen is
//! exhaustive.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::CompileOptions;

// =============================================================================
// TOP-LEVEL REQUEST
// =============================================================================

/// The immutable graph snapshot handed to the compiler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    #[serde(default)]
    pub nodes: Vec<WorkflowNode>,
    #[serde(default)]
    pub edges: Vec<WorkflowEdge>,
}

/// A compile request as sent by the editor: the snapshot plus options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileRequest {
    #[serde(flatten)]
    pub workflow: Workflow,
    #[serde(default)]
    pub options: CompileOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchLabel {
    True,
    False,
}

impl BranchLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            BranchLabel::True => "true",
            BranchLabel::False => "false",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowEdge {
    pub id: String,
    #[serde(alias = "source")]
    pub source_node_id: String,
    #[serde(alias = "target")]
    pub target_node_id: String,
    #[serde(default)]
    pub branch_label: Option<BranchLabel>,
    #[serde(default)]
    pub output_slot: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

// =============================================================================
// NODE BASE
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeData<C> {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(flatten)]
    pub config: C,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeBase<C> {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    pub data: NodeData<C>,
}

/// What a node exposes to downstream `{{nodeId.field}}` references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputField {
    pub name: String,
    #[serde(rename = "type", default = "default_field_type")]
    pub field_type: String,
}

fn default_field_type() -> String {
    "string".into()
}

// =============================================================================
// WORKFLOW NODE: tagged union over the 8 block kinds
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum WorkflowNode {
    Trigger(NodeBase<TriggerConfig>),
    Agent(NodeBase<AgentConfig>),
    ToolCall(NodeBase<ToolCallConfig>),
    Condition(NodeBase<ConditionConfig>),
    Parallel(NodeBase<ParallelConfig>),
    FeedbackLoop(NodeBase<FeedbackLoopConfig>),
    Retrieval(NodeBase<RetrievalConfig>),
    MultiAgentTeam(NodeBase<MultiAgentTeamConfig>),
}

/// Fieldless discriminant of [`WorkflowNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Trigger,
    Agent,
    ToolCall,
    Condition,
    Parallel,
    FeedbackLoop,
    Retrieval,
    MultiAgentTeam,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Trigger => "trigger",
            NodeKind::Agent => "agent",
            NodeKind::ToolCall => "toolCall",
            NodeKind::Condition => "condition",
            NodeKind::Parallel => "parallel",
            NodeKind::FeedbackLoop => "feedbackLoop",
            NodeKind::Retrieval => "retrieval",
            NodeKind::MultiAgentTeam => "multiAgentTeam",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl WorkflowNode {
    pub fn id(&self) -> &str {
        match self {
            WorkflowNode::Trigger(n) => &n.id,
            WorkflowNode::Agent(n) => &n.id,
            WorkflowNode::ToolCall(n) => &n.id,
            WorkflowNode::Condition(n) => &n.id,
            WorkflowNode::Parallel(n) => &n.id,
            WorkflowNode::FeedbackLoop(n) => &n.id,
            WorkflowNode::Retrieval(n) => &n.id,
            WorkflowNode::MultiAgentTeam(n) => &n.id,
        }
    }

    /// Display label, falling back to the node id.
    pub fn label(&self) -> &str {
        let label = match self {
            WorkflowNode::Trigger(n) => n.data.label.as_deref(),
            WorkflowNode::Agent(n) => n.data.label.as_deref(),
            WorkflowNode::ToolCall(n) => n.data.label.as_deref(),
            WorkflowNode::Condition(n) => n.data.label.as_deref(),
            WorkflowNode::Parallel(n) => n.data.label.as_deref(),
            WorkflowNode::FeedbackLoop(n) => n.data.label.as_deref(),
            WorkflowNode::Retrieval(n) => n.data.label.as_deref(),
            WorkflowNode::MultiAgentTeam(n) => n.data.label.as_deref(),
        };
        match label {
            Some(l) if !l.trim().is_empty() => l,
            _ => self.id(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            WorkflowNode::Trigger(_) => NodeKind::Trigger,
            WorkflowNode::Agent(_) => NodeKind::Agent,
            WorkflowNode::ToolCall(_) => NodeKind::ToolCall,
            WorkflowNode::Condition(_) => NodeKind::Condition,
            WorkflowNode::Parallel(_) => NodeKind::Parallel,
            WorkflowNode::FeedbackLoop(_) => NodeKind::FeedbackLoop,
            WorkflowNode::Retrieval(_) => NodeKind::Retrieval,
            WorkflowNode::MultiAgentTeam(_) => NodeKind::MultiAgentTeam,
        }
    }

    pub fn is_trigger(&self) -> bool {
        matches!(self, WorkflowNode::Trigger(_))
    }

    pub fn is_feedback_loop(&self) -> bool {
        matches!(self, WorkflowNode::FeedbackLoop(_))
    }

    /// Declared output fields, if the kind supports declaring them.
    pub fn output_fields(&self) -> Option<&[OutputField]> {
        let fields = match self {
            WorkflowNode::Agent(n) => n.data.config.output_fields.as_deref(),
            WorkflowNode::ToolCall(n) => n.data.config.output_fields.as_deref(),
            WorkflowNode::Retrieval(n) => n.data.config.output_fields.as_deref(),
            WorkflowNode::MultiAgentTeam(n) => n.data.config.output_fields.as_deref(),
            _ => None,
        };
        fields.filter(|f| !f.is_empty())
    }

    /// Names a downstream node may reference: the declared fields, or the
    /// generic `output` when nothing is declared.
    pub fn referenceable_fields(&self) -> Vec<String> {
        match self.output_fields() {
            Some(fields) => fields.iter().map(|f| f.name.clone()).collect(),
            None => vec!["output".to_string()],
        }
    }
}

// =============================================================================
// NODE CONFIGS
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerType {
    #[default]
    Manual,
    Webhook,
    Schedule,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerConfig {
    #[serde(default)]
    pub trigger_type: TriggerType,
    #[serde(default)]
    pub schedule: Option<String>,
    #[serde(default)]
    pub input_schema: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub output_fields: Option<Vec<OutputField>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallConfig {
    pub tool: String,
    /// Argument name → template string. Ordered so emission is stable.
    #[serde(default)]
    pub arguments: BTreeMap<String, String>,
    #[serde(default)]
    pub output_fields: Option<Vec<OutputField>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionConfig {
    pub expression: String,
    #[serde(default = "default_true_label")]
    pub true_label: String,
    #[serde(default = "default_false_label")]
    pub false_label: String,
}

fn default_true_label() -> String {
    "true".into()
}

fn default_false_label() -> String {
    "false".into()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    /// Await every arm, results collected in slot order.
    #[default]
    All,
    /// Race the arms; the first to settle wins.
    First,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParallelConfig {
    #[serde(default)]
    pub merge_strategy: MergeStrategy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackLoopConfig {
    pub max_iterations: u32,
    #[serde(default)]
    pub stop_condition: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalConfig {
    pub source: String,
    pub query: String,
    #[serde(default)]
    pub top_k: Option<u32>,
    #[serde(default)]
    pub output_fields: Option<Vec<OutputField>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamStrategy {
    #[default]
    Coordinator,
    RoundRobin,
    Debate,
    MapReduce,
}

impl TeamStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            TeamStrategy::Coordinator => "coordinator",
            TeamStrategy::RoundRobin => "round_robin",
            TeamStrategy::Debate => "debate",
            TeamStrategy::MapReduce => "map_reduce",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiAgentTeamConfig {
    #[serde(default)]
    pub strategy: TeamStrategy,
    #[serde(default)]
    pub task: String,
    #[serde(default)]
    pub members: Vec<TeamMember>,
    #[serde(default)]
    pub max_rounds: Option<u32>,
    #[serde(default)]
    pub output_fields: Option<Vec<OutputField>>,
}
