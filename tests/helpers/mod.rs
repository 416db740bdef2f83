#![allow(dead_code)]

use std::collections::BTreeSet;

use serde_json::{Value, json};
use workflow_compiler::{CompileOptions, Workflow, WorkflowEdge, WorkflowNode};

// =============================================================================
// Node builders
// =============================================================================

pub fn node(value: Value) -> WorkflowNode {
    serde_json::from_value(value).expect("node JSON should deserialize")
}

pub fn trigger(id: &str) -> WorkflowNode {
    node(json!({ "id": id, "kind": "trigger", "data": { "label": "Start" } }))
}

pub fn agent(id: &str, prompt: &str) -> WorkflowNode {
    node(json!({ "id": id, "kind": "agent", "data": { "prompt": prompt } }))
}

/// Agent declaring the given output fields.
pub fn agent_with_fields(id: &str, prompt: &str, fields: &[&str]) -> WorkflowNode {
    let fields: Vec<Value> = fields.iter().map(|f| json!({ "name": f })).collect();
    node(json!({
        "id": id,
        "kind": "agent",
        "data": { "prompt": prompt, "outputFields": fields }
    }))
}

pub fn tool_call(id: &str, tool: &str, arguments: &[(&str, &str)]) -> WorkflowNode {
    let arguments: serde_json::Map<String, Value> = arguments
        .iter()
        .map(|(k, v)| (k.to_string(), json!(v)))
        .collect();
    node(json!({
        "id": id,
        "kind": "toolCall",
        "data": { "tool": tool, "arguments": arguments }
    }))
}

pub fn condition(id: &str, expression: &str) -> WorkflowNode {
    node(json!({ "id": id, "kind": "condition", "data": { "expression": expression } }))
}

pub fn parallel(id: &str, merge_strategy: &str) -> WorkflowNode {
    node(json!({
        "id": id,
        "kind": "parallel",
        "data": { "mergeStrategy": merge_strategy }
    }))
}

pub fn feedback_loop(id: &str, max_iterations: u32, stop_condition: &str) -> WorkflowNode {
    node(json!({
        "id": id,
        "kind": "feedbackLoop",
        "data": { "maxIterations": max_iterations, "stopCondition": stop_condition }
    }))
}

pub fn retrieval(id: &str, source: &str, query: &str) -> WorkflowNode {
    node(json!({
        "id": id,
        "kind": "retrieval",
        "data": { "source": source, "query": query }
    }))
}

pub fn team(id: &str, task: &str, members: &[&str]) -> WorkflowNode {
    let members: Vec<Value> = members.iter().map(|m| json!({ "name": m })).collect();
    node(json!({
        "id": id,
        "kind": "multiAgentTeam",
        "data": { "strategy": "round_robin", "task": task, "members": members }
    }))
}

// =============================================================================
// Edge builders
// =============================================================================

pub fn edge(id: &str, source: &str, target: &str) -> WorkflowEdge {
    serde_json::from_value(json!({
        "id": id,
        "sourceNodeId": source,
        "targetNodeId": target
    }))
    .expect("edge JSON should deserialize")
}

/// Condition edge carrying `branchLabel` `"true"` or `"false"`.
pub fn labeled(id: &str, source: &str, target: &str, label: &str) -> WorkflowEdge {
    serde_json::from_value(json!({
        "id": id,
        "sourceNodeId": source,
        "targetNodeId": target,
        "branchLabel": label
    }))
    .expect("edge JSON should deserialize")
}

/// Parallel edge carrying an `outputSlot`.
pub fn slot(id: &str, source: &str, target: &str, slot: &str) -> WorkflowEdge {
    serde_json::from_value(json!({
        "id": id,
        "sourceNodeId": source,
        "targetNodeId": target,
        "outputSlot": slot
    }))
    .expect("edge JSON should deserialize")
}

pub fn workflow(nodes: Vec<WorkflowNode>, edges: Vec<WorkflowEdge>) -> Workflow {
    Workflow { nodes, edges }
}

// =============================================================================
// Canonical graphs
// =============================================================================

/// trigger → n1 → n2 → n3 → n4, every agent declaring a single field.
pub fn chain() -> Workflow {
    workflow(
        vec![
            trigger("t"),
            agent_with_fields("n1", "{{input}}", &["a"]),
            agent_with_fields("n2", "{{n1.a}}", &["b"]),
            agent_with_fields("n3", "{{n2.b}}", &["c"]),
            agent_with_fields("n4", "{{n3.c}}", &["d"]),
        ],
        vec![
            edge("e0", "t", "n1"),
            edge("e1", "n1", "n2"),
            edge("e2", "n2", "n3"),
            edge("e3", "n3", "n4"),
        ],
    )
}

/// trigger → c1 with a true arm and a false arm that both end the workflow.
pub fn branching() -> Workflow {
    workflow(
        vec![
            trigger("t"),
            condition("c1", "{{input.score}} > 0.5"),
            agent("a_yes", "Celebrate {{input}}"),
            agent("a_no", "Console {{input}}"),
        ],
        vec![
            edge("e1", "t", "c1"),
            labeled("e2", "c1", "a_yes", "true"),
            labeled("e3", "c1", "a_no", "false"),
        ],
    )
}

/// trigger → p1 fans out to A and B, which merge into M.
pub fn fan_out() -> Workflow {
    workflow(
        vec![
            trigger("t"),
            parallel("p1", "all"),
            agent("A", "Research {{input}}"),
            agent("B", "Critique {{input}}"),
            agent("M", "Merge {{A}} with {{B}}"),
        ],
        vec![
            edge("e1", "t", "p1"),
            slot("e2", "p1", "A", "research"),
            slot("e3", "p1", "B", "review"),
            edge("e4", "A", "M"),
            edge("e5", "B", "M"),
        ],
    )
}

/// trigger → L1 → worker → L1 (back-edge), L1 → done on exit.
pub fn refine_loop() -> Workflow {
    workflow(
        vec![
            trigger("t"),
            feedback_loop("L1", 3, "{{worker}} == \"ok\""),
            agent("worker", "Improve {{input}}"),
            agent("done", "Report {{worker}}"),
        ],
        vec![
            edge("e1", "t", "L1"),
            edge("e2", "L1", "worker"),
            edge("e3", "worker", "L1"),
            edge("e4", "L1", "done"),
        ],
    )
}

/// trigger → writer → review, where the feedback loop `review` sends the
/// draft back to writer and exits to done.
pub fn draft_review_loop() -> Workflow {
    workflow(
        vec![
            trigger("t"),
            agent("writer", "Draft {{input}}"),
            feedback_loop("review", 3, "{{writer}} == \"ok\""),
            agent("done", "Publish {{writer}}"),
        ],
        vec![
            edge("e1", "t", "writer"),
            edge("e2", "writer", "review"),
            edge("e3", "review", "writer"),
            edge("e4", "review", "done"),
        ],
    )
}

// =============================================================================
// Output inspection
// =============================================================================

/// Number of statements assigning `var` as a whole (`var = ...`).
pub fn call_sites(code: &str, var: &str) -> usize {
    let needle = format!("{} = ", var);
    code.lines()
        .filter(|line| line.trim_start().starts_with(&needle))
        .count()
}

/// Byte offset of `needle` in `code`, panicking with the program on a miss.
pub fn position(code: &str, needle: &str) -> usize {
    code.find(needle)
        .unwrap_or_else(|| panic!("`{}` not found in:\n{}", needle, code))
}

pub fn quiet() -> CompileOptions {
    CompileOptions {
        emit_comments: false,
        ..CompileOptions::default()
    }
}

pub fn load_fixture(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("cannot read {}: {}", path, e))
}

/// Text of every arm closure, grouped by the `Promise.all`/`Promise.race`
/// call holding them.
pub fn fan_closures(code: &str) -> Vec<Vec<String>> {
    let lines: Vec<&str> = code.lines().collect();
    let indent = |line: &str| line.len() - line.trim_start().len();
    let mut groups = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        if !line.trim_start().starts_with("output: await Promise.") {
            continue;
        }
        let depth = indent(line);
        let mut arms = Vec::new();
        let mut current: Option<Vec<&str>> = None;
        for &l in &lines[i + 1..] {
            let at_arm = indent(l) == depth + 2;
            match l.trim() {
                "])," if indent(l) == depth => break,
                "(async () => {" if at_arm => current = Some(Vec::new()),
                "})()," if at_arm => arms.extend(current.take().map(|body| body.join("\n"))),
                _ => {
                    if let Some(body) = current.as_mut() {
                        body.push(l);
                    }
                }
            }
        }
        groups.push(arms);
    }
    groups
}

/// Every `step_*` identifier mentioned in `text`.
pub fn step_refs(text: &str) -> BTreeSet<String> {
    let is_ident = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '$';
    let mut refs = BTreeSet::new();
    let mut rest = text;
    let mut prev: Option<char> = None;
    while let Some(at) = rest.find("step_") {
        let before = if at == 0 { prev } else { rest[..at].chars().last() };
        let tail = &rest[at..];
        let len = tail.find(|c: char| !is_ident(c)).unwrap_or(tail.len());
        if !before.is_some_and(is_ident) {
            refs.insert(tail[..len].to_string());
        }
        prev = tail[..len].chars().last();
        rest = &tail[len..];
    }
    refs
}

/// Bindings assigned inside one arm closure and mentioned by a sibling arm
/// of the same fan, as `"<binding> in arm <n>"`.
pub fn sibling_reads(code: &str) -> Vec<String> {
    let mut found = Vec::new();
    for arms in fan_closures(code) {
        for (i, arm) in arms.iter().enumerate() {
            let assigned: BTreeSet<String> = arm
                .lines()
                .filter_map(|l| l.trim_start().split_once(" = "))
                .map(|(lhs, _)| lhs.to_string())
                .filter(|lhs| step_refs(lhs).contains(lhs))
                .collect();
            for (j, sibling) in arms.iter().enumerate() {
                if i == j {
                    continue;
                }
                for name in step_refs(sibling).intersection(&assigned) {
                    found.push(format!("{} in arm {}", name, j));
                }
            }
        }
    }
    found
}
