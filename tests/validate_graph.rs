mod helpers;

use helpers::*;
use workflow_compiler::validate::validate;
use workflow_compiler::{Diagnostic, Severity, compile};

fn codes(diagnostics: &[Diagnostic]) -> Vec<&str> {
    diagnostics.iter().map(|d| d.code.as_str()).collect()
}

fn errors_of(wf: &workflow_compiler::Workflow) -> Vec<Diagnostic> {
    match validate(wf) {
        Ok(v) => panic!("expected validation to fail, warnings: {:?}", v.warnings),
        Err(diagnostics) => diagnostics,
    }
}

#[test]
fn canonical_graphs_are_valid() {
    for wf in [chain(), branching(), fan_out(), refine_loop()] {
        let validated = validate(&wf).expect("graph should validate");
        assert!(validated.warnings.is_empty(), "{:?}", validated.warnings);
    }
}

#[test]
fn accidental_cycle_is_rejected_with_edge_id() {
    let wf = workflow(
        vec![trigger("t"), agent("A", "a"), agent("B", "b")],
        vec![edge("e1", "t", "A"), edge("e2", "A", "B"), edge("e3", "B", "A")],
    );
    let errors = errors_of(&wf);
    assert_eq!(codes(&errors), vec!["V004"]);
    assert_eq!(errors[0].edge_id.as_deref(), Some("e3"));
    assert_eq!(errors[0].node_id.as_deref(), Some("A"));

    let out = compile(wf.nodes.clone(), wf.edges.clone());
    assert!(out.code.is_empty());
    assert!(out.has_errors());
    assert!(out.diagnostics.iter().any(|d| d.code == "V004"));
}

#[test]
fn cycle_through_feedback_loop_is_allowed() {
    let wf = refine_loop();
    let validated = validate(&wf).unwrap();
    let info = validated.loops.get("L1").expect("L1 is a loop head");
    assert_eq!(info.body_entry, "worker");
    assert!(info.body.contains("worker"));
    assert_eq!(info.back_edges, vec!["e3".to_string()]);
    assert_eq!(validated.loops.back_edge_count(), 1);
}

#[test]
fn trigger_count_must_be_one() {
    let none = workflow(vec![agent("a", "hi")], vec![]);
    assert!(codes(&errors_of(&none)).contains(&"V001"));

    let two = workflow(
        vec![trigger("t1"), trigger("t2"), agent("a", "hi")],
        vec![edge("e1", "t1", "a"), edge("e2", "t2", "a")],
    );
    assert!(codes(&errors_of(&two)).contains(&"V001"));
}

#[test]
fn dangling_edge_is_reported() {
    let wf = workflow(
        vec![trigger("t"), agent("a", "hi")],
        vec![edge("e1", "t", "a"), edge("e2", "a", "ghost")],
    );
    let errors = errors_of(&wf);
    let v002 = errors.iter().find(|d| d.code == "V002").expect("V002");
    assert_eq!(v002.edge_id.as_deref(), Some("e2"));
}

#[test]
fn duplicate_ids_are_reported() {
    let wf = workflow(
        vec![trigger("t"), agent("a", "hi"), agent("a", "again")],
        vec![edge("e1", "t", "a"), edge("e1", "t", "a")],
    );
    let found = codes(&errors_of(&wf)).join(",");
    assert!(found.contains("V003"), "{}", found);
    assert!(found.contains("V011"), "{}", found);
}

#[test]
fn unreachable_node_is_reported() {
    let wf = workflow(
        vec![trigger("t"), agent("a", "hi"), agent("island", "alone")],
        vec![edge("e1", "t", "a")],
    );
    let errors = errors_of(&wf);
    assert_eq!(codes(&errors), vec!["V005"]);
    assert_eq!(errors[0].node_id.as_deref(), Some("island"));
}

#[test]
fn trigger_with_incoming_edge_is_reported() {
    let wf = workflow(
        vec![trigger("t"), feedback_loop("L", 2, "true"), agent("a", "hi")],
        vec![edge("e1", "t", "L"), edge("e2", "L", "a"), edge("e3", "a", "t")],
    );
    assert!(codes(&errors_of(&wf)).contains(&"V006"));
}

#[test]
fn condition_needs_both_branches() {
    let wf = workflow(
        vec![trigger("t"), condition("c", "{{input}}"), agent("a", "hi")],
        vec![edge("e1", "t", "c"), labeled("e2", "c", "a", "true")],
    );
    let errors = errors_of(&wf);
    assert_eq!(codes(&errors), vec!["V008"]);
    assert_eq!(errors[0].node_id.as_deref(), Some("c"));
}

#[test]
fn condition_edges_need_labels() {
    let wf = workflow(
        vec![trigger("t"), condition("c", "{{input}}"), agent("a", "x"), agent("b", "y")],
        vec![
            edge("e1", "t", "c"),
            labeled("e2", "c", "a", "true"),
            edge("e3", "c", "b"),
        ],
    );
    assert_eq!(codes(&errors_of(&wf)), vec!["V008"]);
}

#[test]
fn parallel_needs_distinct_slots() {
    let wf = workflow(
        vec![trigger("t"), parallel("p", "all"), agent("a", "x"), agent("b", "y")],
        vec![
            edge("e1", "t", "p"),
            slot("e2", "p", "a", "same"),
            slot("e3", "p", "b", "same"),
        ],
    );
    let errors = errors_of(&wf);
    assert_eq!(codes(&errors), vec!["V009"]);
    assert_eq!(errors[0].edge_id.as_deref(), Some("e3"));
}

#[test]
fn parallel_with_one_arm_is_rejected() {
    let wf = workflow(
        vec![trigger("t"), parallel("p", "all"), agent("a", "x")],
        vec![edge("e1", "t", "p"), slot("e2", "p", "a", "only")],
    );
    assert_eq!(codes(&errors_of(&wf)), vec!["V009"]);
}

#[test]
fn self_loop_is_rejected() {
    let wf = workflow(
        vec![trigger("t"), agent("a", "x")],
        vec![edge("e1", "t", "a"), edge("e2", "a", "a")],
    );
    let errors = errors_of(&wf);
    assert!(codes(&errors).contains(&"V010"));
    assert!(!codes(&errors).contains(&"V004"));
}

#[test]
fn feedback_loop_without_back_edge_is_rejected() {
    let wf = workflow(
        vec![trigger("t"), feedback_loop("L", 2, "true"), agent("a", "x")],
        vec![edge("e1", "t", "L"), edge("e2", "L", "a")],
    );
    let errors = errors_of(&wf);
    assert_eq!(codes(&errors), vec!["V012"]);
    assert_eq!(errors[0].node_id.as_deref(), Some("L"));
}

#[test]
fn loop_body_entered_from_outside_is_rejected() {
    // `side` jumps straight into the body of L, bypassing the loop node.
    let wf = workflow(
        vec![
            trigger("t"),
            feedback_loop("L", 2, "true"),
            agent("w", "x"),
            agent("side", "y"),
        ],
        vec![
            edge("e1", "t", "L"),
            edge("e2", "L", "w"),
            edge("e3", "w", "L"),
            edge("e4", "t", "side"),
            edge("e5", "side", "w"),
        ],
    );
    let errors = errors_of(&wf);
    assert!(codes(&errors).contains(&"V013"), "{:?}", errors);
}

#[test]
fn node_config_problems_only_warn() {
    let bad_agent = node(serde_json::json!({
        "id": "a", "kind": "agent", "data": { "prompt": "hi", "temperature": 3.5 }
    }));
    let zero_loop = feedback_loop("L", 0, "true");
    let wf = workflow(
        vec![trigger("t"), bad_agent, zero_loop, agent("w", "x")],
        vec![
            edge("e1", "t", "a"),
            edge("e2", "a", "L"),
            edge("e3", "L", "w"),
            edge("e4", "w", "L"),
        ],
    );
    let validated = validate(&wf).expect("config problems do not fail validation");
    let found = codes(&validated.warnings);
    assert!(found.contains(&"N002"), "{:?}", found);
    assert!(found.contains(&"N005"), "{:?}", found);
    assert!(validated.warnings.iter().all(|d| d.severity == Severity::Warning));
}

#[test]
fn empty_tool_name_still_compiles() {
    let out = compile(
        vec![trigger("t"), tool_call("x", "", &[("q", "{{input}}")])],
        vec![edge("e1", "t", "x")],
    );
    assert!(!out.has_errors(), "{:?}", out.diagnostics);
    assert!(out.code.contains("step_x = await runtime.callTool({"));
    let warning = out.diagnostics.iter().find(|d| d.code == "N003").expect("N003");
    assert_eq!(warning.severity, Severity::Warning);
    assert_eq!(warning.node_id.as_deref(), Some("x"));
}

#[test]
fn cycle_entered_ahead_of_its_loop_node_is_allowed() {
    // writer runs first, then review decides whether to go round again.
    let wf = workflow(
        vec![
            trigger("t"),
            agent("writer", "Draft {{input}}"),
            feedback_loop("review", 3, "{{writer}} == \"ok\""),
            agent("done", "{{writer}}"),
        ],
        vec![
            edge("e1", "t", "writer"),
            edge("e2", "writer", "review"),
            edge("e3", "review", "writer"),
            edge("e4", "review", "done"),
        ],
    );
    let validated = validate(&wf).expect("guarded cycle should validate");
    assert!(validated.warnings.is_empty(), "{:?}", validated.warnings);

    let info = validated.loops.get("review").expect("review heads the loop");
    assert_eq!(info.entry, "writer");
    assert_eq!(info.body_entry, "writer");
    assert_eq!(info.body.iter().map(String::as_str).collect::<Vec<_>>(), vec!["writer"]);
    assert_eq!(info.back_edges, vec!["e3".to_string()]);
    assert_eq!(validated.loops.back_edge_count(), 1);
}

#[test]
fn loop_node_detour_back_to_entry_is_rejected() {
    let wf = workflow(
        vec![
            trigger("t"),
            agent("writer", "x"),
            feedback_loop("review", 3, "true"),
            agent("fix", "y"),
        ],
        vec![
            edge("e1", "t", "writer"),
            edge("e2", "writer", "review"),
            edge("e3", "review", "fix"),
            edge("e4", "fix", "writer"),
        ],
    );
    let errors = errors_of(&wf);
    assert!(codes(&errors).contains(&"V012"), "{:?}", errors);
    assert!(!codes(&errors).contains(&"V004"), "{:?}", errors);
}

#[test]
fn stray_annotations_only_warn() {
    let wf = workflow(
        vec![trigger("t"), agent("a", "x")],
        vec![labeled("e1", "t", "a", "true")],
    );
    let validated = validate(&wf).expect("warnings do not fail validation");
    assert_eq!(codes(&validated.warnings), vec!["V014"]);
    assert_eq!(validated.warnings[0].severity, Severity::Warning);

    let out = compile(wf.nodes.clone(), wf.edges.clone());
    assert!(!out.code.is_empty());
    assert!(!out.has_errors());
}

#[test]
fn every_violation_is_reported_at_once() {
    let wf = workflow(
        vec![agent("a", "x"), condition("c", "{{input}}")],
        vec![edge("e1", "a", "c"), edge("e2", "c", "c")],
    );
    let errs = errors_of(&wf);
    let found = codes(&errs);
    for expected in ["V001", "V008", "V010"] {
        assert!(found.contains(&expected), "missing {} in {:?}", expected, found);
    }
}
