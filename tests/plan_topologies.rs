mod helpers;

use helpers::*;
use workflow_compiler::Workflow;
use workflow_compiler::ir::{Block, FanArm};
use workflow_compiler::plan::{PlanOutput, plan};
use workflow_compiler::validate::validate;

fn plan_of(wf: &Workflow) -> PlanOutput {
    let validated = validate(wf).expect("graph should validate");
    plan(&validated)
}

fn end() -> Block {
    Block::End
}

#[test]
fn linear_chain_is_a_sequence() {
    let out = plan_of(&chain());
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    assert_eq!(
        out.block,
        Block::seq(
            "t",
            Block::seq("n1", Block::seq("n2", Block::seq("n3", Block::seq("n4", end()))))
        )
    );
}

#[test]
fn condition_arms_end_without_join() {
    let out = plan_of(&branching());
    assert_eq!(
        out.block,
        Block::seq(
            "t",
            Block::Branch {
                node_id: "c1".into(),
                on_true: Box::new(Block::seq("a_yes", end())),
                on_false: Box::new(Block::seq("a_no", end())),
                then: Box::new(end()),
            }
        )
    );
}

#[test]
fn condition_arms_reconverge_once() {
    let wf = workflow(
        vec![
            trigger("t"),
            condition("c", "{{input.ok}}"),
            agent("yes", "x"),
            agent("no", "y"),
            agent("join", "z"),
        ],
        vec![
            edge("e1", "t", "c"),
            labeled("e2", "c", "yes", "true"),
            labeled("e3", "c", "no", "false"),
            edge("e4", "yes", "join"),
            edge("e5", "no", "join"),
        ],
    );
    let out = plan_of(&wf);
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    assert_eq!(
        out.block,
        Block::seq(
            "t",
            Block::Branch {
                node_id: "c".into(),
                on_true: Box::new(Block::seq("yes", end())),
                on_false: Box::new(Block::seq("no", end())),
                then: Box::new(Block::seq("join", end())),
            }
        )
    );
}

#[test]
fn condition_arm_may_go_straight_to_join() {
    let wf = workflow(
        vec![
            trigger("t"),
            condition("c", "{{input.ok}}"),
            agent("extra", "x"),
            agent("join", "z"),
        ],
        vec![
            edge("e1", "t", "c"),
            labeled("e2", "c", "extra", "true"),
            labeled("e3", "c", "join", "false"),
            edge("e4", "extra", "join"),
        ],
    );
    let out = plan_of(&wf);
    assert_eq!(
        out.block,
        Block::seq(
            "t",
            Block::Branch {
                node_id: "c".into(),
                on_true: Box::new(Block::seq("extra", end())),
                on_false: Box::new(end()),
                then: Box::new(Block::seq("join", end())),
            }
        )
    );
}

#[test]
fn parallel_arms_merge_before_join() {
    let out = plan_of(&fan_out());
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    assert_eq!(
        out.block,
        Block::seq(
            "t",
            Block::Fan {
                node_id: "p1".into(),
                branches: vec![
                    FanArm {
                        slot: "research".into(),
                        block: Block::seq("A", end()),
                    },
                    FanArm {
                        slot: "review".into(),
                        block: Block::seq("B", end()),
                    },
                ],
                merge_strategy: Default::default(),
                then: Box::new(Block::seq("M", end())),
            }
        )
    );
}

#[test]
fn fan_arms_are_ordered_by_slot() {
    let wf = workflow(
        vec![
            trigger("t"),
            parallel("p", "first"),
            agent("x", "1"),
            agent("y", "2"),
            agent("z", "3"),
        ],
        vec![
            edge("e1", "t", "p"),
            slot("e2", "p", "x", "c"),
            slot("e3", "p", "y", "a"),
            slot("e4", "p", "z", "b"),
        ],
    );
    let out = plan_of(&wf);
    let Block::Seq { next, .. } = &out.block else {
        panic!("expected trigger sequence, got {:?}", out.block);
    };
    let Block::Fan { branches, .. } = next.as_ref() else {
        panic!("expected fan, got {:?}", next);
    };
    let slots: Vec<&str> = branches.iter().map(|a| a.slot.as_str()).collect();
    assert_eq!(slots, vec!["a", "b", "c"]);
}

#[test]
fn feedback_loop_body_and_exit() {
    let out = plan_of(&refine_loop());
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    assert_eq!(
        out.block,
        Block::seq(
            "t",
            Block::Loop {
                node_id: "L1".into(),
                body: Box::new(Block::seq("worker", end())),
                max_iterations: 3,
                stop_condition: "{{worker}} == \"ok\"".into(),
                then: Box::new(Block::seq("done", end())),
            }
        )
    );
}

#[test]
fn exit_from_inside_loop_runs_after_it() {
    let wf = workflow(
        vec![
            trigger("t"),
            feedback_loop("L", 4, "{{w}} == \"done\""),
            agent("w", "x"),
            agent("esc", "y"),
        ],
        vec![
            edge("e1", "t", "L"),
            edge("e2", "L", "w"),
            edge("e3", "w", "L"),
            edge("e4", "w", "esc"),
        ],
    );
    let out = plan_of(&wf);

    let notes: Vec<(&str, Option<&str>)> = out
        .diagnostics
        .iter()
        .map(|d| (d.code.as_str(), d.node_id.as_deref()))
        .collect();
    assert_eq!(notes, vec![("L002", Some("esc"))]);
    assert!(!out.diagnostics[0].is_error());

    let Block::Seq { next, .. } = &out.block else {
        panic!("expected trigger sequence");
    };
    let Block::Loop { body, then, .. } = next.as_ref() else {
        panic!("expected loop, got {:?}", next);
    };
    assert!(!body.owned_nodes().contains(&"esc"));
    assert_eq!(then.as_ref(), &Block::seq("esc", end()));
}

#[test]
fn cycle_entered_ahead_of_loop_node_plans_one_loop() {
    let out = plan_of(&draft_review_loop());
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    assert_eq!(
        out.block,
        Block::seq(
            "t",
            Block::Loop {
                node_id: "review".into(),
                body: Box::new(Block::seq("writer", end())),
                max_iterations: 3,
                stop_condition: "{{writer}} == \"ok\"".into(),
                then: Box::new(Block::seq("done", end())),
            }
        )
    );
}

fn codes(out: &PlanOutput) -> Vec<&str> {
    out.diagnostics.iter().map(|d| d.code.as_str()).collect()
}

#[test]
fn join_of_some_arms_waits_for_the_merge() {
    let wf = workflow(
        vec![
            trigger("t"),
            parallel("p", "all"),
            agent("A", "a"),
            agent("B", "b"),
            agent("C", "c"),
            agent("X", "merge {{A}} {{B}}"),
        ],
        vec![
            edge("e1", "t", "p"),
            slot("e2", "p", "A", "a"),
            slot("e3", "p", "B", "b"),
            slot("e4", "p", "C", "c"),
            edge("e5", "A", "X"),
            edge("e6", "B", "X"),
        ],
    );
    let out = plan_of(&wf);
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    let arm = |slot: &str, id: &str| FanArm {
        slot: slot.into(),
        block: Block::seq(id, end()),
    };
    assert_eq!(
        out.block,
        Block::seq(
            "t",
            Block::Fan {
                node_id: "p".into(),
                branches: vec![arm("a", "A"), arm("b", "B"), arm("c", "C")],
                merge_strategy: Default::default(),
                then: Box::new(Block::seq("X", end())),
            }
        )
    );
}

#[test]
fn arm_feeding_a_sibling_empties_it() {
    let wf = workflow(
        vec![
            trigger("t"),
            parallel("p", "first"),
            agent("A", "a"),
            agent("B", "{{A}}"),
        ],
        vec![
            edge("e1", "t", "p"),
            slot("e2", "p", "A", "s1"),
            slot("e3", "p", "B", "s2"),
            edge("e4", "A", "B"),
        ],
    );
    let out = plan_of(&wf);
    assert_eq!(codes(&out), vec!["L003"]);
    assert_eq!(out.diagnostics[0].node_id.as_deref(), Some("p"));
    assert!(out.diagnostics[0].message.contains("'s2'"));
    assert!(!out.diagnostics[0].is_error());

    let Block::Seq { next, .. } = &out.block else {
        panic!("expected trigger sequence");
    };
    let Block::Fan { branches, then, .. } = next.as_ref() else {
        panic!("expected fan, got {:?}", next);
    };
    assert_eq!(branches[0].block, Block::seq("A", end()));
    assert_eq!(branches[1].block, end());
    assert_eq!(then.as_ref(), &Block::seq("B", end()));
}

#[test]
fn arm_with_outside_predecessor_runs_after_fan() {
    let wf = workflow(
        vec![
            trigger("t"),
            agent("Z", "z"),
            parallel("p", "all"),
            agent("A", "{{Z}}"),
            agent("B", "b"),
        ],
        vec![
            edge("e1", "t", "Z"),
            edge("e2", "t", "p"),
            edge("e3", "Z", "A"),
            slot("e4", "p", "A", "s1"),
            slot("e5", "p", "B", "s2"),
        ],
    );
    let out = plan_of(&wf);
    assert_eq!(codes(&out), vec!["L003"]);
    assert_eq!(
        out.block,
        Block::seq(
            "t",
            Block::Fork {
                branches: vec![
                    Block::seq("Z", end()),
                    Block::Fan {
                        node_id: "p".into(),
                        branches: vec![
                            FanArm {
                                slot: "s1".into(),
                                block: end(),
                            },
                            FanArm {
                                slot: "s2".into(),
                                block: Block::seq("B", end()),
                            },
                        ],
                        merge_strategy: Default::default(),
                        then: Box::new(end()),
                    },
                ],
                then: Box::new(Block::seq("A", end())),
            }
        )
    );
}

#[test]
fn race_followed_by_shared_node_warns() {
    let wf = workflow(
        vec![
            trigger("t"),
            parallel("p", "first"),
            agent("A", "a"),
            agent("B", "b"),
            agent("X", "{{A}} {{B}}"),
        ],
        vec![
            edge("e1", "t", "p"),
            slot("e2", "p", "A", "s1"),
            slot("e3", "p", "B", "s2"),
            edge("e4", "A", "X"),
            edge("e5", "B", "X"),
        ],
    );
    let out = plan_of(&wf);
    assert_eq!(codes(&out), vec!["L004"]);
    assert_eq!(out.diagnostics[0].node_id.as_deref(), Some("X"));
    assert!(!out.diagnostics[0].is_error());
}

#[test]
fn shortcut_edge_waits_for_longer_path() {
    // a → d directly and a → c → d; d must run after c.
    let wf = workflow(
        vec![
            trigger("t"),
            agent("a", "x"),
            agent("c", "y"),
            agent("d", "{{a}} {{c}}"),
        ],
        vec![
            edge("e1", "t", "a"),
            edge("e2", "a", "c"),
            edge("e3", "a", "d"),
            edge("e4", "c", "d"),
        ],
    );
    let out = plan_of(&wf);
    assert!(!out.diagnostics.iter().any(|d| d.is_error()));
    assert_eq!(out.block.owned_nodes(), vec!["t", "a", "c", "d"]);
}

#[test]
fn independent_successors_share_one_join() {
    let wf = workflow(
        vec![
            trigger("t"),
            agent("left", "x"),
            agent("right", "y"),
            agent("mid", "m"),
            agent("join", "z"),
        ],
        vec![
            edge("e1", "t", "right"),
            edge("e2", "t", "left"),
            edge("e3", "left", "mid"),
            edge("e4", "mid", "join"),
            edge("e5", "right", "join"),
        ],
    );
    let out = plan_of(&wf);
    assert_eq!(
        out.block,
        Block::seq(
            "t",
            Block::Fork {
                branches: vec![
                    Block::seq("left", Block::seq("mid", end())),
                    Block::seq("right", end()),
                ],
                then: Box::new(Block::seq("join", end())),
            }
        )
    );
}

#[test]
fn every_node_is_owned_exactly_once() {
    for wf in [chain(), branching(), fan_out(), refine_loop(), draft_review_loop()] {
        let out = plan_of(&wf);
        let mut owned = out.block.owned_nodes();
        owned.sort_unstable();
        let mut expected: Vec<&str> = wf.nodes.iter().map(|n| n.id()).collect();
        expected.sort_unstable();
        assert_eq!(owned, expected);
    }
}

#[test]
fn plan_serializes_with_block_tags() {
    let out = plan_of(&refine_loop());
    let json = serde_json::to_value(&out.block).unwrap();
    assert_eq!(json["block"], "seq");
    assert_eq!(json["next"]["block"], "loop");
    assert_eq!(json["next"]["maxIterations"], 3);
    assert_eq!(json["next"]["body"]["nodeId"], "worker");
}
