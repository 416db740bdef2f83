//! Structured control-flow tree produced by the planner.
//!
//! The tree bridges the node-edge graph (input) and the emitted program
//! (output). Every node of the graph is owned by exactly one block; other
//! arrivals at the same node are recorded as `Visited`.

use serde::Serialize;

use crate::parse::types::MergeStrategy;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "block", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Block {
    /// Run one node, then continue with `next`.
    Seq { node_id: String, next: Box<Block> },
    /// Evaluate a condition node and run one arm, then `then`.
    Branch {
        node_id: String,
        on_true: Box<Block>,
        on_false: Box<Block>,
        then: Box<Block>,
    },
    /// Run every arm of a parallel node concurrently and merge the results.
    Fan {
        node_id: String,
        branches: Vec<FanArm>,
        merge_strategy: MergeStrategy,
        then: Box<Block>,
    },
    /// Bounded feedback loop: repeat `body` at most `max_iterations` times.
    Loop {
        node_id: String,
        body: Box<Block>,
        max_iterations: u32,
        stop_condition: String,
        then: Box<Block>,
    },
    /// Several independent successors of a plain node, run one after another.
    Fork { branches: Vec<Block>, then: Box<Block> },
    /// A node already owned by another block.
    Visited { node_id: String },
    End,
}

/// One arm of a parallel fan-out, keyed by its output slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FanArm {
    pub slot: String,
    pub block: Block,
}

impl Block {
    pub fn seq(node_id: impl Into<String>, next: Block) -> Self {
        Block::Seq {
            node_id: node_id.into(),
            next: Box::new(next),
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Block::End)
    }

    /// The node this block runs itself, if any.
    pub fn owner(&self) -> Option<&str> {
        match self {
            Block::Seq { node_id, .. }
            | Block::Branch { node_id, .. }
            | Block::Fan { node_id, .. }
            | Block::Loop { node_id, .. } => Some(node_id.as_str()),
            Block::Fork { .. } | Block::Visited { .. } | Block::End => None,
        }
    }

    /// Child blocks in execution order.
    pub fn children(&self) -> Vec<&Block> {
        match self {
            Block::Seq { next, .. } => vec![&**next],
            Block::Branch {
                on_true,
                on_false,
                then,
                ..
            } => vec![&**on_true, &**on_false, &**then],
            Block::Fan { branches, then, .. } => {
                let mut out: Vec<&Block> = branches.iter().map(|a| &a.block).collect();
                out.push(&**then);
                out
            }
            Block::Loop { body, then, .. } => vec![&**body, &**then],
            Block::Fork { branches, then } => {
                let mut out: Vec<&Block> = branches.iter().collect();
                out.push(&**then);
                out
            }
            Block::Visited { .. } | Block::End => vec![],
        }
    }

    /// Every node owned anywhere in this tree, in execution order.
    pub fn owned_nodes(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_owned(&mut out);
        out
    }

    fn collect_owned<'b>(&'b self, out: &mut Vec<&'b str>) {
        if let Some(id) = self.owner() {
            out.push(id);
        }
        for child in self.children() {
            child.collect_owned(out);
        }
    }

    /// The last node this block runs on its main path. Used as the result
    /// of a parallel arm.
    pub fn tail(&self) -> Option<&str> {
        match self {
            Block::Seq { node_id, next } => next.tail().or(Some(node_id.as_str())),
            Block::Branch { node_id, then, .. }
            | Block::Fan { node_id, then, .. }
            | Block::Loop { node_id, then, .. } => then.tail().or(Some(node_id.as_str())),
            Block::Fork { branches, then } => then
                .tail()
                .or_else(|| branches.iter().rev().find_map(Block::tail)),
            Block::Visited { .. } | Block::End => None,
        }
    }
}
