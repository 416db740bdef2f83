//! Build the structured block tree from a validated graph.
//!
//! Walks forward from the trigger. Branch and fork arms stop at their
//! reconvergence node, which is planned once after the construct. Fan arms
//! run concurrently, so they stop at every node two of them lead to; those
//! are planned after the merge. A node is planned only once all of its
//! forward predecessors have been planned, so the emitted order always
//! respects data dependencies.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::debug;

use crate::error::Diagnostic;
use crate::ir::types::{Block, FanArm};
use crate::parse::graph::Adjacent;
use crate::parse::types::{BranchLabel, MergeStrategy, WorkflowNode};
use crate::validate::ValidatedGraph;

pub(crate) struct Planner<'v, 'a> {
    v: &'v ValidatedGraph<'a>,
    /// Position of each node in the forward topological order.
    position: HashMap<&'v str, usize>,
    visited: HashSet<String>,
    /// Nodes the enclosing constructs will plan themselves (joins, active
    /// loop heads).
    stops: Vec<String>,
    /// Active loop bodies, innermost last.
    regions: Vec<&'v BTreeSet<String>>,
    /// Nodes reached from inside a loop body that lie outside it, per loop.
    deferred: Vec<Vec<String>>,
    postponed: HashSet<String>,
    pub(crate) diagnostics: Vec<Diagnostic>,
}

impl<'v, 'a> Planner<'v, 'a> {
    pub(crate) fn new(v: &'v ValidatedGraph<'a>, order: &'v [String]) -> Self {
        Planner {
            v,
            position: order
                .iter()
                .enumerate()
                .map(|(i, id)| (id.as_str(), i))
                .collect(),
            visited: HashSet::new(),
            stops: Vec::new(),
            regions: Vec::new(),
            deferred: Vec::new(),
            postponed: HashSet::new(),
            diagnostics: Vec::new(),
        }
    }

    pub(crate) fn plan_node(&mut self, id: &str) -> Block {
        if self.stops.iter().any(|s| s == id) {
            return Block::End;
        }

        if let (Some(body), Some(exits)) = (self.regions.last(), self.deferred.last_mut()) {
            if !body.contains(id) {
                if !exits.iter().any(|e| e == id) {
                    exits.push(id.to_string());
                }
                return Block::End;
            }
        }

        if self.visited.contains(id) {
            self.diagnostics.push(Diagnostic::plan_info(
                "L001",
                format!("Node '{}' is reached again after it was emitted; the later path reuses its result", id),
                id,
            ));
            return Block::Visited {
                node_id: id.to_string(),
            };
        }

        if !self.is_ready(id) {
            if self.postponed.insert(id.to_string()) {
                debug!(node = id, "join postponed until all predecessors are planned");
                self.diagnostics.push(Diagnostic::plan_info(
                    "L001",
                    format!(
                        "Node '{}' joins paths of different depth; it runs after its last predecessor",
                        id
                    ),
                    id,
                ));
            }
            return Block::End;
        }

        let v = self.v;
        if let Some(info) = v.loops.entered_at(id) {
            if !self.stops.contains(&info.head) {
                if let Some(WorkflowNode::FeedbackLoop(n)) = v.node(&info.head) {
                    debug!(node = id, loop_node = %info.head, "cycle entered ahead of its loop node");
                    self.visited.insert(info.head.clone());
                    let cfg = &n.data.config;
                    return self.plan_loop(&info.head, cfg.max_iterations, cfg.stop_condition.clone());
                }
            }
        }

        self.visited.insert(id.to_string());

        match v.node(id) {
            Some(WorkflowNode::Condition(_)) => self.plan_condition(id),
            Some(WorkflowNode::Parallel(n)) => {
                let merge_strategy = n.data.config.merge_strategy;
                self.plan_fan(id, merge_strategy)
            }
            Some(WorkflowNode::FeedbackLoop(n)) if v.loops.get(id).is_some_and(|l| l.entry == id) => {
                let cfg = &n.data.config;
                self.plan_loop(id, cfg.max_iterations, cfg.stop_condition.clone())
            }
            _ => {
                let targets = self.plain_targets(id);
                Block::seq(id, self.plan_successors(targets))
            }
        }
    }

    fn plan_condition(&mut self, id: &str) -> Block {
        let v = self.v;
        let successors = v.graph.successors(id);
        let target = |label: BranchLabel| {
            successors
                .iter()
                .find(|a| a.edge.branch_label == Some(label))
                .map(|a| a.node_id.to_string())
        };
        let on_true = target(BranchLabel::True);
        let on_false = target(BranchLabel::False);

        let arms: Vec<String> = on_true.iter().chain(on_false.iter()).cloned().collect();
        let (blocks, then) = self.plan_arms(&arms);
        let mut blocks = blocks.into_iter();
        let mut take = |present: bool| {
            if present {
                blocks.next().unwrap_or(Block::End)
            } else {
                Block::End
            }
        };
        let on_true = take(on_true.is_some());
        let on_false = take(on_false.is_some());

        Block::Branch {
            node_id: id.to_string(),
            on_true: Box::new(on_true),
            on_false: Box::new(on_false),
            then: Box::new(then),
        }
    }

    fn plan_fan(&mut self, id: &str, merge_strategy: MergeStrategy) -> Block {
        let v = self.v;
        let mut arms: Vec<(String, String, String)> = v
            .graph
            .successors(id)
            .into_iter()
            .map(|a| {
                (
                    a.edge.output_slot.clone().unwrap_or_default(),
                    a.edge.id.clone(),
                    a.node_id.to_string(),
                )
            })
            .collect();
        arms.sort();

        let targets: Vec<String> = arms.iter().map(|(_, _, t)| t.clone()).collect();

        // Arms run concurrently, so anything two arms lead to waits for the
        // merge instead of running inside whichever arm finishes it.
        let (shared, frontier) = self.shared_by_arms(&targets);
        let outer = self.stops.len();
        self.stops.extend(shared.iter().cloned());
        let blocks: Vec<Block> = targets.iter().map(|t| self.plan_node(t)).collect();
        self.stops.truncate(outer);

        let mut running = 0;
        for ((slot, _, target), block) in arms.iter().zip(&blocks) {
            if block.owned_nodes().is_empty() {
                debug!(node = id, slot = %slot, "empty parallel arm");
                self.diagnostics.push(Diagnostic::plan_info(
                    "L003",
                    format!(
                        "Arm '{}' of parallel '{}' is empty; '{}' runs outside it and the arm is left out of the merge",
                        slot, id, target
                    ),
                    id,
                ));
            } else {
                running += 1;
            }
        }

        if merge_strategy == MergeStrategy::First && running > 1 {
            let in_arms: HashSet<&str> = blocks.iter().flat_map(Block::owned_nodes).collect();
            for node in &shared {
                let reads_arm = v
                    .graph
                    .predecessors(node)
                    .iter()
                    .any(|a| in_arms.contains(a.node_id));
                if reads_arm {
                    self.diagnostics.push(Diagnostic::plan_warning(
                        "L004",
                        format!(
                            "Node '{}' runs after parallel '{}' settles on its first arm; \
                             the other arms may still be running",
                            node, id
                        ),
                        node,
                    ));
                }
            }
        }

        let then = self.plan_successors(frontier);
        let branches = arms
            .into_iter()
            .zip(blocks)
            .map(|((slot, _, _), block)| FanArm { slot, block })
            .collect();

        Block::Fan {
            node_id: id.to_string(),
            branches,
            merge_strategy,
            then: Box::new(then),
        }
    }

    fn plan_loop(&mut self, id: &str, max_iterations: u32, stop_condition: String) -> Block {
        let v = self.v;
        let Some(info) = v.loops.get(id) else {
            return Block::seq(id, Block::End);
        };

        self.stops.push(id.to_string());
        self.regions.push(&info.body);
        self.deferred.push(Vec::new());
        let body = self.plan_node(&info.body_entry);
        let leaving = self.deferred.pop().unwrap_or_default();
        self.regions.pop();
        self.stops.pop();

        let mut exits: Vec<String> = self
            .sorted_successors(id)
            .into_iter()
            .map(|a| a.node_id.to_string())
            .filter(|t| !info.body.contains(t))
            .collect();
        for node in leaving {
            debug!(node = %node, loop_node = id, "loop exit deferred");
            self.diagnostics.push(Diagnostic::plan_info(
                "L002",
                format!(
                    "Node '{}' is reached from inside feedback loop '{}' and runs after the loop finishes",
                    node, id
                ),
                &node,
            ));
            if !exits.contains(&node) {
                exits.push(node);
            }
        }

        let then = self.plan_successors(exits);
        Block::Loop {
            node_id: id.to_string(),
            body: Box::new(body),
            max_iterations,
            stop_condition,
            then: Box::new(then),
        }
    }

    fn plan_successors(&mut self, mut targets: Vec<String>) -> Block {
        let mut seen = HashSet::new();
        targets.retain(|t| seen.insert(t.clone()));

        match targets.as_slice() {
            [] => Block::End,
            [only] => {
                let only = only.clone();
                self.plan_node(&only)
            }
            _ => {
                let (branches, then) = self.plan_arms(&targets);
                Block::Fork {
                    branches,
                    then: Box::new(then),
                }
            }
        }
    }

    /// Plan each arm up to the arms' reconvergence node, then the node itself.
    fn plan_arms(&mut self, arms: &[String]) -> (Vec<Block>, Block) {
        let join = if arms.len() > 1 {
            self.reconvergence(arms)
        } else {
            None
        };
        if let Some(join) = &join {
            self.stops.push(join.clone());
        }
        let blocks = arms.iter().map(|arm| self.plan_node(arm)).collect();
        let then = match join {
            Some(join) => {
                self.stops.pop();
                self.plan_node(&join)
            }
            None => Block::End,
        };
        (blocks, then)
    }

    /// The first node in topological order reachable from every arm.
    fn reconvergence(&self, arms: &[String]) -> Option<String> {
        let mut common: Option<HashSet<&str>> = None;
        for arm in arms {
            let reach = self.reachable(arm);
            common = Some(match common {
                None => reach,
                Some(acc) => acc.intersection(&reach).copied().collect(),
            });
        }
        common?
            .into_iter()
            .min_by_key(|id| self.position.get(id).copied().unwrap_or(usize::MAX))
            .map(str::to_string)
    }

    /// Nodes reachable from two or more arms, in topological order, plus the
    /// earliest of them (those with no forward predecessor in the set).
    fn shared_by_arms(&self, arms: &[String]) -> (Vec<String>, Vec<String>) {
        let mut count: HashMap<&'v str, usize> = HashMap::new();
        for arm in arms {
            for id in self.reachable(arm) {
                *count.entry(id).or_default() += 1;
            }
        }
        let mut shared: Vec<&'v str> = count
            .into_iter()
            .filter(|&(id, n)| n > 1 && !self.stops.iter().any(|s| s == id))
            .map(|(id, _)| id)
            .collect();
        shared.sort_by_key(|id| self.position.get(id).copied().unwrap_or(usize::MAX));

        let v = self.v;
        let frontier = shared
            .iter()
            .filter(|id| {
                !v.graph
                    .predecessors(id)
                    .iter()
                    .any(|a| !v.loops.is_back_edge(a.index) && shared.contains(&a.node_id))
            })
            .map(|id| id.to_string())
            .collect();
        (shared.into_iter().map(str::to_string).collect(), frontier)
    }

    /// Forward reachability from `start`, not expanding past nodes that an
    /// enclosing construct already stops at.
    fn reachable(&self, start: &str) -> HashSet<&'v str> {
        let v = self.v;
        let mut seen: HashSet<&'v str> = HashSet::new();
        let Some(start_idx) = v.graph.index_of(start) else {
            return seen;
        };
        let mut stack = vec![v.graph.id_of(start_idx)];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            if self.stops.iter().any(|s| s == id) {
                continue;
            }
            for adj in v.graph.successors(id) {
                if !v.loops.is_back_edge(adj.index) && !seen.contains(adj.node_id) {
                    stack.push(adj.node_id);
                }
            }
        }
        seen
    }

    fn is_ready(&self, id: &str) -> bool {
        self.v
            .graph
            .predecessors(id)
            .iter()
            .filter(|a| !self.v.loops.is_back_edge(a.index))
            .all(|a| self.visited.contains(a.node_id))
    }

    /// Successors of a plain node, ordered by target id then edge id.
    fn plain_targets(&self, id: &str) -> Vec<String> {
        self.sorted_successors(id)
            .into_iter()
            .map(|a| a.node_id.to_string())
            .collect()
    }

    fn sorted_successors(&self, id: &str) -> Vec<Adjacent<'v>> {
        let v = self.v;
        let mut successors = v.graph.successors(id);
        successors.sort_by(|a, b| (a.node_id, &a.edge.id).cmp(&(b.node_id, &b.edge.id)));
        successors
    }
}
