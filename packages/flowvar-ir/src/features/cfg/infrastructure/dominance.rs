/*
 * CFG derived queries (per-procedure, memoized)
 *
 * Thin adapter over the sub-basic-block graph:
 * - dominance / strict dominance (Cooper-Harvey-Kennedy via petgraph)
 * - reachability from the procedure entry
 * - expression-level dominance (block dominance + in-block position)
 *
 * Built once per analyzed procedure and shared read-only by the detectors
 * and resolvers. The CFG snapshot never changes during analysis, so every
 * relation here is safe to compute up front.
 */

use petgraph::algo::dominators::{simple_fast, Dominators};
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashSet;

use crate::features::cfg::domain::{ExprId, Procedure, SubBlockId};

/// Derived CFG queries for one procedure
pub struct CfgContext {
    graph: DiGraph<SubBlockId, ()>,
    /// Sub-block id → petgraph node index
    nodes: Vec<NodeIndex>,
    dominators: Dominators<NodeIndex>,
    reachable: FxHashSet<SubBlockId>,
}

impl CfgContext {
    pub fn new(proc: &Procedure) -> Self {
        let mut graph = DiGraph::new();
        let nodes: Vec<NodeIndex> = proc
            .sub_blocks
            .iter()
            .map(|sbb| graph.add_node(sbb.id))
            .collect();
        for sbb in &proc.sub_blocks {
            for &succ in &sbb.successors {
                graph.add_edge(nodes[sbb.id], nodes[succ], ());
            }
        }

        let dominators = simple_fast(&graph, nodes[proc.entry]);

        // DFS from entry; unreachable sub-blocks stay analyzable but never
        // dominate anything.
        let mut reachable = FxHashSet::default();
        let mut stack = vec![proc.entry];
        while let Some(sbb) = stack.pop() {
            if !reachable.insert(sbb) {
                continue;
            }
            stack.extend(proc.sub_blocks[sbb].successors.iter().copied());
        }

        Self {
            graph,
            nodes,
            dominators,
            reachable,
        }
    }

    /// Is `sbb` reachable from the procedure entry?
    pub fn is_reachable(&self, sbb: SubBlockId) -> bool {
        self.reachable.contains(&sbb)
    }

    /// Does `a` dominate `b`? (reflexive; false if `b` is unreachable)
    pub fn dominates(&self, a: SubBlockId, b: SubBlockId) -> bool {
        match self.dominators.dominators(self.nodes[b]) {
            Some(mut doms) => doms.any(|d| d == self.nodes[a]),
            None => false,
        }
    }

    pub fn strictly_dominates(&self, a: SubBlockId, b: SubBlockId) -> bool {
        a != b && self.dominates(a, b)
    }

    /// Does event `a` dominate event `b`?
    ///
    /// Sub-basic-blocks are straight-line, so within one block this is
    /// program order; across blocks it is block dominance (executing the
    /// block executes all of its events).
    pub fn expr_dominates(&self, proc: &Procedure, a: ExprId, b: ExprId) -> bool {
        let (sa, sb) = (proc.expr(a).sub_block, proc.expr(b).sub_block);
        if sa == sb {
            match (proc.position_in_sub_block(a), proc.position_in_sub_block(b)) {
                (Some(pa), Some(pb)) => pa < pb,
                _ => false,
            }
        } else {
            self.dominates(sa, sb)
        }
    }

    /// Every sub-block reachable from `start` by forward edges, `start`
    /// excluded unless it lies on a cycle.
    pub fn forward_reachable_from(&self, proc: &Procedure, start: SubBlockId) -> FxHashSet<SubBlockId> {
        let mut seen = FxHashSet::default();
        let mut stack: Vec<SubBlockId> = proc.sub_blocks[start].successors.clone();
        while let Some(sbb) = stack.pop() {
            if !seen.insert(sbb) {
                continue;
            }
            stack.extend(proc.sub_blocks[sbb].successors.iter().copied());
        }
        seen
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }
}
