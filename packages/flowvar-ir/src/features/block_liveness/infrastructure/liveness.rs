/*
 * Backward liveness at sub-basic-block granularity
 *
 * live-in(B, v) holds when v is read somewhere in B, or some successor is
 * live-in and B does not kill liveness. B kills liveness when it contains a
 * full assignment to v or v's declaration; liveness never flows backward
 * past a declaration.
 *
 * Classic backward worklist (USE ∪ (OUT - DEF)); computed per variable on
 * demand and cached by the resolver, since the same block/variable pair is
 * queried from many predecessors.
 */

use rustc_hash::FxHashSet;

use crate::features::cfg::domain::{Procedure, SubBlockId, VarId};

/// Does `sbb` kill liveness of `var`?
pub fn kills(proc: &Procedure, sbb: SubBlockId, var: VarId) -> bool {
    proc.sub_block_fully_assigns(sbb, var) || proc.sub_block_declares(sbb, var)
}

/// Every sub-basic-block that is live-in for `var`
pub fn live_in_blocks(proc: &Procedure, var: VarId) -> FxHashSet<SubBlockId> {
    let mut live: FxHashSet<SubBlockId> = FxHashSet::default();
    let mut worklist: Vec<SubBlockId> = Vec::new();

    for sbb in &proc.sub_blocks {
        let has_read = sbb
            .exprs
            .iter()
            .any(|&e| proc.expr(e).kind.read_of() == Some(var));
        if has_read {
            live.insert(sbb.id);
            worklist.push(sbb.id);
        }
    }

    while let Some(sbb) = worklist.pop() {
        for &pred in &proc.sub_blocks[sbb].predecessors {
            if live.contains(&pred) || kills(proc, pred, var) {
                continue;
            }
            live.insert(pred);
            worklist.push(pred);
        }
    }

    live
}
