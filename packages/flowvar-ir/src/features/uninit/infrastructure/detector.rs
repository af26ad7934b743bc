/*
 * Uninitialized-Read Detector
 *
 * A read of a declared-but-unassigned local may observe an indeterminate
 * value if it is reachable from the declaration without passing through any
 * write of the same variable.
 *
 * Two phases per candidate variable:
 * 1. Cheap sufficient condition: every read is dominated by some write.
 *    Dominance is transitive and decided locally, so this settles the common
 *    case without any propagation.
 * 2. Fallback: explicit "not-yet-written" propagation forward from the
 *    declaration's sub-basic-block: a block is not-yet-written on entry if
 *    it holds the declaration or some predecessor leaves it not-yet-written
 *    (no write anywhere in that predecessor); reads before the block's first
 *    write are flagged.
 *
 * Writes are full assignments plus reference-argument partial definitions
 * (`init(&x)` initializes `x`); field-store and call-qualifier partial
 * definitions presuppose an initialized value and do not count. Accesses
 * under `sizeof`/`alignof`-style operators never count as reads.
 */

use rustc_hash::{FxHashMap, FxHashSet};

use crate::features::cfg::domain::{ExprId, Procedure, StorageClass, SubBlockId, VarId};
use crate::features::cfg::infrastructure::CfgContext;
use crate::features::partial_def::domain::PartialDefKind;
use crate::features::partial_def::infrastructure::PartialDefinitions;
use crate::features::uninit::domain::{UninitializedLocalVariable, UninitializedRead};

/// All possibly-uninitialized reads of one procedure
#[derive(Debug, Default)]
pub struct UninitializedReads {
    reads: Vec<UninitializedRead>,
    flagged: FxHashSet<ExprId>,
    by_variable: FxHashMap<VarId, Vec<ExprId>>,
}

impl UninitializedReads {
    pub fn all(&self) -> &[UninitializedRead] {
        &self.reads
    }

    pub fn is_flagged(&self, read: ExprId) -> bool {
        self.flagged.contains(&read)
    }

    /// Is any read of `var` possibly uninitialized?
    pub fn flags_any(&self, var: VarId) -> bool {
        self.by_variable.contains_key(&var)
    }

    fn push(&mut self, variable: VarId, read: ExprId) {
        if self.flagged.insert(read) {
            self.reads.push(UninitializedRead { variable, read });
            self.by_variable.entry(variable).or_default().push(read);
        }
    }
}

/// Locals with no initializer and no static storage duration
pub fn candidates(proc: &Procedure) -> Vec<UninitializedLocalVariable> {
    proc.variables
        .iter()
        .filter(|v| v.storage == StorageClass::Local && !v.has_initializer)
        .map(|v| UninitializedLocalVariable { variable: v.id })
        .collect()
}

/// Detect every possibly-uninitialized read in `proc`
pub fn detect(
    proc: &Procedure,
    cfg: &CfgContext,
    partials: &PartialDefinitions,
) -> UninitializedReads {
    let mut out = UninitializedReads::default();
    for cand in candidates(proc) {
        detect_variable(proc, cfg, partials, cand.variable, &mut out);
    }
    out
}

fn detect_variable(
    proc: &Procedure,
    cfg: &CfgContext,
    partials: &PartialDefinitions,
    var: VarId,
    out: &mut UninitializedReads,
) {
    let reads: Vec<ExprId> = proc
        .exprs
        .iter()
        .filter(|e| e.kind.read_of() == Some(var))
        .map(|e| e.id)
        .collect();
    if reads.is_empty() {
        return;
    }
    let writes = writes_of(proc, partials, var);

    // Phase 1: every read dominated by some write → nothing to flag.
    let all_dominated = reads
        .iter()
        .all(|&r| writes.iter().any(|&w| cfg.expr_dominates(proc, w, r)));
    if all_dominated {
        return;
    }

    // Phase 2: not-yet-written propagation from the declaration block.
    let Some(decl) = proc.var(var).decl_sub_block else {
        return;
    };
    let writes_in: FxHashMap<SubBlockId, usize> = first_write_positions(proc, &writes);

    let mut not_yet_written: FxHashSet<SubBlockId> = FxHashSet::default();
    let mut stack = vec![decl];
    while let Some(sbb) = stack.pop() {
        if !not_yet_written.insert(sbb) {
            continue;
        }
        // A write anywhere in this block stops propagation past it.
        if writes_in.contains_key(&sbb) {
            continue;
        }
        stack.extend(proc.sub_blocks[sbb].successors.iter().copied());
    }

    for &r in &reads {
        let sbb = proc.expr(r).sub_block;
        if !not_yet_written.contains(&sbb) {
            continue;
        }
        let pos = proc.position_in_sub_block(r).unwrap_or(usize::MAX);
        let first_write = writes_in.get(&sbb).copied().unwrap_or(usize::MAX);
        // Before the block's first write, or no write in the block at all.
        if pos < first_write {
            out.push(var, r);
        }
    }
}

/// Events that write `var`: full assignments and reference-argument partial
/// definitions
fn writes_of(proc: &Procedure, partials: &PartialDefinitions, var: VarId) -> Vec<ExprId> {
    let mut writes: Vec<ExprId> = proc
        .exprs
        .iter()
        .filter(|e| e.kind.full_def_of() == Some(var))
        .map(|e| e.id)
        .collect();
    for &pd in partials.of_variable(var) {
        let p = partials.get(pd);
        if p.kind == PartialDefKind::ReferenceArgument {
            writes.push(p.expr);
        }
    }
    writes
}

fn first_write_positions(proc: &Procedure, writes: &[ExprId]) -> FxHashMap<SubBlockId, usize> {
    let mut first: FxHashMap<SubBlockId, usize> = FxHashMap::default();
    for &w in writes {
        let sbb = proc.expr(w).sub_block;
        if let Some(pos) = proc.position_in_sub_block(w) {
            let entry = first.entry(sbb).or_insert(pos);
            *entry = (*entry).min(pos);
        }
    }
    first
}
