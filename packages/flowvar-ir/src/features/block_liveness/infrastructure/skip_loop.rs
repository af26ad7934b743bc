/*
 * Always-true-upon-entry loop exemption ("skip-loop")
 *
 * Targets loops whose condition is proven true on first entry but not on
 * every iteration. If a variable is unconditionally assigned on every
 * control path from loop entry to every exit edge out of the condition
 * test, and it is read after the loop, then by the time any exit is taken
 * the loop's internal assignment has superseded whatever held before the
 * loop. A definition located strictly before the loop must then not be
 * propagated across the condition→exit edges.
 *
 * Deliberately a narrow predicate (must-assign fixpoint over the loop body
 * plus a read-after check), not general path-sensitive analysis.
 */

use rustc_hash::{FxHashMap, FxHashSet};

use crate::features::cfg::domain::{LoopFacts, Procedure, SubBlockId, VarId};

/// The computed (loop, variable) exemptions of one procedure
#[derive(Debug, Default)]
pub struct SkipLoops {
    /// Suppressed exit edges per variable: (from-inside, to-outside)
    suppressed: FxHashMap<VarId, Vec<SuppressedEdge>>,
    subjects: FxHashSet<VarId>,
}

#[derive(Debug, Clone)]
struct SuppressedEdge {
    from: SubBlockId,
    to: SubBlockId,
    /// The loop body; a definition inside it is not suppressed
    body: FxHashSet<SubBlockId>,
}

impl SkipLoops {
    /// Is `var` special-cased by some always-true-upon-entry loop?
    pub fn is_subject(&self, var: VarId) -> bool {
        self.subjects.contains(&var)
    }

    /// Must the reach step for a definition of `var` at `def_sbb` be
    /// suppressed across the edge `from → to`?
    pub fn suppresses(&self, var: VarId, def_sbb: SubBlockId, from: SubBlockId, to: SubBlockId) -> bool {
        self.suppressed
            .get(&var)
            .map(|edges| {
                edges
                    .iter()
                    .any(|e| e.from == from && e.to == to && !e.body.contains(&def_sbb))
            })
            .unwrap_or(false)
    }
}

/// Compute every skip-loop exemption in `proc`
pub fn compute(proc: &Procedure) -> SkipLoops {
    let mut out = SkipLoops::default();
    for l in &proc.loops {
        if !l.is_always_true_upon_entry() || l.exit_edges.is_empty() {
            continue;
        }
        let body: FxHashSet<SubBlockId> = l.body.iter().copied().collect();
        for var in assigned_in_body(proc, &body) {
            if must_assign_before_every_exit(proc, l, &body, var)
                && read_after_loop(proc, l, &body, var)
            {
                out.subjects.insert(var);
                let edges = out.suppressed.entry(var).or_default();
                for &(from, to) in &l.exit_edges {
                    edges.push(SuppressedEdge {
                        from,
                        to,
                        body: body.clone(),
                    });
                }
            }
        }
    }
    out
}

fn assigned_in_body(proc: &Procedure, body: &FxHashSet<SubBlockId>) -> Vec<VarId> {
    let mut vars: Vec<VarId> = Vec::new();
    for &sbb in body {
        for e in proc.events_in(sbb) {
            if let Some(v) = e.kind.full_def_of() {
                if !vars.contains(&v) {
                    vars.push(v);
                }
            }
        }
    }
    vars
}

/// Must-assign fixpoint over the loop body: is `var` assigned on every path
/// from the loop head to each exit-edge source?
///
/// The head itself is reached unassigned on first entry, but an exit edge
/// leaving the head cannot be taken then (the condition is true upon
/// entry), so for a head-sourced exit the check moves to the back-edge
/// predecessors: every return to the head must have assigned.
fn must_assign_before_every_exit(
    proc: &Procedure,
    l: &LoopFacts,
    body: &FxHashSet<SubBlockId>,
    var: VarId,
) -> bool {
    let assigns = |sbb: SubBlockId| proc.sub_block_fully_assigns(sbb, var);

    // must_in[s]: var fully assigned on every loop path from the head to s.
    // Start optimistic (true everywhere but the head) and shrink.
    let mut must_in: FxHashMap<SubBlockId, bool> =
        body.iter().map(|&s| (s, s != l.head)).collect();
    let mut changed = true;
    while changed {
        changed = false;
        for &s in body {
            if s == l.head {
                continue;
            }
            let new = proc.sub_blocks[s]
                .predecessors
                .iter()
                .filter(|p| body.contains(p))
                .all(|&p| must_in[&p] || assigns(p));
            if must_in[&s] != new {
                must_in.insert(s, new);
                changed = true;
            }
        }
    }

    let must_out = |sbb: SubBlockId| must_in.get(&sbb).copied().unwrap_or(false) || assigns(sbb);

    l.exit_edges.iter().all(|&(from, _)| {
        if from == l.head {
            proc.sub_blocks[l.head]
                .predecessors
                .iter()
                .filter(|p| body.contains(p))
                .all(|&p| must_out(p))
        } else {
            must_out(from)
        }
    })
}

/// Is `var` read in some sub-block outside the loop reachable from an exit?
fn read_after_loop(
    proc: &Procedure,
    l: &LoopFacts,
    body: &FxHashSet<SubBlockId>,
    var: VarId,
) -> bool {
    let mut seen: FxHashSet<SubBlockId> = FxHashSet::default();
    let mut stack: Vec<SubBlockId> = l.exit_edges.iter().map(|&(_, to)| to).collect();
    while let Some(sbb) = stack.pop() {
        if !seen.insert(sbb) {
            continue;
        }
        if !body.contains(&sbb) {
            let has_read = proc
                .events_in(sbb)
                .any(|e| e.kind.read_of() == Some(var));
            if has_read {
                return true;
            }
        }
        stack.extend(proc.sub_blocks[sbb].successors.iter().copied());
    }
    false
}
