/*
 * Block-liveness resolver
 *
 * Fallback resolution at sub-basic-block granularity for every variable the
 * SSA resolver cannot handle faithfully. Per variable:
 *
 * 1. Definition-point discovery: a sub-block defines the variable when it
 *    contains an initializer or assignment, anchors a partial definition,
 *    is the entry (for a parameter), or is the declaration block of a local
 *    read before any write.
 * 2. Explosion guard: when |live-in blocks| x |definition points| exceeds
 *    the configured limit, the variable keeps its definition points but
 *    gets no reach information: conservative absence of data, not a
 *    failure.
 * 3. Reach: forward propagation from each definition point, stopping at
 *    successors where the variable is not live or that contain their own
 *    full assignment (whose definition takes over), with the skip-loop
 *    exemption suppressing condition→exit edges for definitions located
 *    before an always-true-upon-entry loop that always reassigns the
 *    variable.
 *
 * Reads used purely as the left-hand side of a plain assignment are
 * overwrites, not uses, and never appear as reached uses (the event model
 * encodes them as `Assign`, not `Read`).
 */

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use crate::features::block_liveness::domain::BlockVar;
use crate::features::block_liveness::infrastructure::liveness::live_in_blocks;
use crate::features::block_liveness::infrastructure::skip_loop::SkipLoops;
use crate::features::cfg::domain::{ExprId, Procedure, SubBlockId, VarId};
use crate::features::partial_def::domain::PartialDefKind;
use crate::features::partial_def::infrastructure::PartialDefinitions;
use crate::features::uninit::infrastructure::UninitializedReads;

/// Result of fallback resolution for one procedure
#[derive(Debug, Default)]
pub struct BlockResolution {
    pub vars: Vec<BlockVar>,
    /// Variables excluded from reach computation by the explosion guard
    pub guarded: FxHashSet<VarId>,
}

pub struct BlockResolver<'a> {
    proc: &'a Procedure,
    partials: &'a PartialDefinitions,
    uninit: &'a UninitializedReads,
    skip_loops: &'a SkipLoops,
    explosion_guard_limit: usize,
}

impl<'a> BlockResolver<'a> {
    pub fn new(
        proc: &'a Procedure,
        partials: &'a PartialDefinitions,
        uninit: &'a UninitializedReads,
        skip_loops: &'a SkipLoops,
        explosion_guard_limit: usize,
    ) -> Self {
        Self {
            proc,
            partials,
            uninit,
            skip_loops,
            explosion_guard_limit,
        }
    }

    /// Resolve every variable in `vars`
    pub fn resolve(&self, vars: &[VarId]) -> BlockResolution {
        let mut out = BlockResolution::default();
        for &v in vars {
            self.resolve_variable(v, &mut out);
        }
        out
    }

    fn resolve_variable(&self, var: VarId, out: &mut BlockResolution) {
        let mut defs = self.definition_points(var);
        if defs.is_empty() {
            return;
        }

        let live = live_in_blocks(self.proc, var);

        // Bounding the fallback's combinatorial cost: a variable whose
        // live-block/definition product is too large yields definition
        // points without reach information.
        let product = live.len().saturating_mul(defs.len());
        if product > self.explosion_guard_limit {
            warn!(
                variable = self.proc.var(var).name.as_str(),
                live_blocks = live.len(),
                definitions = defs.len(),
                limit = self.explosion_guard_limit,
                "explosion guard: excluding variable from reach computation"
            );
            out.guarded.insert(var);
            out.vars.append(&mut defs);
            return;
        }

        for def in &mut defs {
            def.reached_uses = self.reached_uses(def, &live);
        }
        debug!(
            variable = self.proc.var(var).name.as_str(),
            definitions = defs.len(),
            "block-liveness resolution complete"
        );
        out.vars.append(&mut defs);
    }

    /// Discover the definition points of `var`, one BlockVar per sub-block
    fn definition_points(&self, var: VarId) -> Vec<BlockVar> {
        let mut by_block: FxHashMap<SubBlockId, BlockVar> = FxHashMap::default();
        let mut order: Vec<SubBlockId> = Vec::new();

        for e in &self.proc.exprs {
            if e.kind.full_def_of() == Some(var) {
                let bv = entry_for(&mut by_block, &mut order, var, e.sub_block);
                if bv.def_expr.is_none() {
                    bv.def_expr = Some(e.id);
                }
            }
        }
        for &pd in self.partials.of_variable(var) {
            let p = self.partials.get(pd);
            let bv = entry_for(&mut by_block, &mut order, var, p.sub_block);
            bv.partials.push(pd);
            if p.kind == PartialDefKind::ReferenceArgument && bv.ref_def.is_none() {
                bv.ref_def = Some(pd);
            }
        }
        if self.proc.var(var).is_parameter() {
            let bv = entry_for(&mut by_block, &mut order, var, self.proc.entry);
            bv.is_initial_value = true;
        }
        if self.uninit.flags_any(var) {
            if let Some(decl) = self.proc.var(var).decl_sub_block {
                let bv = entry_for(&mut by_block, &mut order, var, decl);
                bv.is_initial_value = true;
            }
        }

        order.into_iter().filter_map(|s| by_block.remove(&s)).collect()
    }

    /// Forward reach from one definition point
    fn reached_uses(&self, def: &BlockVar, live: &FxHashSet<SubBlockId>) -> Vec<ExprId> {
        let var = def.variable;
        let mut uses: Vec<ExprId> = Vec::new();

        // Uses inside the defining sub-block, after the defining event.
        // An initial-value definition precedes every event.
        let def_pos = self.defining_position(def);
        for (pos, e) in self.proc.events_in(def.sub_block).enumerate() {
            if e.kind.read_of() == Some(var) && def_pos.is_none_or(|d| pos > d) {
                uses.push(e.id);
            }
        }

        // Forward propagation; the defining block itself may be re-entered
        // around a loop, in which case its own full assignment takes over
        // like any other successor's.
        let mut visited: FxHashSet<SubBlockId> = FxHashSet::default();
        let mut stack: Vec<(SubBlockId, SubBlockId)> = self.proc.sub_blocks[def.sub_block]
            .successors
            .iter()
            .map(|&s| (def.sub_block, s))
            .collect();

        while let Some((from, sbb)) = stack.pop() {
            if visited.contains(&sbb) {
                continue;
            }
            if self.skip_loops.suppresses(var, def.sub_block, from, sbb) {
                continue;
            }
            if !live.contains(&sbb) {
                continue;
            }
            visited.insert(sbb);

            let takeover = self.first_full_assign_position(sbb, var);
            for (pos, e) in self.proc.events_in(sbb).enumerate() {
                if pos >= takeover.unwrap_or(usize::MAX) {
                    break;
                }
                if e.kind.read_of() == Some(var) {
                    uses.push(e.id);
                }
            }
            if takeover.is_some() {
                // That successor's own definition carries on from here.
                continue;
            }
            stack.extend(
                self.proc.sub_blocks[sbb]
                    .successors
                    .iter()
                    .map(|&s| (sbb, s)),
            );
        }

        uses.sort_unstable();
        uses.dedup();
        uses
    }

    /// Position of the first defining event inside the defining sub-block;
    /// `None` for initial-value definitions, which precede every event
    fn defining_position(&self, def: &BlockVar) -> Option<usize> {
        if def.is_initial_value {
            return None;
        }
        let mut positions: Vec<usize> = Vec::new();
        if let Some(e) = def.def_expr {
            positions.extend(self.proc.position_in_sub_block(e));
        }
        for &pd in &def.partials {
            positions.extend(
                self.proc
                    .position_in_sub_block(self.partials.get(pd).expr),
            );
        }
        positions.into_iter().min().or(Some(0))
    }

    fn first_full_assign_position(&self, sbb: SubBlockId, var: VarId) -> Option<usize> {
        self.proc
            .events_in(sbb)
            .position(|e| e.kind.full_def_of() == Some(var))
    }
}

/// One BlockVar per defining sub-block; `order` records first-seen order.
fn entry_for<'m>(
    by_block: &'m mut FxHashMap<SubBlockId, BlockVar>,
    order: &mut Vec<SubBlockId>,
    var: VarId,
    sbb: SubBlockId,
) -> &'m mut BlockVar {
    by_block.entry(sbb).or_insert_with(|| {
        order.push(sbb);
        BlockVar {
            variable: var,
            sub_block: sbb,
            def_expr: None,
            is_initial_value: false,
            ref_def: None,
            partials: Vec::new(),
            reached_uses: Vec::new(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::block_liveness::infrastructure::skip_loop;
    use crate::features::cfg::infrastructure::{CfgContext, ProcedureBuilder};
    use crate::features::partial_def;
    use crate::features::uninit;

    const LIMIT: usize = 1_000_000;

    struct Fixture {
        proc: Procedure,
        partials: PartialDefinitions,
        uninit: UninitializedReads,
        skip: SkipLoops,
    }

    impl Fixture {
        fn new(proc: Procedure) -> Self {
            let cfg = CfgContext::new(&proc);
            let partials = partial_def::detect(&proc);
            let uninit = uninit::detect(&proc, &cfg, &partials);
            let skip = skip_loop::compute(&proc);
            Self {
                proc,
                partials,
                uninit,
                skip,
            }
        }

        fn resolve(&self, vars: &[VarId], limit: usize) -> BlockResolution {
            BlockResolver::new(&self.proc, &self.partials, &self.uninit, &self.skip, limit)
                .resolve(vars)
        }
    }

    #[test]
    fn test_kill_stops_reach_at_reassigning_successor() {
        // s0: x = 0;  s1: x = 1;  s2: use(x)
        let mut b = ProcedureBuilder::new("f");
        let x = b.local("x");
        let s0 = b.sub_block();
        let s1 = b.sub_block();
        let s2 = b.sub_block();
        b.edge(s0, s1);
        b.edge(s1, s2);
        b.init(s0, x);
        b.assign(s1, x);
        let u = b.read(s2, x);
        let fx = Fixture::new(b.finish().unwrap());

        let res = fx.resolve(&[x], LIMIT);
        let d0 = res.vars.iter().find(|d| d.sub_block == s0).unwrap();
        let d1 = res.vars.iter().find(|d| d.sub_block == s1).unwrap();
        assert!(d0.reached_uses.is_empty());
        assert_eq!(d1.reached_uses, vec![u]);
    }

    #[test]
    fn test_partial_definition_does_not_kill_prior_full_definition() {
        // obj = ...; obj.field = 1; use(obj);
        let mut b = ProcedureBuilder::new("f");
        let obj = b.local("obj");
        let s0 = b.sub_block();
        let s1 = b.sub_block();
        let s2 = b.sub_block();
        b.edge(s0, s1);
        b.edge(s1, s2);
        b.init(s0, obj);
        b.field_store(s1, obj);
        let u = b.read(s2, obj);
        let fx = Fixture::new(b.finish().unwrap());

        let res = fx.resolve(&[obj], LIMIT);
        let full = res.vars.iter().find(|d| d.sub_block == s0).unwrap();
        let partial = res.vars.iter().find(|d| d.sub_block == s1).unwrap();

        // The prior full definition still reaches the use after the
        // partial mutation; the partial definition coexists and reaches it
        // too.
        assert_eq!(full.reached_uses, vec![u]);
        assert_eq!(partial.reached_uses, vec![u]);
        assert!(full.def_expr.is_some());
        assert!(partial.def_expr.is_none());
        assert_eq!(partial.partials.len(), 1);
    }

    #[test]
    fn test_skip_loop_suppresses_pre_loop_definition() {
        // x = 0; while (cond-true-on-entry) { x = f(); } use(x);
        // Without the exemption the pre-loop definition would reach the
        // post-loop read through the condition block alone.
        let mut b = ProcedureBuilder::new("f");
        let x = b.local("x");
        let before = b.sub_block();
        let cond = b.sub_block();
        let body = b.sub_block();
        let after = b.sub_block();
        b.edge(before, cond);
        b.edge(cond, body);
        b.edge(body, cond);
        b.edge(cond, after);
        b.init(before, x);
        b.assign(body, x);
        let u = b.read(after, x);
        b.add_loop(cond, vec![cond, body], vec![(cond, after)], true, false);
        let fx = Fixture::new(b.finish().unwrap());

        let res = fx.resolve(&[x], LIMIT);
        let pre = res.vars.iter().find(|d| d.sub_block == before).unwrap();
        let inner = res.vars.iter().find(|d| d.sub_block == body).unwrap();

        // The pre-loop definition never escapes the loop; the in-loop
        // definition reaches the post-loop read.
        assert!(!pre.reached_uses.contains(&u));
        assert!(inner.reached_uses.contains(&u));
    }

    #[test]
    fn test_explosion_guard_yields_defs_without_reaches() {
        let mut b = ProcedureBuilder::new("f");
        let x = b.local("x");
        let s0 = b.sub_block();
        let s1 = b.sub_block();
        b.edge(s0, s1);
        b.init(s0, x);
        let _u = b.read(s1, x);
        let fx = Fixture::new(b.finish().unwrap());

        // live=1, defs=1: product 1 > limit 0 trips the guard
        let res = fx.resolve(&[x], 0);
        assert!(res.guarded.contains(&x));
        assert!(res.vars.iter().all(|d| d.reached_uses.is_empty()));
        assert!(!res.vars.is_empty());
    }

    #[test]
    fn test_parameter_initial_value_definition_at_entry() {
        let mut b = ProcedureBuilder::new("f");
        let p = b.param("p");
        let s0 = b.sub_block();
        let u = b.read(s0, p);
        // A partial definition makes p ineligible for SSA in practice.
        b.field_store(s0, p);
        let fx = Fixture::new(b.finish().unwrap());

        let res = fx.resolve(&[p], LIMIT);
        let entry_def = res.vars.iter().find(|d| d.is_initial_value).unwrap();
        assert_eq!(entry_def.sub_block, s0);
        assert_eq!(entry_def.reached_uses, vec![u]);
    }

    #[test]
    fn test_definition_facts_coalesce_into_one_block_var() {
        // x = 0; x.f = 1; both anchored in the same sub-block
        let mut b = ProcedureBuilder::new("f");
        let x = b.local("x");
        let s0 = b.sub_block();
        b.init(s0, x);
        b.field_store(s0, x);
        let fx = Fixture::new(b.finish().unwrap());

        let res = fx.resolve(&[x], LIMIT);
        assert_eq!(res.vars.len(), 1);
        let bv = &res.vars[0];
        assert_eq!(bv.sub_block, s0);
        assert!(bv.def_expr.is_some());
        assert_eq!(bv.partials.len(), 1);
        assert!(!bv.is_initial_value);
    }

    #[test]
    fn test_uninitialized_local_gets_declaration_definition() {
        // int y; if (c) { y = 5; } return y;
        let mut b = ProcedureBuilder::new("f");
        let y = b.local("y");
        let s0 = b.sub_block();
        let then = b.sub_block();
        let join = b.sub_block();
        b.edge(s0, then);
        b.edge(s0, join);
        b.edge(then, join);
        b.declare(s0, y);
        b.assign(then, y);
        let ret = b.read(join, y);
        let fx = Fixture::new(b.finish().unwrap());

        let res = fx.resolve(&[y], LIMIT);
        let decl_def = res.vars.iter().find(|d| d.is_initial_value).unwrap();
        assert_eq!(decl_def.sub_block, s0);
        // The indeterminate initial value may reach the return.
        assert_eq!(decl_def.reached_uses, vec![ret]);
        let assigned = res.vars.iter().find(|d| d.sub_block == then).unwrap();
        assert_eq!(assigned.reached_uses, vec![ret]);
    }

    #[test]
    fn test_loop_reentry_reaches_reads_before_reassignment() {
        // do { use(x); x = f(); } while (c), one sub-block cycling on itself
        let mut b = ProcedureBuilder::new("f");
        let x = b.local("x");
        let s0 = b.sub_block();
        let s1 = b.sub_block();
        b.edge(s0, s1);
        b.edge(s1, s1);
        b.init(s0, x);
        let u = b.read(s1, x);
        b.assign(s1, x);
        let fx = Fixture::new(b.finish().unwrap());

        let res = fx.resolve(&[x], LIMIT);
        let inner = res.vars.iter().find(|d| d.sub_block == s1).unwrap();
        // The in-block definition wraps around the back edge to its own
        // earlier read.
        assert!(inner.reached_uses.contains(&u));
    }
}
