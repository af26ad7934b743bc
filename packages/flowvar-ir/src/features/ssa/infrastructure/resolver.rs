/*
 * SSA-backed reached-use resolution
 *
 * For a non-phi definition, the reached uses are:
 * - reads mapped directly to that definition, plus
 * - reads mapped to any merge definition reachable from it by following
 *   merge-input links transitively (the closure only ever passes through
 *   phi definitions. A non-merge definition overwrites the value, so the
 *   chain never re-enters one), plus
 * - constructor field-initializer accesses of the parameter, which are not
 *   standard CFG nodes and are therefore always included.
 *
 * Merge definitions themselves are never surfaced to callers.
 */

use ahash::AHashMap as HashMap;
use rustc_hash::FxHashSet;

use crate::features::cfg::domain::{ExprId, Procedure, SubBlockId, VarId};
use crate::features::ssa::domain::{SsaDefId, SsaDefKind, SsaDefinition};
use crate::features::ssa::infrastructure::builder::SsaForm;

pub struct SsaResolver<'a> {
    proc: &'a Procedure,
    ssa: SsaForm,
    /// Definition → merge definitions taking it as input
    phi_users: HashMap<SsaDefId, Vec<SsaDefId>>,
    /// Definition → reads mapped directly to it
    direct_uses: HashMap<SsaDefId, Vec<ExprId>>,
}

impl<'a> SsaResolver<'a> {
    pub fn new(proc: &'a Procedure, ssa: SsaForm) -> Self {
        let mut phi_users: HashMap<SsaDefId, Vec<SsaDefId>> = HashMap::new();
        for def in &ssa.defs {
            if def.is_phi() {
                for &input in &def.inputs {
                    phi_users.entry(input).or_default().push(def.id);
                }
            }
        }
        let mut direct_uses: HashMap<SsaDefId, Vec<ExprId>> = HashMap::new();
        for (&read, &def) in &ssa.use_def {
            direct_uses.entry(def).or_default().push(read);
        }
        Self {
            proc,
            ssa,
            phi_users,
            direct_uses,
        }
    }

    /// Non-phi definitions of `var`
    pub fn visible_defs_of(&self, var: VarId) -> Vec<&SsaDefinition> {
        self.ssa.visible_defs_of(var).collect()
    }

    pub fn def(&self, id: SsaDefId) -> &SsaDefinition {
        self.ssa.def(id)
    }

    /// The defining expression event, for expression-backed definitions
    pub fn defining_expr(&self, id: SsaDefId) -> Option<ExprId> {
        match self.ssa.def(id).kind {
            SsaDefKind::Expr(e) => Some(e),
            _ => None,
        }
    }

    pub fn sub_block_of(&self, id: SsaDefId) -> SubBlockId {
        self.ssa.def(id).sub_block
    }

    /// Every read access that may observe the value of `def`
    pub fn reached_uses(&self, def: SsaDefId) -> Vec<ExprId> {
        let mut closure: FxHashSet<SsaDefId> = FxHashSet::default();
        let mut stack = vec![def];
        while let Some(d) = stack.pop() {
            if !closure.insert(d) {
                continue;
            }
            if let Some(users) = self.phi_users.get(&d) {
                stack.extend(users.iter().copied());
            }
        }

        let mut uses: Vec<ExprId> = closure
            .iter()
            .filter_map(|d| self.direct_uses.get(d))
            .flatten()
            .copied()
            .collect();

        // Field initializers sit outside the CFG; a constructor parameter
        // used there is always reached.
        let var = self.ssa.def(def).variable;
        if self.proc.is_constructor && self.proc.var(var).is_parameter() {
            for e in &self.proc.exprs {
                if e.in_field_init && e.kind.read_of() == Some(var) && !uses.contains(&e.id) {
                    uses.push(e.id);
                }
            }
        }

        uses.sort_unstable();
        uses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::cfg::infrastructure::{CfgContext, ProcedureBuilder};
    use crate::features::ssa::infrastructure::builder::SsaBuilder;

    fn resolve<'a>(proc: &'a Procedure, vars: &[VarId]) -> SsaResolver<'a> {
        let cfg = CfgContext::new(proc);
        let eligible: FxHashSet<VarId> = vars.iter().copied().collect();
        let ssa = SsaBuilder::new(proc, &cfg, &eligible).build();
        SsaResolver::new(proc, ssa)
    }

    #[test]
    fn test_branch_defs_reach_through_merge() {
        // x = 0; if (b) { use(x); x = 1; } use(x);
        let mut b = ProcedureBuilder::new("f");
        let x = b.local("x");
        let s0 = b.sub_block();
        let then = b.sub_block();
        let join = b.sub_block();
        b.edge(s0, then);
        b.edge(s0, join);
        b.edge(then, join);
        let d0 = b.init(s0, x);
        let u_then = b.read(then, x);
        let d1 = b.assign(then, x);
        let u_join = b.read(join, x);
        let proc = b.finish().unwrap();

        let resolver = resolve(&proc, &[x]);
        let defs = resolver.visible_defs_of(x);
        assert_eq!(defs.len(), 2);

        let def0 = defs.iter().find(|d| d.kind == SsaDefKind::Expr(d0)).unwrap();
        let def1 = defs.iter().find(|d| d.kind == SsaDefKind::Expr(d1)).unwrap();

        // x=0 reaches the branch use and, through the merge, the join use.
        assert_eq!(resolver.reached_uses(def0.id), vec![u_then, u_join]);
        // x=1 reaches only the join use.
        assert_eq!(resolver.reached_uses(def1.id), vec![u_join]);
    }

    #[test]
    fn test_merge_defs_not_surfaced() {
        let mut b = ProcedureBuilder::new("f");
        let x = b.local("x");
        let s0 = b.sub_block();
        let t = b.sub_block();
        let f = b.sub_block();
        let j = b.sub_block();
        b.edge(s0, t);
        b.edge(s0, f);
        b.edge(t, j);
        b.edge(f, j);
        b.init(s0, x);
        b.assign(t, x);
        b.assign(f, x);
        b.read(j, x);
        let proc = b.finish().unwrap();

        let resolver = resolve(&proc, &[x]);
        assert!(resolver.visible_defs_of(x).iter().all(|d| !d.is_phi()));
        assert_eq!(resolver.visible_defs_of(x).len(), 3);
    }

    #[test]
    fn test_dead_definition_reaches_nothing() {
        // x = 0; x = 1; use(x);
        let mut b = ProcedureBuilder::new("f");
        let x = b.local("x");
        let s0 = b.sub_block();
        let d0 = b.init(s0, x);
        b.assign(s0, x);
        b.read(s0, x);
        let proc = b.finish().unwrap();

        let resolver = resolve(&proc, &[x]);
        let dead = resolver
            .visible_defs_of(x)
            .into_iter()
            .find(|d| d.kind == SsaDefKind::Expr(d0))
            .unwrap()
            .id;
        assert!(resolver.reached_uses(dead).is_empty());
    }

    #[test]
    fn test_constructor_param_field_initializer_always_included() {
        // Ctor(p) : field(p) {}
        let mut b = ProcedureBuilder::constructor("Ctor");
        let p = b.param("p");
        let _s0 = b.sub_block();
        let fi = b.field_init_read(p);
        let proc = b.finish().unwrap();

        let resolver = resolve(&proc, &[p]);
        let defs = resolver.visible_defs_of(p);
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].kind, SsaDefKind::InitialValue);
        assert!(resolver.reached_uses(defs[0].id).contains(&fi));
    }
}
