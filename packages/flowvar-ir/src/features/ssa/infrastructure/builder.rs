/*
 * On-demand SSA construction (Braun et al., 2013)
 *
 * Simpler than Cytron's; no dominance frontiers. Phi definitions are
 * inserted on demand while reads are resolved:
 *
 * ```
 * def read_variable(var, block):
 *     if var in current_def[block]:
 *         return current_def[block][var]      # local definition
 *     return read_variable_recursive(var, block)
 *
 * def read_variable_recursive(var, block):
 *     if block not sealed:
 *         val = new_phi(block)                # operands filled at sealing
 *     elif len(preds) == 1:
 *         val = read_variable(var, preds[0])
 *     else:
 *         val = new_phi(block)
 *         write_variable(var, block, val)
 *         add_phi_operands(var, val)
 *     write_variable(var, block, val)
 *     return val
 * ```
 *
 * A block is sealed once all of its predecessors are filled; incomplete
 * phis recorded on unsealed blocks get their operands when the seal
 * happens. Trivial phis are left in place; the resolver's merge-chain
 * closure walks through them, so removing them would not change any
 * reached-use set.
 *
 * Only runs over the eligible variable set; everything else belongs to the
 * block-liveness resolver. Construction is restricted to sub-blocks
 * reachable from entry. Reads in unreachable code get no use-def entry,
 * which downstream treats as conservative absence of data.
 *
 * Reference: "Simple and Efficient Construction of SSA Form"
 * (Braun et al., CC 2013).
 */

use ahash::AHashMap as HashMap;
use rustc_hash::FxHashSet;

use crate::features::cfg::domain::{ExprId, Procedure, StorageClass, SubBlockId, VarId};
use crate::features::cfg::infrastructure::CfgContext;
use crate::features::ssa::domain::{SsaDefId, SsaDefKind, SsaDefinition};

/// The single-assignment form of one procedure, over eligible variables only
#[derive(Debug, Default)]
pub struct SsaForm {
    pub defs: Vec<SsaDefinition>,
    /// Each eligible read access → the definition reaching it
    pub use_def: HashMap<ExprId, SsaDefId>,
}

impl SsaForm {
    pub fn def(&self, id: SsaDefId) -> &SsaDefinition {
        &self.defs[id]
    }

    /// Non-phi definitions of `var`, the only ones surfaced to callers
    pub fn visible_defs_of(&self, var: VarId) -> impl Iterator<Item = &SsaDefinition> {
        self.defs
            .iter()
            .filter(move |d| d.variable == var && !d.is_phi())
    }
}

pub struct SsaBuilder<'a> {
    proc: &'a Procedure,
    eligible: &'a FxHashSet<VarId>,
    defs: Vec<SsaDefinition>,
    current_def: HashMap<(SubBlockId, VarId), SsaDefId>,
    incomplete_phis: HashMap<SubBlockId, Vec<(VarId, SsaDefId)>>,
    sealed: FxHashSet<SubBlockId>,
    filled: FxHashSet<SubBlockId>,
    versions: HashMap<VarId, usize>,
    use_def: HashMap<ExprId, SsaDefId>,
    /// Predecessors restricted to reachable sub-blocks
    preds: Vec<Vec<SubBlockId>>,
    reachable: FxHashSet<SubBlockId>,
}

impl<'a> SsaBuilder<'a> {
    pub fn new(proc: &'a Procedure, cfg: &CfgContext, eligible: &'a FxHashSet<VarId>) -> Self {
        let reachable: FxHashSet<SubBlockId> = proc
            .sub_blocks
            .iter()
            .map(|s| s.id)
            .filter(|&s| cfg.is_reachable(s))
            .collect();
        let preds = proc
            .sub_blocks
            .iter()
            .map(|s| {
                s.predecessors
                    .iter()
                    .copied()
                    .filter(|p| reachable.contains(p))
                    .collect()
            })
            .collect();
        Self {
            proc,
            eligible,
            defs: Vec::new(),
            current_def: HashMap::new(),
            incomplete_phis: HashMap::new(),
            sealed: FxHashSet::default(),
            filled: FxHashSet::default(),
            versions: HashMap::new(),
            use_def: HashMap::new(),
            preds,
            reachable,
        }
    }

    pub fn build(mut self) -> SsaForm {
        // Parameters hold their initial value at entry.
        for p in self.proc.parameters() {
            if self.eligible.contains(&p.id) {
                let def = self.new_def(p.id, self.proc.entry, SsaDefKind::InitialValue);
                self.write_variable(p.id, self.proc.entry, def);
            }
        }

        let order = self.reverse_post_order();
        // Blocks with no (reachable) predecessors can be sealed up front.
        for &sbb in &order {
            if self.preds[sbb].is_empty() {
                self.sealed.insert(sbb);
            }
        }

        for &sbb in &order {
            self.fill_block(sbb);
            self.filled.insert(sbb);
            // Seal every block whose predecessors are now all filled.
            let sealable: Vec<SubBlockId> = order
                .iter()
                .copied()
                .filter(|&s| {
                    !self.sealed.contains(&s)
                        && self.preds[s].iter().all(|p| self.filled.contains(p))
                })
                .collect();
            for s in sealable {
                self.seal_block(s);
            }
        }

        SsaForm {
            defs: self.defs,
            use_def: self.use_def,
        }
    }

    fn fill_block(&mut self, sbb: SubBlockId) {
        let events: Vec<ExprId> = self.proc.sub_blocks[sbb].exprs.clone();
        for e in events {
            let kind = self.proc.expr(e).kind.clone();
            if let Some(v) = kind.read_of() {
                if self.eligible.contains(&v) {
                    let def = self.read_variable(v, sbb);
                    self.use_def.insert(e, def);
                }
            }
            if let Some(v) = kind.full_def_of() {
                if self.eligible.contains(&v) {
                    let def = self.new_def(v, sbb, SsaDefKind::Expr(e));
                    self.write_variable(v, sbb, def);
                }
            }
        }
    }

    fn read_variable(&mut self, var: VarId, sbb: SubBlockId) -> SsaDefId {
        if let Some(&d) = self.current_def.get(&(sbb, var)) {
            return d;
        }
        self.read_variable_recursive(var, sbb)
    }

    fn read_variable_recursive(&mut self, var: VarId, sbb: SubBlockId) -> SsaDefId {
        let val = if !self.sealed.contains(&sbb) {
            let phi = self.new_def(var, sbb, SsaDefKind::Phi);
            self.incomplete_phis.entry(sbb).or_default().push((var, phi));
            phi
        } else if self.preds[sbb].len() == 1 {
            let pred = self.preds[sbb][0];
            self.read_variable(var, pred)
        } else if self.preds[sbb].is_empty() {
            // Entry-block read with no prior definition. Eligible variables
            // cannot reach here (an unwritten read would have been flagged
            // uninitialized), so this is a defensive initial value.
            self.new_def(var, sbb, SsaDefKind::InitialValue)
        } else {
            let phi = self.new_def(var, sbb, SsaDefKind::Phi);
            self.write_variable(var, sbb, phi);
            self.add_phi_operands(var, phi, sbb);
            phi
        };
        self.write_variable(var, sbb, val);
        val
    }

    fn add_phi_operands(&mut self, var: VarId, phi: SsaDefId, sbb: SubBlockId) {
        let preds = self.preds[sbb].clone();
        for p in preds {
            let input = self.read_variable(var, p);
            if input != phi && !self.defs[phi].inputs.contains(&input) {
                self.defs[phi].inputs.push(input);
            }
        }
    }

    fn seal_block(&mut self, sbb: SubBlockId) {
        if let Some(pending) = self.incomplete_phis.remove(&sbb) {
            for (var, phi) in pending {
                self.add_phi_operands(var, phi, sbb);
            }
        }
        self.sealed.insert(sbb);
    }

    fn write_variable(&mut self, var: VarId, sbb: SubBlockId, def: SsaDefId) {
        self.current_def.insert((sbb, var), def);
    }

    fn new_def(&mut self, var: VarId, sbb: SubBlockId, kind: SsaDefKind) -> SsaDefId {
        let id = self.defs.len();
        let version = self.versions.entry(var).or_insert(0);
        self.defs.push(SsaDefinition {
            id,
            variable: var,
            sub_block: sbb,
            version: *version,
            kind,
            inputs: Vec::new(),
        });
        *version += 1;
        id
    }

    fn reverse_post_order(&self) -> Vec<SubBlockId> {
        let mut order = Vec::new();
        let mut visited = FxHashSet::default();
        self.post_order(self.proc.entry, &mut visited, &mut order);
        order.reverse();
        order
    }

    fn post_order(
        &self,
        sbb: SubBlockId,
        visited: &mut FxHashSet<SubBlockId>,
        order: &mut Vec<SubBlockId>,
    ) {
        if !visited.insert(sbb) {
            return;
        }
        for &succ in &self.proc.sub_blocks[sbb].successors {
            if self.reachable.contains(&succ) {
                self.post_order(succ, visited, order);
            }
        }
        order.push(sbb);
    }
}

/// Does the variable have at least one single-assignment-form definition?
/// Parameters get an initial-value definition at entry; locals need an
/// initializer or assignment event.
pub fn has_ssa_definition(proc: &Procedure, var: VarId) -> bool {
    let v = proc.var(var);
    v.storage == StorageClass::Parameter
        || proc.exprs.iter().any(|e| e.kind.full_def_of() == Some(var))
}
