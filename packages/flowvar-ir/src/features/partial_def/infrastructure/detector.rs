/*
 * Partial-Definition Detector
 *
 * Single pass over the expression events of a procedure, in program order,
 * producing the complete set of PartialDefinition facts. Three structural
 * rules:
 *
 * 1. Field-store-through-qualifier: `q.f = ...`; the field is the
 *    assignment target, so the qualifier `q` is what gets partially defined.
 * 2. Call-qualifier: `q.m(...)` where `m` is not const-qualified. No attempt
 *    is made to distinguish receivers the callee never writes; any non-const
 *    call counts.
 * 3. Reference-argument: an argument whose parameter type (qualifiers
 *    stripped) is a non-const reference or non-const pointer, fed a bare
 *    variable access, `&v`, or `&a[0]` (the last aliases the whole array).
 *
 * These are shape matches over expression and type structure, not alias
 * analysis; the result is an over-approximation by design. Pure derivation,
 * no failure modes; no matches is the normal outcome.
 */

use ahash::AHashMap as HashMap;

use crate::features::cfg::domain::{ArgShape, ExprKind, Procedure, VarId};
use crate::features::partial_def::domain::{PartialDefId, PartialDefKind, PartialDefinition};

/// All partial definitions of one procedure, with a per-variable index
#[derive(Debug, Default)]
pub struct PartialDefinitions {
    defs: Vec<PartialDefinition>,
    by_variable: HashMap<VarId, Vec<PartialDefId>>,
}

impl PartialDefinitions {
    pub fn all(&self) -> &[PartialDefinition] {
        &self.defs
    }

    pub fn get(&self, id: PartialDefId) -> &PartialDefinition {
        &self.defs[id]
    }

    /// Does any partial definition name `var`?
    pub fn names(&self, var: VarId) -> bool {
        self.by_variable.contains_key(&var)
    }

    pub fn of_variable(&self, var: VarId) -> &[PartialDefId] {
        self.by_variable.get(&var).map(Vec::as_slice).unwrap_or(&[])
    }

    fn push(&mut self, kind: PartialDefKind, variable: VarId, proc: &Procedure, expr: usize) {
        let id = self.defs.len();
        let e = proc.expr(expr);
        self.defs.push(PartialDefinition {
            id,
            kind,
            variable,
            expr,
            sub_block: e.sub_block,
            span: e.span,
        });
        self.by_variable.entry(variable).or_default().push(id);
    }
}

/// Detect every partial definition in `proc`
pub fn detect(proc: &Procedure) -> PartialDefinitions {
    let mut out = PartialDefinitions::default();
    for expr in &proc.exprs {
        match &expr.kind {
            ExprKind::FieldStore { qualifier } => {
                out.push(PartialDefKind::FieldStore, *qualifier, proc, expr.id);
            }
            ExprKind::Call {
                qualifier,
                const_qualified,
                args,
            } => {
                if let Some(q) = qualifier {
                    if !const_qualified {
                        out.push(PartialDefKind::CallQualifier, *q, proc, expr.id);
                    }
                }
                for arg in args {
                    if !arg.param.is_writable_indirection() {
                        continue;
                    }
                    let var = match arg.shape {
                        ArgShape::VarAccess(v)
                        | ArgShape::AddressOfVar(v)
                        | ArgShape::AddressOfArrayZero(v) => v,
                        ArgShape::Other => continue,
                    };
                    out.push(PartialDefKind::ReferenceArgument, var, proc, expr.id);
                }
            }
            _ => {}
        }
    }
    out
}
