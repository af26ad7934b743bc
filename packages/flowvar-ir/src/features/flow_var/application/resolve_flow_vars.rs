/*
 * Flow-variable resolution use case
 *
 * Composes the two resolvers behind the unified facade. Per procedure:
 * classify every variable once (fully-SSA-supported or not), delegate
 * supported variables to the SSA resolver and everything else to the
 * block-liveness resolver, then materialize the combined `FlowVar` set.
 *
 * Classification is the load-bearing decision: a variable is handled by
 * exactly one resolver, never both. Member-storage variables are handled
 * by neither (left to the inter-procedural layer).
 */

use rayon::prelude::*;
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::features::block_liveness::domain::BlockVar;
use crate::features::block_liveness::infrastructure::skip_loop;
use crate::features::block_liveness::infrastructure::{BlockResolver, SkipLoops};
use crate::features::cfg::domain::{ExprKind, Procedure, StorageClass, VarId};
use crate::features::cfg::infrastructure::CfgContext;
use crate::features::flow_var::domain::{FlowVar, FlowVarOrigin};
use crate::features::flow_var::ports::{FlowVarResolutionService, ResolverConfig};
use crate::features::partial_def;
use crate::features::partial_def::domain::PartialDefinition;
use crate::features::partial_def::infrastructure::PartialDefinitions;
use crate::features::ssa::domain::SsaDefKind;
use crate::features::ssa::infrastructure::{has_ssa_definition, SsaBuilder, SsaResolver};
use crate::features::uninit;
use crate::features::uninit::domain::UninitializedRead;
use crate::features::uninit::infrastructure::UninitializedReads;
use crate::shared::models::{Result, Span};

/// The resolved reaching-definitions relation of one procedure
#[derive(Debug, Clone)]
pub struct FlowVarAnalysis {
    pub procedure: String,
    pub flow_vars: Vec<FlowVar>,
    pub partial_definitions: Vec<PartialDefinition>,
    pub uninitialized_reads: Vec<UninitializedRead>,
    /// Variables delegated to the SSA resolver
    pub ssa_supported: Vec<VarId>,
    /// Variables excluded from reach computation by the explosion guard
    pub guarded: Vec<VarId>,
}

impl FlowVarAnalysis {
    pub fn flow_vars_of(&self, var: VarId) -> impl Iterator<Item = &FlowVar> {
        self.flow_vars.iter().filter(move |fv| fv.variable == var)
    }

    pub fn is_ssa_supported(&self, var: VarId) -> bool {
        self.ssa_supported.contains(&var)
    }
}

/// Is `var` handled exactly by the SSA resolver?
///
/// Requires a single-assignment definition to exist, no partial
/// definition naming the variable, no possibly-uninitialized read, no
/// skip-loop special-casing, local or parameter storage, and a
/// non-reference type (references collapse onto their referent, which
/// the single-assignment form handles inaccurately).
pub fn is_fully_supported(
    proc: &Procedure,
    var: VarId,
    partials: &PartialDefinitions,
    uninit: &UninitializedReads,
    skip: &SkipLoops,
) -> bool {
    let v = proc.var(var);
    matches!(v.storage, StorageClass::Local | StorageClass::Parameter)
        && !v.ty.is_reference
        && has_ssa_definition(proc, var)
        && !partials.names(var)
        && !uninit.flags_any(var)
        && !skip.is_subject(var)
}

pub struct ResolveFlowVars {
    config: ResolverConfig,
}

impl Default for ResolveFlowVars {
    fn default() -> Self {
        Self::new(ResolverConfig::default())
    }
}

impl ResolveFlowVars {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn execute(&self, proc: &Procedure) -> Result<FlowVarAnalysis> {
        proc.validate()?;

        let cfg = CfgContext::new(proc);
        let partials = partial_def::detect(proc);
        let uninit = uninit::detect(proc, &cfg, &partials);
        let skip = skip_loop::compute(proc);

        let mut supported: Vec<VarId> = Vec::new();
        let mut fallback: Vec<VarId> = Vec::new();
        for v in &proc.variables {
            if is_fully_supported(proc, v.id, &partials, &uninit, &skip) {
                supported.push(v.id);
            } else if v.storage != StorageClass::Member {
                fallback.push(v.id);
            }
        }

        let mut flow_vars: Vec<FlowVar> = Vec::new();

        let eligible: FxHashSet<VarId> = supported.iter().copied().collect();
        let ssa = SsaBuilder::new(proc, &cfg, &eligible).build();
        let resolver = SsaResolver::new(proc, ssa);
        for &var in &supported {
            let defs: Vec<_> = resolver
                .visible_defs_of(var)
                .iter()
                .map(|d| d.id)
                .collect();
            for def in defs {
                flow_vars.push(self.ssa_flow_var(proc, &resolver, var, def));
            }
        }

        let block = BlockResolver::new(
            proc,
            &partials,
            &uninit,
            &skip,
            self.config.explosion_guard_limit,
        )
        .resolve(&fallback);
        for bv in &block.vars {
            flow_vars.push(self.block_flow_var(proc, &partials, bv));
        }

        let mut guarded: Vec<VarId> = block.guarded.into_iter().collect();
        guarded.sort_unstable();

        debug!(
            procedure = proc.name.as_str(),
            flow_vars = flow_vars.len(),
            ssa_supported = supported.len(),
            fallback = fallback.len(),
            guarded = guarded.len(),
            "flow-variable resolution complete"
        );

        Ok(FlowVarAnalysis {
            procedure: proc.name.clone(),
            flow_vars,
            partial_definitions: partials.all().to_vec(),
            uninitialized_reads: uninit.all().to_vec(),
            ssa_supported: supported,
            guarded,
        })
    }

    /// Resolve a batch of procedures; each body is an independent,
    /// read-only derivation, so the batch fans out without coordination
    pub fn execute_all(&self, procs: &[Procedure]) -> Vec<Result<FlowVarAnalysis>> {
        procs.par_iter().map(|p| self.execute(p)).collect()
    }

    fn ssa_flow_var(
        &self,
        proc: &Procedure,
        resolver: &SsaResolver<'_>,
        var: VarId,
        def: crate::features::ssa::domain::SsaDefId,
    ) -> FlowVar {
        let name = proc.var(var).name.as_str();
        let (def_expr, is_initial_value, span, description) = match resolver.def(def).kind {
            SsaDefKind::Expr(e) => {
                let expr = proc.expr(e);
                let desc = match expr.kind {
                    ExprKind::Init(_) => format!("initialization of {name}"),
                    _ => format!("definition of {name}"),
                };
                (Some(e), false, expr.span, desc)
            }
            SsaDefKind::InitialValue => (
                None,
                true,
                proc.sub_block(proc.entry).span,
                format!("initial value of {name}"),
            ),
            // Merge definitions are filtered out by visible_defs_of.
            SsaDefKind::Phi => (None, false, Span::zero(), format!("undefined {name}")),
        };
        FlowVar {
            variable: var,
            origin: FlowVarOrigin::Ssa { def },
            def_expr,
            is_initial_value,
            ref_def: None,
            partials: Vec::new(),
            reached_uses: resolver.reached_uses(def),
            span,
            description,
        }
    }

    fn block_flow_var(
        &self,
        proc: &Procedure,
        partials: &PartialDefinitions,
        bv: &BlockVar,
    ) -> FlowVar {
        let name = proc.var(bv.variable).name.as_str();
        let (span, description) = if let Some(e) = bv.def_expr {
            let expr = proc.expr(e);
            let desc = match expr.kind {
                ExprKind::Init(_) => format!("initialization of {name}"),
                _ => format!("definition of {name}"),
            };
            (expr.span, desc)
        } else if bv.is_initial_value {
            (
                proc.sub_block(bv.sub_block).span,
                format!("initial value of {name}"),
            )
        } else if let Some(pd) = bv.ref_def {
            (
                partials.get(pd).span,
                format!("definition by reference of {name}"),
            )
        } else if let Some(&pd) = bv.partials.first() {
            (partials.get(pd).span, format!("partial definition of {name}"))
        } else {
            // Unusual CFG shapes resolve to the textual fallback rather
            // than aborting the procedure's analysis.
            (proc.sub_block(bv.sub_block).span, format!("undefined {name}"))
        };
        FlowVar {
            variable: bv.variable,
            origin: FlowVarOrigin::Block {
                sub_block: bv.sub_block,
            },
            def_expr: bv.def_expr,
            is_initial_value: bv.is_initial_value,
            ref_def: bv.ref_def,
            partials: bv.partials.clone(),
            reached_uses: bv.reached_uses.clone(),
            span,
            description,
        }
    }
}

impl FlowVarResolutionService for ResolveFlowVars {
    fn resolve_procedure(&self, proc: &Procedure) -> Result<FlowVarAnalysis> {
        self.execute(proc)
    }

    fn resolve_all(&self, procs: &[Procedure]) -> Vec<Result<FlowVarAnalysis>> {
        self.execute_all(procs)
    }
}
