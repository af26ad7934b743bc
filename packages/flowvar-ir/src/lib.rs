/*
 * FlowVar IR - Intra-procedural flow-variable resolution engine
 *
 * Computes the reaching-definitions relation of one procedure body: for
 * every local-scope variable, the discrete points at which it receives a
 * value and, per definition, the reads that may observe that value. The
 * relation is what an outer taint/data-flow engine consumes.
 *
 * Feature-First Hexagonal Architecture:
 * - shared/      : Common models (Span, errors)
 * - features/    : Vertical slices (cfg → partial_def → uninit → ssa →
 *                  block_liveness → flow_var)
 *
 * Two resolvers, one contract: a precise SSA-backed resolver for
 * well-behaved variables and a block-liveness fallback for everything
 * else (aliased, partially defined, possibly uninitialized, or trapped
 * by an always-entered loop). The flow_var facade classifies each
 * variable once and delegates to exactly one of the two.
 */

// Crate-level lint configuration
#![allow(clippy::too_many_arguments)] // Analysis entry points carry many collaborators
#![allow(clippy::module_inception)] // Module naming intentional
#![allow(clippy::new_without_default)] // Default impl not always meaningful

pub mod features;
pub mod shared;

pub use features::block_liveness::{BlockResolution, BlockResolver, BlockVar, SkipLoops};
pub use features::cfg::{CfgContext, Procedure, ProcedureBuilder};
pub use features::flow_var::{
    is_fully_supported, FlowVar, FlowVarAnalysis, FlowVarOrigin, FlowVarResolutionService,
    ResolveFlowVars, ResolverConfig,
};
pub use features::partial_def::{PartialDefKind, PartialDefinition, PartialDefinitions};
pub use features::ssa::{SsaBuilder, SsaDefinition, SsaForm, SsaResolver};
pub use features::uninit::{UninitializedLocalVariable, UninitializedRead, UninitializedReads};
pub use shared::models::{FlowVarError, Result, Span};
