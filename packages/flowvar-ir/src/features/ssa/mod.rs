// Single-assignment form and the precise resolver
//
// Hexagonal Architecture:
// - domain: SSA definitions and merge nodes
// - infrastructure: Braun-style construction + reached-use resolution

pub mod domain;
pub mod infrastructure;

pub use domain::{SsaDefId, SsaDefKind, SsaDefinition};
pub use infrastructure::{has_ssa_definition, SsaBuilder, SsaForm, SsaResolver};
