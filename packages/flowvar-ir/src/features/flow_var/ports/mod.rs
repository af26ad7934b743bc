/*
 * Flow-Variable Ports (Hexagonal Architecture)
 *
 * Input port and configuration DTO for the resolution engine. The outer
 * taint/data-flow driver talks to the engine exclusively through
 * `FlowVarResolutionService`.
 */

use serde::{Deserialize, Serialize};

use crate::features::cfg::domain::Procedure;
use crate::features::flow_var::application::FlowVarAnalysis;
use crate::shared::models::Result;

/// Default cap on (live-in blocks × definition points) per variable
pub const DEFAULT_EXPLOSION_GUARD_LIMIT: usize = 1_000_000;

/// Engine configuration
///
/// The guard threshold is workload-dependent; expose it as a tunable
/// rather than a constant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// A variable whose live-block/definition product exceeds this limit
    /// is excluded from reach computation by the fallback resolver
    pub explosion_guard_limit: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            explosion_guard_limit: DEFAULT_EXPLOSION_GUARD_LIMIT,
        }
    }
}

impl ResolverConfig {
    pub fn with_explosion_guard_limit(mut self, limit: usize) -> Self {
        self.explosion_guard_limit = limit;
        self
    }
}

/// Main input port for flow-variable resolution
///
/// Driving adapters (the analysis driver, tests) call this to obtain the
/// reaching-definitions relation of one or many procedures.
pub trait FlowVarResolutionService: Send + Sync {
    /// Resolve every variable of one procedure body
    fn resolve_procedure(&self, proc: &Procedure) -> Result<FlowVarAnalysis>;

    /// Resolve a batch of independent procedures
    fn resolve_all(&self, procs: &[Procedure]) -> Vec<Result<FlowVarAnalysis>>;
}
