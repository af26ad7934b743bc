//! Single-assignment form domain model
//!
//! Each definition of a variable is syntactically distinct; merge (phi)
//! definitions are inserted where several definitions may reach the same
//! use. Phi definitions are internal plumbing: they are never surfaced as
//! FlowVars, because a merge node's value is definitionally the set of its
//! inputs and surfacing it would create redundant resolution paths.

use serde::{Deserialize, Serialize};

use crate::features::cfg::domain::{ExprId, SubBlockId, VarId};

pub type SsaDefId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SsaDefKind {
    /// Defined by an initializer or assignment event
    Expr(ExprId),
    /// The value a parameter holds on function entry
    InitialValue,
    /// Merge of several incoming definitions
    Phi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SsaDefinition {
    pub id: SsaDefId,
    pub variable: VarId,
    pub sub_block: SubBlockId,
    /// Version counter per base variable, in creation order
    pub version: usize,
    pub kind: SsaDefKind,
    /// Phi inputs; empty for non-phi definitions
    pub inputs: Vec<SsaDefId>,
}

impl SsaDefinition {
    pub fn is_phi(&self) -> bool {
        matches!(self.kind, SsaDefKind::Phi)
    }
}
