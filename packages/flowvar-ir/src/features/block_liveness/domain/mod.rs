//! Block-liveness resolver domain model
//!
//! The fallback representation: one definition event per
//! (sub-basic-block, variable) pair, for every variable the precise SSA
//! resolver cannot handle faithfully.

use serde::{Deserialize, Serialize};

use crate::features::cfg::domain::{ExprId, SubBlockId, VarId};
use crate::features::partial_def::domain::PartialDefId;

/// A definition point at sub-basic-block granularity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockVar {
    pub variable: VarId,
    pub sub_block: SubBlockId,
    /// First initializer/assignment event in the sub-block, if any
    pub def_expr: Option<ExprId>,
    /// The block is the function entry (parameter) or the declaration block
    /// of a local read before any write
    pub is_initial_value: bool,
    /// A reference-argument partial definition anchored here, if any
    pub ref_def: Option<PartialDefId>,
    /// Every partial definition anchored here (field-qualifier,
    /// call-qualifier, or reference-argument alike)
    pub partials: Vec<PartialDefId>,
    /// Reads that may observe this definition's value; empty when the
    /// explosion guard excluded the variable
    pub reached_uses: Vec<ExprId>,
}

impl BlockVar {
    /// At least one defining description applies (construction guarantees
    /// this; a bare sub-block never becomes a BlockVar)
    pub fn is_defined(&self) -> bool {
        self.def_expr.is_some()
            || self.is_initial_value
            || self.ref_def.is_some()
            || !self.partials.is_empty()
    }
}
