//! Unified flow-variable facade domain model
//!
//! One `FlowVar` per conceptual assignment event, regardless of which
//! resolver produced it. The outer taint engine consumes only this type:
//! the reached-use set, the four classification queries, a description,
//! and a source location.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::features::cfg::domain::{ExprId, SubBlockId, VarId};
use crate::features::partial_def::domain::PartialDefId;
use crate::features::ssa::domain::SsaDefId;
use crate::shared::models::Span;

/// Which resolver backs a `FlowVar`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowVarOrigin {
    /// Backed by a single-assignment-form definition
    Ssa { def: SsaDefId },
    /// Backed by a sub-basic-block location
    Block { sub_block: SubBlockId },
}

/// A single conceptual assignment event to a variable
///
/// SSA-backed instances answer exactly one of `defined_by_expr` /
/// `defined_by_initial_value`. Block-backed instances may additionally
/// carry partial definitions as a side annotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowVar {
    pub variable: VarId,
    pub origin: FlowVarOrigin,
    /// The defining initializer/assignment event, if any
    pub def_expr: Option<ExprId>,
    /// Defined as the value held on function entry (parameter) or at an
    /// unassigned declaration
    pub is_initial_value: bool,
    /// A reference-argument partial definition, if that is what defines it
    pub ref_def: Option<PartialDefId>,
    /// Partial definitions anchored at this event's location
    pub partials: Vec<PartialDefId>,
    /// Reads that may observe this definition's value; empty for dead
    /// definitions and for explosion-guarded variables
    pub reached_uses: Vec<ExprId>,
    pub span: Span,
    pub description: String,
}

impl FlowVar {
    /// Every variable access that may read the value defined here
    pub fn accesses(&self) -> &[ExprId] {
        &self.reached_uses
    }

    pub fn defined_by_expr(&self) -> Option<ExprId> {
        self.def_expr
    }

    pub fn defined_by_initial_value(&self) -> bool {
        self.is_initial_value
    }

    pub fn defined_by_reference(&self) -> Option<PartialDefId> {
        self.ref_def
    }

    pub fn defined_partially_at(&self) -> &[PartialDefId] {
        &self.partials
    }
}

impl fmt::Display for FlowVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}
