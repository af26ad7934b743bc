//! Partial-definition domain model
//!
//! A partial definition is an event that may mutate part of a variable's
//! state without replacing its value wholesale. It never kills a prior full
//! definition; both coexist as defining events.

use serde::{Deserialize, Serialize};

use crate::features::cfg::domain::{ExprId, SubBlockId, VarId};
use crate::shared::models::Span;

pub type PartialDefId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartialDefKind {
    /// Instance-field write reached via a qualifier: `q.f = ...`; `q` is
    /// partially defined
    FieldStore,
    /// Call to a non-const member through a qualifier: `q.m()`; any
    /// non-const call may mutate receiver state
    CallQualifier,
    /// Argument passed by mutable reference or mutable pointer
    ReferenceArgument,
}

/// An event where a variable is mutated without being fully replaced.
/// Names exactly one partially-mutated variable and is anchored at exactly
/// one CFG location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartialDefinition {
    pub id: PartialDefId,
    pub kind: PartialDefKind,
    /// The partially-defined variable
    pub variable: VarId,
    /// The expression event this mutation happens at
    pub expr: ExprId,
    pub sub_block: SubBlockId,
    pub span: Span,
}
