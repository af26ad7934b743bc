//! Uninitialized-read domain model
//!
//! Facts live for the analysis of one procedure body and are never
//! persisted.

use serde::{Deserialize, Serialize};

use crate::features::cfg::domain::{ExprId, VarId};

/// A local variable with no initializer and no static storage duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UninitializedLocalVariable {
    pub variable: VarId,
}

/// A read that may observe the indeterminate initial value of an
/// uninitialized local
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UninitializedRead {
    pub variable: VarId,
    pub read: ExprId,
}
