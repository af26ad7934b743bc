// CFG collaborator surface
//
// Hexagonal Architecture:
// - domain: the procedure/CFG snapshot the engine consumes
// - infrastructure: derived queries (dominance, reachability) + builder

pub mod domain;
pub mod infrastructure;

pub use domain::{
    ArgShape, Argument, BasicBlock, BlockId, Expr, ExprId, ExprKind, LoopFacts, LoopId, ParamShape,
    Procedure, StorageClass, SubBasicBlock, SubBlockId, TypeShape, VarId, Variable,
};
pub use infrastructure::{CfgContext, ProcedureBuilder};
