//! Feature modules - Each feature follows Hexagonal Architecture
//!
//! Each feature contains:
//! - domain/     - Pure business logic (no external dependencies)
//! - ports/      - Interface definitions (traits)
//! - application/ - Use cases
//! - infrastructure/ - External dependency implementations

pub mod block_liveness;
pub mod cfg;
pub mod flow_var;
pub mod partial_def;
pub mod ssa;
pub mod uninit;
