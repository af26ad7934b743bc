// Fallback resolver at sub-basic-block granularity
//
// Hexagonal Architecture:
// - domain: block-granularity definition points
// - infrastructure: liveness, the skip-loop exemption, and forward reach

pub mod domain;
pub mod infrastructure;

pub use domain::BlockVar;
pub use infrastructure::skip_loop::compute as compute_skip_loops;
pub use infrastructure::{kills, live_in_blocks, BlockResolution, BlockResolver, SkipLoops};
