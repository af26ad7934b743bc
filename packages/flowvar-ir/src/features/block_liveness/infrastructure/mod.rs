pub mod liveness;
pub mod resolver;
pub mod skip_loop;

pub use liveness::{kills, live_in_blocks};
pub use resolver::{BlockResolution, BlockResolver};
pub use skip_loop::SkipLoops;
