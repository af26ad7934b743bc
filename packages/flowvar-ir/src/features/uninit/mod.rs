// Uninitialized-read detection
//
// Hexagonal Architecture:
// - domain: UninitializedLocalVariable / UninitializedRead facts
// - infrastructure: dominance fast path + not-yet-written propagation

pub mod domain;
pub mod infrastructure;

pub use domain::{UninitializedLocalVariable, UninitializedRead};
pub use infrastructure::{candidates, detect, UninitializedReads};
