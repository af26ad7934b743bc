pub mod detector;

pub use detector::{candidates, detect, UninitializedReads};
