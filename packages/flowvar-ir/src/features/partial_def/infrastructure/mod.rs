pub mod detector;

pub use detector::{detect, PartialDefinitions};
