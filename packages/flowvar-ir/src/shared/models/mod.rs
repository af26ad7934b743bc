//! Shared models used by every feature

pub mod error;
pub mod span;

pub use error::{ErrorKind, FlowVarError, Result};
pub use span::{Location, Span};
