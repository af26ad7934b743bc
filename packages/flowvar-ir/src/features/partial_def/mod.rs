// Partial-definition detection
//
// Hexagonal Architecture:
// - domain: PartialDefinition facts
// - infrastructure: the structural detector

pub mod domain;
pub mod infrastructure;

pub use domain::{PartialDefId, PartialDefKind, PartialDefinition};
pub use infrastructure::{detect, PartialDefinitions};
