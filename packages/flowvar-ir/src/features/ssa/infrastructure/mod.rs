pub mod builder;
pub mod resolver;

pub use builder::{has_ssa_definition, SsaBuilder, SsaForm};
pub use resolver::SsaResolver;
