pub mod builder;
pub mod dominance;

pub use builder::ProcedureBuilder;
pub use dominance::CfgContext;
