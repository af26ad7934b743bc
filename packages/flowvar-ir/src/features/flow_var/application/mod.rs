pub mod resolve_flow_vars;

pub use resolve_flow_vars::{is_fully_supported, FlowVarAnalysis, ResolveFlowVars};
