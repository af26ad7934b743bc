// Unified flow-variable facade
//
// Hexagonal Architecture:
// - domain: the FlowVar tagged union
// - application: per-procedure resolution use case
// - ports: the service trait and configuration consumed by the driver

pub mod application;
pub mod domain;
pub mod ports;

pub use application::{is_fully_supported, FlowVarAnalysis, ResolveFlowVars};
pub use domain::{FlowVar, FlowVarOrigin};
pub use ports::{FlowVarResolutionService, ResolverConfig, DEFAULT_EXPLOSION_GUARD_LIMIT};
