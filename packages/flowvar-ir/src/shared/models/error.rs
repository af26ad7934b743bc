//! Error types for the flowvar-ir crate
//!
//! Unified error handling across all features. The engine itself never fails
//! once a procedure passes input validation (derivation either produces a
//! fact or produces nothing), so every error here is a malformed-input or
//! internal condition raised before analysis starts.

use thiserror::Error;

/// Error kind categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed procedure/CFG input
    Cfg,
    /// SSA construction errors
    Ssa,
    /// Block-liveness resolver errors
    Liveness,
    /// Configuration errors
    Config,
    /// Internal errors (bugs)
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Cfg => "cfg",
            ErrorKind::Ssa => "ssa",
            ErrorKind::Liveness => "liveness",
            ErrorKind::Config => "config",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Unified error type
#[derive(Debug, Error)]
#[error("[{}] {message}", kind.as_str())]
pub struct FlowVarError {
    pub kind: ErrorKind,
    pub message: String,
}

impl FlowVarError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn cfg(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cfg, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, FlowVarError>;
