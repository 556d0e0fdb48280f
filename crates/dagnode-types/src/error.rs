use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("unknown codec: {0:#x}")]
    UnknownCodec(u64),

    #[error("unknown hash function: {0:#x}")]
    UnknownHash(u64),

    #[error("unknown {kind}: {name}")]
    UnknownName { kind: &'static str, name: String },

    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },
}

/// Reason a [`Context`](crate::Context) stopped an operation.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("operation canceled")]
    Canceled,

    #[error("deadline exceeded")]
    Timeout,
}

/// Ordered failure classification consumed by the response layer.
///
/// The numeric codes are part of the wire contract and must not change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Normal = 0,
    Client = 1,
    Implementation = 2,
    NotFound = 3,
}

impl ErrorSeverity {
    pub const fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Client => write!(f, "client"),
            Self::Implementation => write!(f, "implementation"),
            Self::NotFound => write!(f, "not-found"),
        }
    }
}

impl TypeError {
    pub fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Client
    }
}

impl ContextError {
    pub fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Client
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_order_is_fixed() {
        assert_eq!(ErrorSeverity::Normal.code(), 0);
        assert_eq!(ErrorSeverity::Client.code(), 1);
        assert_eq!(ErrorSeverity::Implementation.code(), 2);
        assert_eq!(ErrorSeverity::NotFound.code(), 3);
        assert!(ErrorSeverity::Normal < ErrorSeverity::Client);
        assert!(ErrorSeverity::Implementation < ErrorSeverity::NotFound);
    }

    #[test]
    fn context_errors_are_client_errors() {
        assert_eq!(ContextError::Canceled.severity(), ErrorSeverity::Client);
        assert_eq!(ContextError::Timeout.to_string(), "deadline exceeded");
    }
}
