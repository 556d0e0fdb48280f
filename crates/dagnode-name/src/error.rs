//! Error types for naming and key operations.

use thiserror::Error;

use dagnode_crypto::KeyError;
use dagnode_types::{ContextError, ErrorSeverity, TypeError};

/// Errors that can occur during name resolution, publishing, or key
/// management.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    /// No record exists for the name.
    #[error("no record for name: {name}")]
    NotFound { name: String },

    /// The record exists but its validity has lapsed.
    #[error("record for {name} has expired")]
    Expired { name: String },

    /// The naming chain is longer than the configured limit.
    #[error("resolving {name} exceeded the recursion limit of {limit}")]
    RecursionLimitExceeded { name: String, limit: usize },

    /// Local-only resolution found no local record.
    #[error("cannot resolve {name} offline: no local record")]
    OfflineResolutionFailed { name: String },

    /// The key or name is malformed.
    #[error("invalid name: {name}: {reason}")]
    InvalidName { name: String, reason: String },

    /// No key with this name exists.
    #[error("key not found: {name}")]
    KeyNotFound { name: String },

    /// A key with this name exists and overwriting was not allowed.
    #[error("key already exists: {name}")]
    KeyExists { name: String },

    /// The `self` key cannot be generated, renamed, or removed.
    #[error("cannot {action} the reserved key 'self'")]
    ReservedKey { action: &'static str },

    /// Key generation options that cannot be honoured.
    #[error("unsupported key options: {0}")]
    UnsupportedKey(String),

    #[error("operation canceled")]
    Canceled,

    #[error("deadline exceeded")]
    Timeout,

    #[error("record source error: {0}")]
    Backend(String),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Type(#[from] TypeError),
}

impl From<ContextError> for NameError {
    fn from(err: ContextError) -> Self {
        match err {
            ContextError::Canceled => Self::Canceled,
            ContextError::Timeout => Self::Timeout,
        }
    }
}

impl NameError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NotFound { .. } | Self::KeyNotFound { .. } => ErrorSeverity::NotFound,
            Self::Backend(_) | Self::Key(_) => ErrorSeverity::Implementation,
            Self::Type(err) => err.severity(),
            Self::Expired { .. }
            | Self::RecursionLimitExceeded { .. }
            | Self::OfflineResolutionFailed { .. }
            | Self::InvalidName { .. }
            | Self::KeyExists { .. }
            | Self::ReservedKey { .. }
            | Self::UnsupportedKey(_)
            | Self::Canceled
            | Self::Timeout => ErrorSeverity::Client,
        }
    }
}

/// Convenience alias for naming results.
pub type NameResult<T> = Result<T, NameError>;
