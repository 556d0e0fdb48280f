use dagnode_crypto::HasherError;
use dagnode_types::{Codec, ContentId, ContextError, ErrorSeverity};

/// Errors from node store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The requested node was not found.
    #[error("node not found: {0}")]
    NotFound(ContentId),

    /// The fetch did not complete before the caller's deadline.
    #[error("timed out fetching node")]
    Timeout,

    /// The caller cancelled the fetch.
    #[error("fetch canceled")]
    Canceled,

    /// The node bytes could not be encoded or decoded with its codec.
    #[error("{codec} codec error: {reason}")]
    Codec { codec: Codec, reason: String },

    /// The fetched bytes do not hash to the requested identifier.
    #[error("hash mismatch for {id}: content hashes to {computed}")]
    HashMismatch { id: ContentId, computed: ContentId },

    /// Links were supplied for a codec that cannot carry them.
    #[error("codec {0} cannot carry links")]
    LinksUnsupported(Codec),

    #[error(transparent)]
    Hasher(#[from] HasherError),

    /// The storage backend failed.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl From<ContextError> for StoreError {
    fn from(err: ContextError) -> Self {
        match err {
            ContextError::Canceled => Self::Canceled,
            ContextError::Timeout => Self::Timeout,
        }
    }
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NotFound(_) => ErrorSeverity::NotFound,
            Self::Timeout | Self::Canceled | Self::LinksUnsupported(_) | Self::Hasher(_) => {
                ErrorSeverity::Client
            }
            Self::Codec { .. } | Self::HashMismatch { .. } | Self::Backend(_) => {
                ErrorSeverity::Implementation
            }
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
