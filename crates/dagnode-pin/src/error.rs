use dagnode_dag::DagError;
use dagnode_types::{ContentId, ContextError, ErrorSeverity, TypeError};

/// Errors from pin set operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PinError {
    /// No matching direct or recursive pin exists for this identifier.
    #[error("not pinned: {0}")]
    NotPinned(ContentId),

    /// The closure of a new pin could not be fully fetched; nothing was pinned.
    #[error("cannot pin {target}: {source}")]
    Resolution {
        target: ContentId,
        #[source]
        source: DagError,
    },

    /// Reading or writing persisted pins failed.
    #[error("pin storage error: {0}")]
    Storage(String),

    /// Persisted pin data is malformed.
    #[error("corrupt pin storage: {0}")]
    Corrupt(String),

    #[error("operation canceled")]
    Canceled,

    #[error("deadline exceeded")]
    Timeout,

    #[error(transparent)]
    Dag(DagError),

    #[error(transparent)]
    Type(#[from] TypeError),
}

impl From<ContextError> for PinError {
    fn from(err: ContextError) -> Self {
        match err {
            ContextError::Canceled => Self::Canceled,
            ContextError::Timeout => Self::Timeout,
        }
    }
}

impl From<DagError> for PinError {
    fn from(err: DagError) -> Self {
        match err {
            DagError::Canceled => Self::Canceled,
            DagError::Timeout => Self::Timeout,
            other => Self::Dag(other),
        }
    }
}

impl From<std::io::Error> for PinError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl PinError {
    /// Classify a traversal failure during pinning.
    ///
    /// Cancellation passes through unchanged; everything else means the
    /// closure was unreachable.
    pub(crate) fn resolution(target: ContentId, err: DagError) -> Self {
        match err {
            DagError::Canceled => Self::Canceled,
            DagError::Timeout => Self::Timeout,
            source => Self::Resolution { target, source },
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Resolution { source, .. } => source.severity(),
            Self::Dag(err) => err.severity(),
            Self::Type(err) => err.severity(),
            Self::NotPinned(_) | Self::Canceled | Self::Timeout => ErrorSeverity::Client,
            Self::Storage(_) | Self::Corrupt(_) => ErrorSeverity::Implementation,
        }
    }
}

/// Result alias for pin operations.
pub type PinResult<T> = Result<T, PinError>;
