//! Error types for path resolution and DAG traversal.

use dagnode_store::StoreError;
use dagnode_types::{ContentId, Context, ContextError, ErrorSeverity, TypeError};

/// Errors that can occur while resolving paths or walking links.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DagError {
    /// A path segment has no matching link.
    ///
    /// `parent` is the deepest node reached and `remainder` the segments
    /// left unresolved, starting with the missing one.
    #[error("no link named {segment:?} under {parent} while resolving {path}")]
    NotFound {
        path: String,
        segment: String,
        parent: ContentId,
        remainder: Vec<String>,
    },

    /// A non-terminal node in the path cannot carry links.
    #[error("{id} is not a directory (resolving {segment:?} in {path})")]
    NotADirectory {
        path: String,
        segment: String,
        id: ContentId,
    },

    /// The node store failed while resolving `path`.
    #[error("fetching {id} for {path}: {source}")]
    Fetch {
        path: String,
        id: ContentId,
        #[source]
        source: StoreError,
    },

    /// A node in a closure could not be fetched during a strict walk.
    #[error("{id} under {root} is unreachable: {source}")]
    Unreachable {
        root: ContentId,
        id: ContentId,
        #[source]
        source: StoreError,
    },

    /// The path starts at a mutable name, which the DAG layer cannot resolve.
    #[error("path {0} must be resolved through naming first")]
    NameRoot(String),

    /// Malformed `dag put` input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("operation canceled")]
    Canceled,

    #[error("deadline exceeded")]
    Timeout,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Type(#[from] TypeError),
}

impl From<ContextError> for DagError {
    fn from(err: ContextError) -> Self {
        match err {
            ContextError::Canceled => Self::Canceled,
            ContextError::Timeout => Self::Timeout,
        }
    }
}

impl DagError {
    /// The caller's interruption behind a store error, if any.
    ///
    /// A store may time out on one node while `ctx` is still live; that is a
    /// per-node failure and yields `None`.
    pub fn interrupted(ctx: &Context, err: &StoreError) -> Option<Self> {
        match err {
            StoreError::Canceled | StoreError::Timeout => ctx.check().err().map(Self::from),
            _ => None,
        }
    }

    /// Wrap a store error without path context.
    pub(crate) fn from_store(ctx: &Context, err: StoreError) -> Self {
        Self::interrupted(ctx, &err).unwrap_or(Self::Store(err))
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NotFound { .. } => ErrorSeverity::NotFound,
            Self::Fetch { source, .. } | Self::Unreachable { source, .. } => source.severity(),
            Self::Store(err) => err.severity(),
            Self::Type(err) => err.severity(),
            Self::NotADirectory { .. }
            | Self::NameRoot(_)
            | Self::InvalidInput(_)
            | Self::Canceled
            | Self::Timeout => ErrorSeverity::Client,
        }
    }
}

/// Convenience alias for DAG results.
pub type DagResult<T> = Result<T, DagError>;
