use thiserror::Error;

use dagnode_dag::DagError;
use dagnode_name::NameError;
use dagnode_pin::PinError;
use dagnode_store::StoreError;
use dagnode_types::{ContextError, ErrorSeverity, TypeError};

/// Any failure surfaced by [`crate::CoreApi`].
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Dag(#[from] DagError),

    #[error(transparent)]
    Pin(#[from] PinError),

    #[error(transparent)]
    Name(#[from] NameError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Classify for the response layer.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Type(err) => err.severity(),
            Self::Store(err) => err.severity(),
            Self::Dag(err) => err.severity(),
            Self::Pin(err) => err.severity(),
            Self::Name(err) => err.severity(),
            Self::Context(err) => err.severity(),
            Self::Config(_) => ErrorSeverity::Client,
            Self::Io(_) => ErrorSeverity::Implementation,
        }
    }

    /// True when the operation stopped because its context was cancelled
    /// or its deadline passed.
    pub fn is_interrupted(&self) -> bool {
        matches!(
            self,
            Self::Context(_)
                | Self::Store(StoreError::Canceled | StoreError::Timeout)
                | Self::Dag(DagError::Canceled | DagError::Timeout)
                | Self::Pin(PinError::Canceled | PinError::Timeout)
                | Self::Name(NameError::Canceled | NameError::Timeout)
        )
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
