//! Foundation types for dagnode.
//!
//! This crate provides the identifier, path, cancellation, and error
//! classification types shared by every other dagnode crate.
//!
//! # Key Types
//!
//! - [`ContentId`] -- self-describing hash reference to an immutable DAG node
//! - [`Codec`] / [`HashFn`] -- how a node is encoded and digested
//! - [`Path`] -- a node or name root followed by named link segments
//! - [`Context`] -- caller-supplied cancellation signal and deadline
//! - [`ErrorSeverity`] -- ordered failure taxonomy consumed by the response layer

pub mod cid;
pub mod context;
pub mod error;
pub mod path;

pub use cid::{Codec, ContentId, HashFn, MAX_DIGEST_LEN};
pub use context::Context;
pub use error::{ContextError, ErrorSeverity, TypeError};
pub use path::{Path, PathRoot};
