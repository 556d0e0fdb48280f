//! DAG node model and content-addressed node storage for dagnode.
//!
//! A [`Node`] is an immutable block: opaque data plus an ordered list of
//! named [`Link`]s to other nodes. Its [`dagnode_types::ContentId`] is the
//! digest of its encoding under a [`CidFormat`], so identical content always
//! yields the identical identifier.
//!
//! # Codecs
//!
//! - `dag-cbor` -- deterministic CBOR body (default)
//! - `dag-json` -- JSON body
//! - `raw` -- the data bytes themselves; cannot carry links
//!
//! # Storage Backends
//!
//! All backends implement the async [`NodeStore`] trait:
//!
//! - [`InMemoryNodeStore`] -- `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Nodes are immutable once written.
//! 2. Every fetch runs under a caller [`dagnode_types::Context`] and honours
//!    its cancellation and deadline.
//! 3. Decoding does not verify the digest; callers that need integrity call
//!    [`Node::check_integrity`].

pub mod error;
pub mod memory;
pub mod node;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryNodeStore;
pub use node::{CidFormat, Link, Node};
pub use traits::NodeStore;
