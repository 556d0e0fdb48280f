//! Path resolution and DAG traversal for dagnode.
//!
//! - [`Resolver`] walks a [`dagnode_types::Path`] one link per segment to the
//!   node it names, reporting how far it got when a link is missing.
//! - [`LinkWalker`] computes the link closure of a root breadth-first, each
//!   distinct node fetched once, either strictly or tolerating missing nodes.
//! - [`DagApi`] puts, gets, lists, and trees nodes by path.
//!
//! Every store fetch runs under the caller's [`dagnode_types::Context`], which
//! is also checked between fetches.

pub mod api;
pub mod error;
pub mod resolver;
pub mod walk;

pub use api::{DagApi, DagPutOptions, DagTreeOptions, InputEncoding};
pub use error::{DagError, DagResult};
pub use resolver::{Resolved, Resolver};
pub use walk::{ClosureWalk, LinkWalker, Visit, WalkMode, WalkOptions};
