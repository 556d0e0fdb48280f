//! Core API for a dagnode content-addressed storage node.
//!
//! [`CoreApi`] ties the subsystems together over one node store:
//!
//! - **DAG** (`dagnode-dag`) -- put/get/ls/tree and path resolution
//! - **Pins** (`dagnode-pin`) -- direct, recursive, and derived indirect pins,
//!   plus streaming verification
//! - **Naming** (`dagnode-name`) -- mutable names, cached resolution, keys
//!
//! Every operation takes a [`Context`] that carries cancellation and an
//! optional deadline. Errors from every layer funnel into [`CoreError`],
//! whose [`CoreError::severity`] gives the response-layer classification.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use dagnode_core::{CoreApi, NodeConfig};
//! use dagnode_name::InMemoryRecordSource;
//! use dagnode_pin::PinAddOptions;
//! use dagnode_store::InMemoryNodeStore;
//! use dagnode_types::Context;
//!
//! # async fn run() -> dagnode_core::CoreResult<()> {
//! let api = CoreApi::new(
//!     NodeConfig::default(),
//!     Arc::new(InMemoryNodeStore::new()),
//!     Arc::new(InMemoryRecordSource::new()),
//! )
//! .await?;
//! let ctx = Context::background();
//! let path = api.dag().put(&ctx, br#"{"data": "hi"}"#, api.dag_put_options()).await?;
//! api.pin_add(&ctx, &path, PinAddOptions::default()).await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod error;

pub use api::CoreApi;
pub use config::{DagConfig, NodeConfig, VerifyConfig};
pub use error::{CoreError, CoreResult};

pub use dagnode_types::{Context, ErrorSeverity, Path};
