//! Mutable naming for dagnode.
//!
//! A name is a stable handle whose record points at a content path or at
//! another name. Records are supplied by a [`RecordSource`], which may be
//! local or reach the network, and carry an expiry.
//!
//! # Modules
//!
//! - [`error`] -- [`NameError`] and its severity classification
//! - [`names`] -- key and record name validation
//! - [`record`] -- [`Record`], [`NameValue`], the [`RecordSource`] trait
//! - [`resolver`] -- [`NameResolver`]: chain following, depth limit, TTL cache
//! - [`keystore`] -- the [`Keystore`] trait and [`InMemoryKeystore`]
//! - [`api`] -- [`NameApi`]: publish and resolve

pub mod api;
pub mod error;
pub mod keystore;
pub mod names;
pub mod record;
pub mod resolver;

pub use api::{NameApi, NameEntry, NamePublishOptions, DEFAULT_VALIDITY};
pub use error::{NameError, NameResult};
pub use keystore::{
    InMemoryKeystore, Key, KeyAlgorithm, KeyGenerateOptions, KeyRenameOptions, Keystore,
};
pub use names::{validate_name, validate_user_key_name, SELF_KEY};
pub use record::{InMemoryRecordSource, NameValue, Record, RecordSource};
pub use resolver::{NameResolveOptions, NameResolver, NamingConfig};
