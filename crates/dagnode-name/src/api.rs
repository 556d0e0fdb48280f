//! Publish and resolve through one handle.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use dagnode_types::{Context, Path};

use crate::error::NameResult;
use crate::keystore::Keystore;
use crate::names::SELF_KEY;
use crate::record::{Record, RecordSource};
use crate::resolver::{NameResolveOptions, NameResolver};

/// Default record lifetime.
pub const DEFAULT_VALIDITY: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamePublishOptions {
    /// How long the published record stays valid.
    pub valid_for: Duration,
    /// Keystore name of the key to publish under.
    pub key: String,
}

impl Default for NamePublishOptions {
    fn default() -> Self {
        Self {
            valid_for: DEFAULT_VALIDITY,
            key: SELF_KEY.to_string(),
        }
    }
}

/// A published binding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameEntry {
    pub name: String,
    pub value: Path,
}

/// Naming operations for a node.
pub struct NameApi {
    source: Arc<dyn RecordSource>,
    keys: Arc<dyn Keystore>,
    resolver: Arc<NameResolver>,
}

impl NameApi {
    pub fn new(
        source: Arc<dyn RecordSource>,
        keys: Arc<dyn Keystore>,
        resolver: Arc<NameResolver>,
    ) -> Self {
        Self {
            source,
            keys,
            resolver,
        }
    }

    pub fn resolver(&self) -> &Arc<NameResolver> {
        &self.resolver
    }

    pub fn keys(&self) -> &Arc<dyn Keystore> {
        &self.keys
    }

    /// Bind the name of `opts.key` to `path` for `opts.valid_for`.
    pub async fn publish(
        &self,
        ctx: &Context,
        path: Path,
        opts: NamePublishOptions,
    ) -> NameResult<NameEntry> {
        ctx.check()?;
        let key = self.keys.get(&opts.key).await?;
        let name = key.publish_name();

        let record = Record::valid_for(path.clone(), opts.valid_for);
        self.source.publish(ctx, &name, record).await?;
        self.resolver.invalidate(&name);

        info!(key = %opts.key, name = %name, value = %path, "published name");
        Ok(NameEntry { name, value: path })
    }

    /// Resolve `name` to a path. See [`NameResolver::resolve`].
    pub async fn resolve(
        &self,
        ctx: &Context,
        name: &str,
        opts: NameResolveOptions,
    ) -> NameResult<Path> {
        self.resolver.resolve(ctx, name, opts).await
    }
}

impl std::fmt::Debug for NameApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NameApi")
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}
