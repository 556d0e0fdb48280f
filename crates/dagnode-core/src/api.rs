//! The node's unified API handle.

use std::sync::Arc;

use tracing::{debug, info};

use dagnode_dag::{DagApi, DagPutOptions};
use dagnode_name::{
    InMemoryKeystore, Keystore, NameApi, NameResolveOptions, NameResolver, RecordSource,
};
use dagnode_pin::{
    FilePinStorage, InMemoryPinStorage, PinAddOptions, PinEntry, PinLsOptions, PinSet,
    PinStatusStream, PinStorage, PinUpdateOptions, Pinner, PinVerifier, Verifier,
};
use dagnode_store::{Node, NodeStore};
use dagnode_types::{ContentId, Context, Path, PathRoot};

use crate::config::NodeConfig;
use crate::error::CoreResult;

/// One handle over DAG access, pins, naming, and keys.
///
/// Every subsystem shares the same [`NodeStore`]. Paths rooted at a name
/// are resolved through naming before the DAG walk, so any operation taking
/// a [`Path`] accepts both `/ipfs/` and `/ipns/` forms.
pub struct CoreApi {
    config: NodeConfig,
    store: Arc<dyn NodeStore>,
    dag: DagApi,
    pins: Arc<dyn PinSet>,
    verifier: PinVerifier,
    names: NameApi,
}

impl CoreApi {
    /// Wire up a node with a freshly generated `self` key.
    ///
    /// Pin storage is the file named by `config.pins`, or memory when unset.
    pub async fn new(
        config: NodeConfig,
        store: Arc<dyn NodeStore>,
        records: Arc<dyn RecordSource>,
    ) -> CoreResult<Self> {
        Self::with_keystore(
            config,
            store,
            records,
            Arc::new(InMemoryKeystore::generate_self()),
        )
        .await
    }

    /// Wire up a node around an existing keystore.
    pub async fn with_keystore(
        config: NodeConfig,
        store: Arc<dyn NodeStore>,
        records: Arc<dyn RecordSource>,
        keys: Arc<dyn Keystore>,
    ) -> CoreResult<Self> {
        config.validate()?;

        let storage: Arc<dyn PinStorage> = match &config.pins {
            Some(path) => Arc::new(FilePinStorage::new(path)),
            None => Arc::new(InMemoryPinStorage::new()),
        };
        let pinner = Pinner::open(store.clone(), storage).await?;
        let pinned = pinner.len().await;
        let pins: Arc<dyn PinSet> = Arc::new(pinner);
        let verifier = PinVerifier::new(pins.clone(), store.clone())
            .with_capacity(config.verify.channel_capacity);

        let resolver = Arc::new(NameResolver::new(records.clone(), config.naming.clone()));
        let names = NameApi::new(records, keys, resolver);

        info!(
            pins = pinned,
            persistent = config.pins.is_some(),
            "core api ready"
        );
        Ok(Self {
            dag: DagApi::new(store.clone()),
            config,
            store,
            pins,
            verifier,
            names,
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn NodeStore> {
        &self.store
    }

    pub fn dag(&self) -> &DagApi {
        &self.dag
    }

    pub fn pin(&self) -> &Arc<dyn PinSet> {
        &self.pins
    }

    pub fn name(&self) -> &NameApi {
        &self.names
    }

    pub fn key(&self) -> &Arc<dyn Keystore> {
        self.names.keys()
    }

    /// Put options carrying the configured default format.
    pub fn dag_put_options(&self) -> DagPutOptions {
        DagPutOptions {
            format: self.config.dag.default_format,
            ..Default::default()
        }
    }

    /// Resolve any path to a resolved content path.
    ///
    /// A name root is resolved recursively through naming first; its
    /// segments are then walked through the DAG.
    pub async fn resolve_path(&self, ctx: &Context, path: &Path) -> CoreResult<Path> {
        Ok(Path::resolved(self.resolve_id(ctx, path).await?))
    }

    /// Resolve `path` and fetch the node it names.
    pub async fn resolve_node(&self, ctx: &Context, path: &Path) -> CoreResult<Node> {
        let path = self.resolve_name_root(ctx, path).await?;
        Ok(self.dag.resolver().resolve_node(ctx, &path).await?)
    }

    async fn resolve_id(&self, ctx: &Context, path: &Path) -> CoreResult<ContentId> {
        if let Some(id) = path.cid() {
            return Ok(id);
        }
        let path = self.resolve_name_root(ctx, path).await?;
        Ok(self.dag.resolver().resolve(ctx, &path).await?)
    }

    async fn resolve_name_root(&self, ctx: &Context, path: &Path) -> CoreResult<Path> {
        let PathRoot::Name(name) = path.root() else {
            return Ok(path.clone());
        };
        let opts = NameResolveOptions {
            recursive: true,
            ..Default::default()
        };
        let target = self.names.resolve(ctx, name, opts).await?;
        debug!(name = %name, target = %target, "resolved name root");
        Ok(target.with_segments(path.segments().iter().cloned()))
    }

    // ---- Pins ----

    /// Pin whatever `path` resolves to. Returns the resolved path.
    pub async fn pin_add(
        &self,
        ctx: &Context,
        path: &Path,
        opts: PinAddOptions,
    ) -> CoreResult<Path> {
        let id = self.resolve_id(ctx, path).await?;
        self.pins.add(ctx, id, opts).await?;
        Ok(Path::resolved(id))
    }

    pub async fn pin_rm(&self, ctx: &Context, path: &Path) -> CoreResult<Path> {
        let id = self.resolve_id(ctx, path).await?;
        self.pins.rm(ctx, id).await?;
        Ok(Path::resolved(id))
    }

    /// Move a recursive pin from one path's target to another's.
    pub async fn pin_update(
        &self,
        ctx: &Context,
        from: &Path,
        to: &Path,
        opts: PinUpdateOptions,
    ) -> CoreResult<()> {
        let from = self.resolve_id(ctx, from).await?;
        let to = self.resolve_id(ctx, to).await?;
        self.pins.update(ctx, from, to, opts).await?;
        Ok(())
    }

    pub async fn pin_ls(&self, ctx: &Context, opts: PinLsOptions) -> CoreResult<Vec<PinEntry>> {
        Ok(self.pins.ls(ctx, opts).await?)
    }

    /// Start verifying every pin. See [`PinVerifier`].
    pub fn pin_verify(&self, ctx: &Context) -> PinStatusStream {
        self.verifier.verify(ctx)
    }
}

impl std::fmt::Debug for CoreApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreApi")
            .field("config", &self.config)
            .field("verifier", &self.verifier)
            .field("names", &self.names)
            .finish_non_exhaustive()
    }
}
