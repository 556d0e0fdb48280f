use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use tracing::trace;

use dagnode_types::{ContentId, Context};

use crate::error::{StoreError, StoreResult};
use crate::node::Node;
use crate::traits::NodeStore;

/// In-memory, HashMap-based node store.
///
/// Holds encoded node bytes keyed by identifier and decodes on every fetch,
/// so bytes planted with [`InMemoryNodeStore::put_raw`] surface exactly as a
/// damaged disk block would. An optional per-fetch latency stands in for
/// network retrieval.
pub struct InMemoryNodeStore {
    blocks: RwLock<HashMap<ContentId, Vec<u8>>>,
    latency: Option<Duration>,
    fetches: AtomicUsize,
}

impl InMemoryNodeStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            blocks: RwLock::new(HashMap::new()),
            latency: None,
            fetches: AtomicUsize::new(0),
        }
    }

    /// Delay every `get` by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Store arbitrary bytes under `id` without encoding or hashing.
    pub fn put_raw(&self, id: ContentId, bytes: Vec<u8>) -> StoreResult<()> {
        self.write()?.insert(id, bytes);
        Ok(())
    }

    /// Number of `get` calls served so far, including misses.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.read().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted list of all stored identifiers.
    pub fn all_ids(&self) -> StoreResult<Vec<ContentId>> {
        let mut ids: Vec<ContentId> = self.read()?.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<ContentId, Vec<u8>>>> {
        self.blocks
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".into()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<ContentId, Vec<u8>>>> {
        self.blocks
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".into()))
    }

    fn lookup(&self, id: &ContentId) -> StoreResult<Node> {
        let bytes = self.read()?.get(id).cloned();
        match bytes {
            Some(bytes) => Node::decode(*id, &bytes),
            None => Err(StoreError::NotFound(*id)),
        }
    }
}

impl Default for InMemoryNodeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeStore for InMemoryNodeStore {
    async fn get(&self, ctx: &Context, id: &ContentId) -> StoreResult<Node> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        trace!(id = %id.short(), "fetching node");
        ctx.run(async {
            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }
            self.lookup(id)
        })
        .await
    }

    async fn has(&self, ctx: &Context, id: &ContentId) -> StoreResult<bool> {
        ctx.check()?;
        Ok(self.read()?.contains_key(id))
    }

    async fn put(&self, ctx: &Context, node: &Node) -> StoreResult<ContentId> {
        ctx.check()?;
        let bytes = node.encode()?;
        let id = node.id();
        self.write()?.entry(id).or_insert(bytes);
        Ok(id)
    }

    async fn delete(&self, ctx: &Context, id: &ContentId) -> StoreResult<bool> {
        ctx.check()?;
        Ok(self.write()?.remove(id).is_some())
    }
}

impl std::fmt::Debug for InMemoryNodeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryNodeStore")
            .field("node_count", &self.len())
            .field("latency", &self.latency)
            .finish()
    }
}
