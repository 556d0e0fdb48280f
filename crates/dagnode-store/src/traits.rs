use async_trait::async_trait;

use dagnode_types::{ContentId, Context};

use crate::error::StoreResult;
use crate::node::Node;

/// Content-addressed node store.
///
/// Implementations may block on the network, so every call takes a
/// [`Context`] and must return [`crate::StoreError::Canceled`] or
/// [`crate::StoreError::Timeout`] when it ends first. Nodes are immutable:
/// the same identifier always yields the same node.
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// Fetch and decode a node.
    ///
    /// Returns [`crate::StoreError::NotFound`] if no node has this identifier.
    async fn get(&self, ctx: &Context, id: &ContentId) -> StoreResult<Node>;

    /// Whether a node with this identifier is locally available.
    async fn has(&self, ctx: &Context, id: &ContentId) -> StoreResult<bool>;

    /// Store a node and return its identifier. Idempotent.
    async fn put(&self, ctx: &Context, node: &Node) -> StoreResult<ContentId>;

    /// Remove a node. Returns `true` if it was present.
    async fn delete(&self, ctx: &Context, id: &ContentId) -> StoreResult<bool>;

    /// Fetch several nodes in order.
    ///
    /// Default implementation calls `get()` for each ID and stops at the first
    /// error.
    async fn get_many(&self, ctx: &Context, ids: &[ContentId]) -> StoreResult<Vec<Node>> {
        let mut nodes = Vec::with_capacity(ids.len());
        for id in ids {
            nodes.push(self.get(ctx, id).await?);
        }
        Ok(nodes)
    }
}
