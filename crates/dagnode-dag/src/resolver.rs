//! Path resolution over a [`NodeStore`].
//!
//! Resolution walks one link per segment, fetching each intermediate node.
//! The walk is a loop, not recursion, so arbitrarily deep paths use constant
//! stack, and the caller's context is checked before every fetch.

use std::sync::Arc;

use tracing::debug;

use dagnode_store::{Node, NodeStore};
use dagnode_types::{ContentId, Context, Path, PathRoot};

use crate::error::{DagError, DagResult};

/// Outcome of a partial resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolved {
    /// The deepest node the walk reached.
    pub node: Node,
    /// Segments that could not be followed from `node`.
    pub remainder: Vec<String>,
}

impl Resolved {
    pub fn is_complete(&self) -> bool {
        self.remainder.is_empty()
    }
}

/// Walks [`Path`]s to the node identifiers they name.
#[derive(Clone)]
pub struct Resolver {
    store: Arc<dyn NodeStore>,
}

impl Resolver {
    pub fn new(store: Arc<dyn NodeStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn NodeStore> {
        &self.store
    }

    /// Resolve `path` to the identifier of its terminal node.
    ///
    /// An already-resolved path returns its identifier without touching the
    /// store. The terminal node itself is not fetched.
    pub async fn resolve(&self, ctx: &Context, path: &Path) -> DagResult<ContentId> {
        if let Some(id) = path.cid() {
            return Ok(id);
        }
        let root = root_of(path)?;

        let mut current = root;
        for (i, segment) in path.segments().iter().enumerate() {
            let node = self.fetch(ctx, path, current).await?;
            if !current.codec().supports_links() {
                return Err(DagError::NotADirectory {
                    path: path.to_string(),
                    segment: segment.clone(),
                    id: current,
                });
            }
            match node.link(segment) {
                Some(link) => current = link.target,
                None => {
                    return Err(DagError::NotFound {
                        path: path.to_string(),
                        segment: segment.clone(),
                        parent: current,
                        remainder: path.segments()[i..].to_vec(),
                    })
                }
            }
        }

        debug!(path = %path, id = %current.short(), "resolved path");
        Ok(current)
    }

    /// Resolve `path` into a resolved [`Path`].
    pub async fn resolve_path(&self, ctx: &Context, path: &Path) -> DagResult<Path> {
        Ok(Path::resolved(self.resolve(ctx, path).await?))
    }

    /// Resolve `path` and fetch the terminal node.
    pub async fn resolve_node(&self, ctx: &Context, path: &Path) -> DagResult<Node> {
        let id = self.resolve(ctx, path).await?;
        self.fetch(ctx, path, id).await
    }

    /// Walk as far as the links allow.
    ///
    /// A missing link or a node that cannot carry links stops the walk and
    /// the unfollowed segments are returned as the remainder. Store failures
    /// are still errors.
    pub async fn resolve_partial(&self, ctx: &Context, path: &Path) -> DagResult<Resolved> {
        let root = root_of(path)?;
        let mut node = self.fetch(ctx, path, root).await?;

        let segments = path.segments();
        for (i, segment) in segments.iter().enumerate() {
            let next = if node.id().codec().supports_links() {
                node.link(segment).map(|l| l.target)
            } else {
                None
            };
            match next {
                Some(id) => node = self.fetch(ctx, path, id).await?,
                None => {
                    return Ok(Resolved {
                        node,
                        remainder: segments[i..].to_vec(),
                    })
                }
            }
        }

        Ok(Resolved {
            node,
            remainder: Vec::new(),
        })
    }

    async fn fetch(&self, ctx: &Context, path: &Path, id: ContentId) -> DagResult<Node> {
        ctx.check()?;
        self.store.get(ctx, &id).await.map_err(|source| {
            DagError::interrupted(ctx, &source).unwrap_or_else(|| DagError::Fetch {
                path: path.to_string(),
                id,
                source,
            })
        })
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver").finish_non_exhaustive()
    }
}

fn root_of(path: &Path) -> DagResult<ContentId> {
    match path.root() {
        PathRoot::Content(id) => Ok(*id),
        PathRoot::Name(_) => Err(DagError::NameRoot(path.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use dagnode_store::{CidFormat, InMemoryNodeStore, Link, StoreError};
    use dagnode_types::Codec;

    struct Fixture {
        store: Arc<InMemoryNodeStore>,
        resolver: Resolver,
        ctx: Context,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_store(InMemoryNodeStore::new())
        }

        fn with_store(store: InMemoryNodeStore) -> Self {
            let store = Arc::new(store);
            Self {
                resolver: Resolver::new(store.clone()),
                store,
                ctx: Context::background(),
            }
        }

        async fn put(&self, node: Node) -> ContentId {
            self.store.put(&self.ctx, &node).await.unwrap()
        }
    }

    /// root -> a -> b(leaf "deep")
    async fn chain(fx: &Fixture) -> (ContentId, ContentId, ContentId) {
        let b = fx.put(Node::leaf(b"deep".to_vec()).unwrap()).await;
        let a = fx.put(Node::branch(vec![Link::new("b", b)]).unwrap()).await;
        let root = fx.put(Node::branch(vec![Link::new("a", a)]).unwrap()).await;
        (root, a, b)
    }

    // ---------------------------------------------------------------
    // Full resolution
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn resolves_nested_segments() {
        let fx = Fixture::new();
        let (root, _, b) = chain(&fx).await;

        let path = Path::from_cid(root).join("a/b");
        assert_eq!(fx.resolver.resolve(&fx.ctx, &path).await.unwrap(), b);

        let resolved = fx.resolver.resolve_path(&fx.ctx, &path).await.unwrap();
        assert!(resolved.is_resolved());
        assert_eq!(resolved.cid(), Some(b));
    }

    #[tokio::test]
    async fn resolved_path_skips_the_store() {
        let fx = Fixture::new();
        let id = Node::leaf(b"never stored".to_vec()).unwrap().id();
        let got = fx.resolver.resolve(&fx.ctx, &Path::resolved(id)).await.unwrap();
        assert_eq!(got, id);
        assert_eq!(fx.store.fetch_count(), 0);
    }

    #[tokio::test]
    async fn missing_segment_reports_partial_progress() {
        let fx = Fixture::new();
        let (root, a, _) = chain(&fx).await;

        let path = Path::from_cid(root).join("a/nope/more");
        let err = fx.resolver.resolve(&fx.ctx, &path).await.unwrap_err();
        assert_eq!(
            err,
            DagError::NotFound {
                path: path.to_string(),
                segment: "nope".into(),
                parent: a,
                remainder: vec!["nope".into(), "more".into()],
            }
        );
    }

    #[tokio::test]
    async fn raw_node_is_not_a_directory() {
        let fx = Fixture::new();
        let raw = CidFormat {
            codec: Codec::Raw,
            ..CidFormat::default()
        };
        let blob = fx
            .put(Node::new(&raw, b"bytes".to_vec(), Vec::new()).unwrap())
            .await;
        let root = fx.put(Node::branch(vec![Link::new("f", blob)]).unwrap()).await;

        let err = fx
            .resolver
            .resolve(&fx.ctx, &Path::from_cid(root).join("f/inner"))
            .await
            .unwrap_err();
        assert!(matches!(err, DagError::NotADirectory { id, .. } if id == blob));
    }

    #[tokio::test]
    async fn store_miss_is_wrapped_with_path() {
        let fx = Fixture::new();
        let ghost = Node::leaf(b"ghost".to_vec()).unwrap().id();
        let root = fx.put(Node::branch(vec![Link::new("g", ghost)]).unwrap()).await;

        let path = Path::from_cid(root).join("g/x");
        let err = fx.resolver.resolve(&fx.ctx, &path).await.unwrap_err();
        assert!(matches!(
            &err,
            DagError::Fetch { id, source: StoreError::NotFound(_), .. } if *id == ghost
        ));
        assert_eq!(err.severity(), dagnode_types::ErrorSeverity::NotFound);
    }

    #[tokio::test]
    async fn name_root_is_rejected() {
        let fx = Fixture::new();
        let err = fx
            .resolver
            .resolve(&fx.ctx, &Path::from_name("example").join("a"))
            .await
            .unwrap_err();
        assert!(matches!(err, DagError::NameRoot(_)));
    }

    #[tokio::test]
    async fn resolve_node_fetches_terminal() {
        let fx = Fixture::new();
        let (root, _, _) = chain(&fx).await;
        let node = fx
            .resolver
            .resolve_node(&fx.ctx, &Path::from_cid(root).join("a/b"))
            .await
            .unwrap();
        assert_eq!(node.data(), b"deep");
    }

    #[tokio::test]
    async fn deep_paths_resolve_iteratively() {
        let fx = Fixture::new();
        let mut id = fx.put(Node::leaf(b"bottom".to_vec()).unwrap()).await;
        for _ in 0..2_000 {
            id = fx.put(Node::branch(vec![Link::new("n", id)]).unwrap()).await;
        }
        let path = Path::from_cid(id).with_segments(std::iter::repeat("n").take(2_000));
        let node = fx.resolver.resolve_node(&fx.ctx, &path).await.unwrap();
        assert_eq!(node.data(), b"bottom");
    }

    // ---------------------------------------------------------------
    // Partial resolution
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn partial_returns_deepest_node_and_remainder() {
        let fx = Fixture::new();
        let (root, a, _) = chain(&fx).await;

        let got = fx
            .resolver
            .resolve_partial(&fx.ctx, &Path::from_cid(root).join("a/x/y"))
            .await
            .unwrap();
        assert_eq!(got.node.id(), a);
        assert_eq!(got.remainder, vec!["x".to_string(), "y".to_string()]);
        assert!(!got.is_complete());
    }

    #[tokio::test]
    async fn partial_of_full_path_is_complete() {
        let fx = Fixture::new();
        let (root, _, b) = chain(&fx).await;
        let got = fx
            .resolver
            .resolve_partial(&fx.ctx, &Path::from_cid(root).join("a/b"))
            .await
            .unwrap();
        assert_eq!(got.node.id(), b);
        assert!(got.is_complete());
    }

    // ---------------------------------------------------------------
    // Cancellation
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn cancelled_context_stops_resolution() {
        let fx = Fixture::new();
        let (root, _, _) = chain(&fx).await;
        fx.ctx.cancel();
        let err = fx
            .resolver
            .resolve(&fx.ctx, &Path::from_cid(root).join("a/b"))
            .await
            .unwrap_err();
        assert_eq!(err, DagError::Canceled);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_interrupts_slow_fetch() {
        let fx = Fixture::with_store(InMemoryNodeStore::new().with_latency(Duration::from_secs(5)));
        let (root, _, _) = chain(&fx).await;

        let ctx = fx.ctx.with_timeout(Duration::from_secs(7));
        let err = fx
            .resolver
            .resolve(&ctx, &Path::from_cid(root).join("a/b"))
            .await
            .unwrap_err();
        assert_eq!(err, DagError::Timeout);
    }
}
