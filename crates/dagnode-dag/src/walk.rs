//! Breadth-first link-closure traversal.
//!
//! The closure of a root is every node reachable by following links. Sibling
//! links are queued in declared order and a visited set keyed by
//! [`ContentId`] ensures each distinct node is fetched at most once, however
//! many paths lead to it.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use tracing::{debug, warn};

use dagnode_store::{NodeStore, StoreError};
use dagnode_types::{ContentId, Context};

use crate::error::{DagError, DagResult};

/// How a walk treats nodes it cannot fetch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WalkMode {
    /// The first unfetchable node fails the whole walk.
    Strict,
    /// Unfetchable nodes are recorded and not expanded.
    #[default]
    Lenient,
}

/// Parameters for a closure walk.
#[derive(Clone, Copy, Debug, Default)]
pub struct WalkOptions {
    pub mode: WalkMode,
    /// Re-hash each fetched node and treat a mismatch as a failure.
    pub check_integrity: bool,
}

impl WalkOptions {
    pub fn strict() -> Self {
        Self {
            mode: WalkMode::Strict,
            check_integrity: false,
        }
    }

    pub fn lenient() -> Self {
        Self::default()
    }

    pub fn verifying() -> Self {
        Self {
            mode: WalkMode::Lenient,
            check_integrity: true,
        }
    }
}

/// One node of a closure, in discovery order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Visit {
    pub id: ContentId,
    /// Link names from the root along the first path that reached this node.
    pub path: Vec<String>,
    /// Why the node could not be fetched or validated, in lenient walks.
    pub error: Option<StoreError>,
}

impl Visit {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Computes link closures over a [`NodeStore`].
#[derive(Clone)]
pub struct LinkWalker {
    store: Arc<dyn NodeStore>,
}

impl LinkWalker {
    pub fn new(store: Arc<dyn NodeStore>) -> Self {
        Self { store }
    }

    /// Start a step-by-step walk of the closure of `root`.
    ///
    /// Nothing is fetched until [`ClosureWalk::next`] is called, so callers
    /// can hand each node on before the next one is read.
    pub fn walk(&self, root: ContentId, opts: WalkOptions) -> ClosureWalk {
        let mut visited = HashSet::new();
        visited.insert(root);
        ClosureWalk {
            store: self.store.clone(),
            root,
            opts,
            visited,
            queue: VecDeque::from([(root, Vec::new())]),
        }
    }

    /// Walk the closure of `root`, root first.
    ///
    /// Cancellation always ends the walk with an error, in either mode.
    pub async fn closure(
        &self,
        ctx: &Context,
        root: ContentId,
        opts: WalkOptions,
    ) -> DagResult<Vec<Visit>> {
        let mut walk = self.walk(root, opts);
        let mut out = Vec::new();
        while let Some(visit) = walk.next(ctx).await {
            out.push(visit?);
        }
        debug!(root = %root.short(), nodes = out.len(), "walked link closure");
        Ok(out)
    }

    /// Identifiers in the closure of `root`, root first.
    pub async fn closure_ids(
        &self,
        ctx: &Context,
        root: ContentId,
        mode: WalkMode,
    ) -> DagResult<Vec<ContentId>> {
        let opts = WalkOptions {
            mode,
            check_integrity: false,
        };
        let visits = self.closure(ctx, root, opts).await?;
        Ok(visits.into_iter().map(|v| v.id).collect())
    }
}

/// An in-progress breadth-first walk started by [`LinkWalker::walk`].
pub struct ClosureWalk {
    store: Arc<dyn NodeStore>,
    root: ContentId,
    opts: WalkOptions,
    visited: HashSet<ContentId>,
    queue: VecDeque<(ContentId, Vec<String>)>,
}

impl ClosureWalk {
    /// Fetch the next node of the closure.
    ///
    /// Returns `None` once the closure is exhausted. After an error the walk
    /// is over and further calls return `None`.
    pub async fn next(&mut self, ctx: &Context) -> Option<DagResult<Visit>> {
        let (id, path) = self.queue.pop_front()?;
        let visit = self.step(ctx, id, path).await;
        if visit.is_err() {
            self.queue.clear();
        }
        Some(visit)
    }

    async fn step(&mut self, ctx: &Context, id: ContentId, path: Vec<String>) -> DagResult<Visit> {
        ctx.check()?;

        let fetched = match self.store.get(ctx, &id).await {
            Ok(node) if self.opts.check_integrity => node.check_integrity().map(|_| node),
            other => other,
        };

        let node = match fetched {
            Ok(node) => node,
            Err(err) => {
                if let Some(interrupted) = DagError::interrupted(ctx, &err) {
                    return Err(interrupted);
                }
                if self.opts.mode == WalkMode::Strict {
                    return Err(DagError::Unreachable {
                        root: self.root,
                        id,
                        source: err,
                    });
                }
                warn!(root = %self.root.short(), id = %id.short(), error = %err, "skipping unreadable node");
                return Ok(Visit {
                    id,
                    path,
                    error: Some(err),
                });
            }
        };

        for link in node.links() {
            if self.visited.insert(link.target) {
                let mut child = path.clone();
                child.push(link.name.clone());
                self.queue.push_back((link.target, child));
            }
        }
        Ok(Visit {
            id,
            path,
            error: None,
        })
    }
}

impl std::fmt::Debug for ClosureWalk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClosureWalk")
            .field("root", &self.root)
            .field("pending", &self.queue.len())
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for LinkWalker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkWalker").finish_non_exhaustive()
    }
}
