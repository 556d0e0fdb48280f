//! The pin set.
//!
//! [`Pinner`] keeps the persisted direct and recursive entries in memory and
//! derives indirect pins by walking the link closure of every recursive root
//! against the current store. Mutations are serialized by a writer lock and
//! persisted before they become visible; readers work on a cloned snapshot.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use dagnode_dag::{DagError, LinkWalker, WalkMode, WalkOptions};
use dagnode_store::NodeStore;
use dagnode_types::{ContentId, Context};

use crate::error::{PinError, PinResult};
use crate::storage::{PinMap, PinStorage};
use crate::types::{PinAddOptions, PinEntry, PinKind, PinLsOptions, PinType, PinUpdateOptions};

/// The authoritative set of retained objects.
#[async_trait]
pub trait PinSet: Send + Sync {
    /// Pin `target`. A recursive add validates the full closure first and
    /// pins nothing if any node is unreachable.
    async fn add(&self, ctx: &Context, target: ContentId, opts: PinAddOptions) -> PinResult<()>;

    /// Remove the direct or recursive pin on `target`.
    async fn rm(&self, ctx: &Context, target: ContentId) -> PinResult<()>;

    /// Replace the recursive pin `from` with a recursive pin on `to`.
    ///
    /// No traversal is done: `to` is not validated and its closure is not
    /// compared with the closure of `from`.
    async fn update(
        &self,
        ctx: &Context,
        from: ContentId,
        to: ContentId,
        opts: PinUpdateOptions,
    ) -> PinResult<()>;

    /// List pins of the requested type. Direct pins come first, then
    /// recursive roots, then indirect pins in traversal order.
    async fn ls(&self, ctx: &Context, opts: PinLsOptions) -> PinResult<Vec<PinEntry>>;

    /// How `id` is retained, if at all.
    async fn is_pinned(&self, ctx: &Context, id: ContentId) -> PinResult<Option<PinKind>>;

    /// The direct and recursive entries as one consistent snapshot.
    async fn roots(&self, ctx: &Context) -> PinResult<PinMap>;
}

/// [`PinSet`] backed by a [`NodeStore`] and a [`PinStorage`].
pub struct Pinner {
    store: Arc<dyn NodeStore>,
    walker: LinkWalker,
    storage: Arc<dyn PinStorage>,
    entries: RwLock<PinMap>,
    writer: Mutex<()>,
}

impl Pinner {
    /// Load persisted pins and build the pin set.
    pub async fn open(store: Arc<dyn NodeStore>, storage: Arc<dyn PinStorage>) -> PinResult<Self> {
        let entries = storage.load().await?;
        info!(pins = entries.len(), "opened pin set");
        Ok(Self {
            walker: LinkWalker::new(store.clone()),
            store,
            storage,
            entries: RwLock::new(entries),
            writer: Mutex::new(()),
        })
    }

    /// A consistent copy of the direct and recursive entries.
    pub async fn snapshot(&self) -> PinMap {
        self.entries.read().await.clone()
    }

    /// Number of direct and recursive entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Persist `next`, then publish it. Callers hold the writer lock.
    async fn commit(&self, next: PinMap) -> PinResult<()> {
        self.storage.save(&next).await?;
        *self.entries.write().await = next;
        Ok(())
    }

    /// Indirect pins of the given entries, in traversal order.
    ///
    /// Roots are walked in identifier order. Identifiers that are
    /// themselves direct or recursive pins are left out.
    async fn indirect(&self, ctx: &Context, entries: &PinMap) -> PinResult<Vec<ContentId>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for (root, kind) in entries {
            if *kind != PinKind::Recursive {
                continue;
            }
            let closure = self
                .walker
                .closure_ids(ctx, *root, WalkMode::Lenient)
                .await?;
            for id in closure.into_iter().skip(1) {
                if !entries.contains_key(&id) && seen.insert(id) {
                    out.push(id);
                }
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl PinSet for Pinner {
    async fn add(&self, ctx: &Context, target: ContentId, opts: PinAddOptions) -> PinResult<()> {
        let kind = if opts.recursive {
            PinKind::Recursive
        } else {
            PinKind::Direct
        };

        // Validate outside the writer lock; the store is not ours to guard.
        let walk = if opts.recursive {
            self.walker
                .closure(ctx, target, WalkOptions::strict())
                .await
                .map(|_| ())
        } else {
            self.store
                .get(ctx, &target)
                .await
                .map(|_| ())
                .map_err(|source| {
                    DagError::interrupted(ctx, &source).unwrap_or(DagError::Unreachable {
                        root: target,
                        id: target,
                        source,
                    })
                })
        };
        walk.map_err(|e| PinError::resolution(target, e))?;

        let _guard = self.writer.lock().await;
        ctx.check()?;
        let mut next = self.snapshot().await;
        match next.get(&target) {
            Some(existing) if *existing == kind => {
                debug!(id = %target.short(), ?kind, "already pinned");
                return Ok(());
            }
            Some(PinKind::Recursive) => {
                debug!(id = %target.short(), "already pinned recursively");
                return Ok(());
            }
            _ => {}
        }
        next.insert(target, kind);
        self.commit(next).await?;
        info!(id = %target.short(), ?kind, "pinned");
        Ok(())
    }

    async fn rm(&self, ctx: &Context, target: ContentId) -> PinResult<()> {
        let _guard = self.writer.lock().await;
        ctx.check()?;
        let mut next = self.snapshot().await;
        let Some(kind) = next.remove(&target) else {
            return Err(PinError::NotPinned(target));
        };
        self.commit(next).await?;
        info!(id = %target.short(), ?kind, "unpinned");
        Ok(())
    }

    async fn update(
        &self,
        ctx: &Context,
        from: ContentId,
        to: ContentId,
        opts: PinUpdateOptions,
    ) -> PinResult<()> {
        let _guard = self.writer.lock().await;
        ctx.check()?;
        let mut next = self.snapshot().await;
        if next.get(&from) != Some(&PinKind::Recursive) {
            return Err(PinError::NotPinned(from));
        }
        if opts.unpin {
            next.remove(&from);
        }
        next.insert(to, PinKind::Recursive);
        self.commit(next).await?;
        info!(from = %from.short(), to = %to.short(), unpin = opts.unpin, "updated pin");
        Ok(())
    }

    async fn ls(&self, ctx: &Context, opts: PinLsOptions) -> PinResult<Vec<PinEntry>> {
        ctx.check()?;
        let entries = self.snapshot().await;
        let mut out = Vec::new();

        for wanted in [PinKind::Direct, PinKind::Recursive] {
            if opts.pin_type.includes(wanted) {
                out.extend(
                    entries
                        .iter()
                        .filter(|(_, kind)| **kind == wanted)
                        .map(|(id, kind)| PinEntry::new(*id, *kind)),
                );
            }
        }

        if matches!(opts.pin_type, PinType::Indirect | PinType::All) {
            let indirect = self.indirect(ctx, &entries).await?;
            out.extend(
                indirect
                    .into_iter()
                    .map(|id| PinEntry::new(id, PinKind::Indirect)),
            );
        }

        Ok(out)
    }

    async fn is_pinned(&self, ctx: &Context, id: ContentId) -> PinResult<Option<PinKind>> {
        ctx.check()?;
        let entries = self.snapshot().await;
        if let Some(kind) = entries.get(&id) {
            return Ok(Some(*kind));
        }
        for (root, kind) in &entries {
            if *kind != PinKind::Recursive {
                continue;
            }
            let closure = self
                .walker
                .closure_ids(ctx, *root, WalkMode::Lenient)
                .await?;
            if closure.contains(&id) {
                return Ok(Some(PinKind::Indirect));
            }
        }
        Ok(None)
    }

    async fn roots(&self, ctx: &Context) -> PinResult<PinMap> {
        ctx.check()?;
        Ok(self.snapshot().await)
    }
}

impl std::fmt::Debug for Pinner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pinner").finish_non_exhaustive()
    }
}
