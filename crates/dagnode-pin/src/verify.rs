//! Streaming pin verification.
//!
//! A spawned producer walks every pin and pushes one [`PinStatus`] per entry
//! into a bounded channel, so a slow consumer holds the walk back instead of
//! letting results pile up. Direct and recursive entries are read from one
//! snapshot; indirect entries are sent while the closures are still being
//! walked. Per-node failures become records; only cancellation ends the
//! stream early, and it does so without an error.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use dagnode_dag::{DagError, LinkWalker, WalkOptions};
use dagnode_store::{NodeStore, StoreError};
use dagnode_types::{ContentId, Context};

use crate::pinner::PinSet;
use crate::types::{PinEntry, PinKind, PinStatus};

/// Default capacity of the verification channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Checks pinned objects against the node store.
pub trait Verifier: Send + Sync {
    /// Start verifying every pin.
    ///
    /// Each call walks the current pin set afresh. Records arrive in listing
    /// order: direct, recursive, then indirect.
    fn verify(&self, ctx: &Context) -> PinStatusStream;
}

/// Lazy, finite sequence of verification records.
///
/// Dropping the stream stops the producer.
pub struct PinStatusStream {
    rx: mpsc::Receiver<PinStatus>,
    ctx: Context,
    producer: JoinHandle<()>,
}

impl PinStatusStream {
    /// The next record, or `None` once every pin was checked or the context
    /// ended.
    pub async fn next(&mut self) -> Option<PinStatus> {
        if self.ctx.check().is_err() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.ctx.done() => None,
            status = self.rx.recv() => status,
        }
    }

    /// Drain the remaining records.
    pub async fn collect(mut self) -> Vec<PinStatus> {
        let mut out = Vec::new();
        while let Some(status) = self.next().await {
            out.push(status);
        }
        out
    }
}

impl Drop for PinStatusStream {
    fn drop(&mut self) {
        self.producer.abort();
    }
}

impl std::fmt::Debug for PinStatusStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinStatusStream")
            .field("finished", &self.producer.is_finished())
            .finish()
    }
}

/// [`Verifier`] over a [`PinSet`] and the [`NodeStore`] it retains.
#[derive(Clone)]
pub struct PinVerifier {
    pins: Arc<dyn PinSet>,
    store: Arc<dyn NodeStore>,
    capacity: usize,
}

impl PinVerifier {
    pub fn new(pins: Arc<dyn PinSet>, store: Arc<dyn NodeStore>) -> Self {
        Self {
            pins,
            store,
            capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Set the channel capacity. Zero is raised to one.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }
}

impl Verifier for PinVerifier {
    fn verify(&self, ctx: &Context) -> PinStatusStream {
        let (tx, rx) = mpsc::channel(self.capacity);
        let producer = tokio::spawn(produce(
            self.pins.clone(),
            self.store.clone(),
            ctx.clone(),
            tx,
        ));
        PinStatusStream {
            rx,
            ctx: ctx.clone(),
            producer,
        }
    }
}

impl std::fmt::Debug for PinVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinVerifier")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

async fn produce(
    pins: Arc<dyn PinSet>,
    store: Arc<dyn NodeStore>,
    ctx: Context,
    tx: mpsc::Sender<PinStatus>,
) {
    let roots = match pins.roots(&ctx).await {
        Ok(roots) => roots,
        Err(err) => {
            debug!(error = %err, "verification stopped before reading pins");
            return;
        }
    };

    for wanted in [PinKind::Direct, PinKind::Recursive] {
        for (id, _) in roots.iter().filter(|(_, kind)| **kind == wanted) {
            let entry = PinEntry::new(*id, wanted);
            let status = match check_node(store.as_ref(), &ctx, id).await {
                Ok(()) => PinStatus::ok(entry.path(), wanted),
                Err(err) if DagError::interrupted(&ctx, &err).is_some() => return,
                Err(cause) => PinStatus::failed(entry.path(), wanted, cause),
            };
            if !emit(&ctx, &tx, status).await {
                return;
            }
        }
    }

    // Indirect records are sent as the walks find them, in listing order.
    let walker = LinkWalker::new(store);
    let mut seen = HashSet::new();
    let recursive = roots
        .iter()
        .filter(|(_, kind)| **kind == PinKind::Recursive)
        .map(|(id, _)| *id);
    for root in recursive {
        let mut walk = walker.walk(root, WalkOptions::verifying());
        while let Some(visit) = walk.next(&ctx).await {
            let Ok(visit) = visit else {
                return;
            };
            if roots.contains_key(&visit.id) || !seen.insert(visit.id) {
                continue;
            }
            let path = PinEntry::new(visit.id, PinKind::Indirect).path();
            let status = match visit.error {
                None => PinStatus::ok(path, PinKind::Indirect),
                Some(cause) => PinStatus::failed(path, PinKind::Indirect, cause),
            };
            if !emit(&ctx, &tx, status).await {
                return;
            }
        }
    }
    debug!("verification finished");
}

/// Send one record. `false` means the stream is over.
async fn emit(ctx: &Context, tx: &mpsc::Sender<PinStatus>, status: PinStatus) -> bool {
    if !status.ok {
        warn!(path = %status.path, kind = ?status.kind, "pin failed verification");
    }
    tokio::select! {
        biased;
        _ = ctx.done() => false,
        sent = tx.send(status) => sent.is_ok(),
    }
}

async fn check_node(store: &dyn NodeStore, ctx: &Context, id: &ContentId) -> Result<(), StoreError> {
    store.get(ctx, id).await?.check_integrity()
}
