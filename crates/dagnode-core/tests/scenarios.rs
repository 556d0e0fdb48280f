//! End-to-end behaviour of the core API over in-memory collaborators.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use dagnode_core::{CoreApi, CoreError, ErrorSeverity, NodeConfig};
use dagnode_name::{
    InMemoryRecordSource, NameError, NamePublishOptions, NameResolveOptions, NameValue, Record,
    RecordSource,
};
use dagnode_pin::{
    PinAddOptions, PinEntry, PinError, PinKind, PinLsOptions, PinSet, PinType, PinUpdateOptions,
};
use dagnode_store::{CidFormat, InMemoryNodeStore, Link, Node, NodeStore, StoreError};
use dagnode_types::{ContentId, Context, Path};

const HOUR: Duration = Duration::from_secs(3600);

struct Harness {
    api: CoreApi,
    store: Arc<InMemoryNodeStore>,
    records: Arc<InMemoryRecordSource>,
    ctx: Context,
}

impl Harness {
    async fn new() -> Self {
        Self::with_config(NodeConfig::default()).await
    }

    async fn with_config(config: NodeConfig) -> Self {
        let store = Arc::new(InMemoryNodeStore::new());
        let records = Arc::new(InMemoryRecordSource::new());
        let api = CoreApi::new(config, store.clone(), records.clone())
            .await
            .unwrap();
        Self {
            api,
            store,
            records,
            ctx: Context::background(),
        }
    }

    async fn put(&self, node: Node) -> ContentId {
        self.store.put(&self.ctx, &node).await.unwrap()
    }

    async fn leaf(&self, data: &str) -> ContentId {
        self.put(Node::leaf(data.as_bytes().to_vec()).unwrap()).await
    }

    async fn dir(&self, links: &[(&str, ContentId)]) -> ContentId {
        let links = links.iter().map(|(n, id)| Link::new(*n, *id)).collect();
        self.put(Node::branch(links).unwrap()).await
    }

    async fn pin(&self, id: ContentId, recursive: bool) {
        self.api
            .pin_add(&self.ctx, &Path::resolved(id), PinAddOptions { recursive })
            .await
            .unwrap();
    }

    async fn ls(&self, pin_type: PinType) -> Vec<PinEntry> {
        self.api
            .pin_ls(&self.ctx, PinLsOptions { pin_type })
            .await
            .unwrap()
    }

    async fn indirect(&self) -> BTreeSet<ContentId> {
        self.ls(PinType::Indirect)
            .await
            .into_iter()
            .map(|e| e.target)
            .collect()
    }

    /// A -> [B, C], B -> [D]
    async fn sample(&self) -> [ContentId; 4] {
        let d = self.leaf("d").await;
        let c = self.leaf("c").await;
        let b = self.dir(&[("d", d)]).await;
        let a = self.dir(&[("b", b), ("c", c)]).await;
        [a, b, c, d]
    }
}

// ---------------------------------------------------------------
// Pin set
// ---------------------------------------------------------------

#[tokio::test]
async fn recursive_pin_lists_whole_closure() {
    let h = Harness::new().await;
    let [a, b, c, d] = h.sample().await;
    h.pin(a, true).await;

    assert_eq!(
        h.ls(PinType::All).await,
        vec![
            PinEntry::new(a, PinKind::Recursive),
            PinEntry::new(b, PinKind::Indirect),
            PinEntry::new(c, PinKind::Indirect),
            PinEntry::new(d, PinKind::Indirect),
        ]
    );
}

#[tokio::test]
async fn adding_recursive_twice_is_idempotent() {
    let h = Harness::new().await;
    let [a, ..] = h.sample().await;
    h.pin(a, true).await;
    let before = h.ls(PinType::All).await;

    h.pin(a, true).await;
    assert_eq!(h.ls(PinType::All).await, before);
    assert_eq!(h.api.pin().roots(&h.ctx).await.unwrap().len(), 1);
}

#[tokio::test]
async fn direct_pin_wins_over_indirect() {
    let h = Harness::new().await;
    let [a, b, c, d] = h.sample().await;
    h.pin(a, true).await;
    h.pin(b, false).await;

    let all = h.ls(PinType::All).await;
    assert!(all.contains(&PinEntry::new(b, PinKind::Direct)));
    assert!(!all.contains(&PinEntry::new(b, PinKind::Indirect)));
    assert_eq!(h.indirect().await, BTreeSet::from([c, d]));
}

#[tokio::test]
async fn unpinning_root_shrinks_indirect_set_but_keeps_shared() {
    let h = Harness::new().await;
    let [a, _b, c, _d] = h.sample().await;
    let e = h.dir(&[("c", c)]).await;
    h.pin(a, true).await;
    h.pin(e, true).await;

    h.api.pin_rm(&h.ctx, &Path::resolved(a)).await.unwrap();
    assert_eq!(h.indirect().await, BTreeSet::from([c]));
}

#[tokio::test]
async fn indirect_pin_cannot_be_removed() {
    let h = Harness::new().await;
    let [a, b, ..] = h.sample().await;
    h.pin(a, true).await;

    let err = h.api.pin_rm(&h.ctx, &Path::resolved(b)).await.unwrap_err();
    assert!(matches!(err, CoreError::Pin(PinError::NotPinned(id)) if id == b));
    assert_eq!(err.severity(), ErrorSeverity::Client);
}

#[tokio::test]
async fn update_swaps_root_without_traversal() {
    let h = Harness::new().await;
    let [a, ..] = h.sample().await;
    h.pin(a, true).await;

    // Never stored: update must not look at it.
    let a2 = Node::leaf(b"a2".to_vec()).unwrap().id();
    let fetches = h.store.fetch_count();
    h.api
        .pin_update(
            &h.ctx,
            &Path::resolved(a),
            &Path::resolved(a2),
            PinUpdateOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(h.store.fetch_count(), fetches);

    assert_eq!(
        h.ls(PinType::Recursive).await,
        vec![PinEntry::new(a2, PinKind::Recursive)]
    );
    assert_eq!(h.api.pin().is_pinned(&h.ctx, a).await.unwrap(), None);
}

#[tokio::test]
async fn update_from_non_recursive_is_not_pinned() {
    let h = Harness::new().await;
    let [a, b, ..] = h.sample().await;
    h.pin(a, false).await;

    let err = h
        .api
        .pin_update(
            &h.ctx,
            &Path::resolved(a),
            &Path::resolved(b),
            PinUpdateOptions::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Pin(PinError::NotPinned(_))));
}

#[tokio::test]
async fn recursive_add_over_missing_link_pins_nothing() {
    let h = Harness::new().await;
    let [a, _, c, _] = h.sample().await;
    h.store.delete(&h.ctx, &c).await.unwrap();

    let err = h
        .api
        .pin_add(&h.ctx, &Path::resolved(a), PinAddOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Pin(PinError::Resolution { .. })));
    assert!(h.ls(PinType::All).await.is_empty());
}

#[tokio::test]
async fn pin_by_path_segments() {
    let h = Harness::new().await;
    let [a, b, _, d] = h.sample().await;

    let pinned = h
        .api
        .pin_add(&h.ctx, &Path::from_cid(a).join("b"), PinAddOptions::default())
        .await
        .unwrap();
    assert_eq!(pinned, Path::resolved(b));
    assert_eq!(h.indirect().await, BTreeSet::from([d]));
}

// ---------------------------------------------------------------
// Verify
// ---------------------------------------------------------------

#[tokio::test]
async fn verify_of_intact_store_is_all_ok() {
    let h = Harness::new().await;
    let [a, ..] = h.sample().await;
    let extra = h.leaf("extra").await;
    h.pin(a, true).await;
    h.pin(extra, false).await;

    let statuses = h.api.pin_verify(&h.ctx).collect().await;
    assert_eq!(statuses.len(), 5);
    assert!(statuses.iter().all(|s| s.ok && s.cause.is_none()));
}

#[tokio::test]
async fn verify_reports_exactly_one_deleted_entry() {
    let h = Harness::new().await;
    let mut leaves = Vec::new();
    for i in 0..5 {
        let id = h.leaf(&format!("leaf-{i}")).await;
        h.pin(id, false).await;
        leaves.push(id);
    }
    h.store.delete(&h.ctx, &leaves[2]).await.unwrap();

    let statuses = h.api.pin_verify(&h.ctx).collect().await;
    assert_eq!(statuses.len(), 5);
    let failed: Vec<_> = statuses.iter().filter(|s| !s.ok).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].path, Path::resolved(leaves[2]));
    assert_eq!(failed[0].cause, Some(StoreError::NotFound(leaves[2])));
}

#[tokio::test]
async fn verify_stream_stops_on_cancel() {
    let h = Harness::new().await;
    for i in 0..20 {
        let id = h.leaf(&format!("n{i}")).await;
        h.pin(id, false).await;
    }

    let ctx = Context::background();
    let mut stream = h.api.pin_verify(&ctx);
    assert!(stream.next().await.is_some());
    ctx.cancel();
    assert!(stream.next().await.is_none());
}

// ---------------------------------------------------------------
// Naming
// ---------------------------------------------------------------

async fn chain(h: &Harness, target: &Path) {
    h.records
        .publish(&h.ctx, "name1", Record::valid_for(NameValue::Name("name2".into()), HOUR))
        .await
        .unwrap();
    h.records
        .publish(&h.ctx, "name2", Record::valid_for(target.clone(), HOUR))
        .await
        .unwrap();
}

#[tokio::test]
async fn name_chain_resolves_within_depth() {
    let mut config = NodeConfig::default();
    config.naming.max_depth = 2;
    let h = Harness::with_config(config).await;
    let [a, b, ..] = h.sample().await;
    chain(&h, &Path::from_cid(a)).await;

    let resolved = h
        .api
        .resolve_path(&h.ctx, &Path::from_name("name1").join("b"))
        .await
        .unwrap();
    assert_eq!(resolved, Path::resolved(b));
}

#[tokio::test]
async fn name_chain_beyond_depth_fails() {
    let mut config = NodeConfig::default();
    config.naming.max_depth = 1;
    let h = Harness::with_config(config).await;
    let [a, ..] = h.sample().await;
    chain(&h, &Path::from_cid(a)).await;

    let err = h
        .api
        .resolve_path(&h.ctx, &Path::from_name("name1"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::Name(NameError::RecursionLimitExceeded { limit: 1, .. })
    ));
    assert_eq!(err.severity(), ErrorSeverity::Client);
}

#[tokio::test]
async fn non_recursive_resolution_stops_at_next_name() {
    let h = Harness::new().await;
    let [a, ..] = h.sample().await;
    chain(&h, &Path::from_cid(a)).await;

    let resolved = h
        .api
        .name()
        .resolve(&h.ctx, "name1", NameResolveOptions::default())
        .await
        .unwrap();
    assert_eq!(resolved, Path::from_name("name2"));
}

#[tokio::test]
async fn offline_resolution_of_remote_name_fails() {
    let h = Harness::new().await;
    let [a, ..] = h.sample().await;
    h.records
        .insert_remote("far", Record::valid_for(Path::from_cid(a), HOUR))
        .unwrap();

    let offline = NameResolveOptions {
        local_only: true,
        ..Default::default()
    };
    let err = h
        .api
        .name()
        .resolve(&h.ctx, "far", offline)
        .await
        .unwrap_err();
    assert_eq!(err, NameError::OfflineResolutionFailed { name: "far".into() });

    let online = h
        .api
        .name()
        .resolve(&h.ctx, "far", NameResolveOptions::default())
        .await
        .unwrap();
    assert_eq!(online, Path::from_cid(a));
}

#[tokio::test]
async fn pin_through_published_name() {
    let h = Harness::new().await;
    let [a, b, _, d] = h.sample().await;
    let entry = h
        .api
        .name()
        .publish(&h.ctx, Path::from_cid(a), NamePublishOptions::default())
        .await
        .unwrap();

    let pinned = h
        .api
        .pin_add(&h.ctx, &Path::from_name(entry.name).join("b"), PinAddOptions::default())
        .await
        .unwrap();
    assert_eq!(pinned, Path::resolved(b));
    assert_eq!(h.indirect().await, BTreeSet::from([d]));
}

// ---------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------

#[tokio::test]
async fn cancelled_context_interrupts_resolution() {
    let h = Harness::new().await;
    let [a, ..] = h.sample().await;
    let ctx = Context::background();
    ctx.cancel();

    let err = h
        .api
        .resolve_path(&ctx, &Path::from_cid(a).join("b/d"))
        .await
        .unwrap_err();
    assert!(err.is_interrupted());
    assert_eq!(err.severity(), ErrorSeverity::Client);
}

#[tokio::test(start_paused = true)]
async fn deadline_bounds_slow_store() {
    let store = Arc::new(InMemoryNodeStore::new().with_latency(Duration::from_secs(30)));
    let records = Arc::new(InMemoryRecordSource::new());
    let api = CoreApi::new(NodeConfig::default(), store.clone(), records)
        .await
        .unwrap();

    let ctx = Context::background();
    let leaf = store.put(&ctx, &Node::leaf(b"x".to_vec()).unwrap()).await.unwrap();
    let root = store
        .put(&ctx, &Node::branch(vec![Link::new("x", leaf)]).unwrap())
        .await
        .unwrap();

    let short = ctx.with_timeout(Duration::from_secs(1));
    let err = api
        .resolve_path(&short, &Path::from_cid(root).join("x"))
        .await
        .unwrap_err();
    assert!(err.is_interrupted());
}

// ---------------------------------------------------------------
// Properties
// ---------------------------------------------------------------

/// Node `i` links only to higher indices, so the graph is acyclic.
fn arb_graph() -> impl Strategy<Value = (Vec<Vec<usize>>, Vec<usize>, usize)> {
    (2usize..9).prop_flat_map(|n| {
        let links = (0..n)
            .map(|i| proptest::collection::vec(i + 1..n + 1, 0..3))
            .collect::<Vec<_>>();
        let roots = proptest::collection::vec(0..n, 1..4);
        (links, roots, 0usize..4)
    })
}

fn reachable(links: &[Vec<usize>], from: usize) -> BTreeSet<usize> {
    let mut seen = BTreeSet::new();
    let mut stack = vec![from];
    while let Some(i) = stack.pop() {
        if seen.insert(i) {
            if let Some(next) = links.get(i) {
                stack.extend(next.iter().copied());
            }
        }
    }
    seen
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// After removing one recursive root, the indirect set is exactly what
    /// the remaining roots reach, minus the roots themselves.
    #[test]
    fn prop_indirect_set_tracks_remaining_roots(graph in arb_graph()) {
        let (links, roots, victim) = graph;
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        rt.block_on(async {
            let h = Harness::new().await;
            let n = links.len();

            // Index n is a leaf; distinct data keeps every node distinct.
            let mut ids = vec![h.leaf("sink").await; n + 1];
            for i in (0..n).rev() {
                let node_links = links[i]
                    .iter()
                    .enumerate()
                    .map(|(k, j)| Link::new(format!("l{k}"), ids[*j]))
                    .collect();
                let node = Node::new(&CidFormat::default(), format!("n{i}").into_bytes(), node_links)
                    .unwrap();
                ids[i] = h.put(node).await;
            }

            let roots: BTreeSet<usize> = roots.into_iter().collect();
            for r in &roots {
                h.pin(ids[*r], true).await;
            }
            let victim = *roots.iter().nth(victim % roots.len()).unwrap();
            h.api.pin_rm(&h.ctx, &Path::resolved(ids[victim])).await.unwrap();

            let remaining: Vec<usize> = roots.iter().copied().filter(|r| *r != victim).collect();
            let mut expected = BTreeSet::new();
            for r in &remaining {
                for i in reachable(&links, *r) {
                    expected.insert(ids[i]);
                }
            }
            for r in &remaining {
                expected.remove(&ids[*r]);
            }

            prop_assert_eq!(h.indirect().await, expected);
            Ok(())
        })?;
    }
}
