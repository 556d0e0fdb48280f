//! The DAG API: put, get, tree, and ls over a [`NodeStore`].

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use dagnode_store::{CidFormat, Link, Node, NodeStore};
use dagnode_types::{Context, Path, TypeError};

use crate::error::{DagError, DagResult};
use crate::resolver::Resolver;

/// Encoding of the bytes handed to [`DagApi::put`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputEncoding {
    /// `{"data": "<string>", "links": [{"name": "..", "cid": ".."}]}`
    #[default]
    Json,
    /// The bytes become the node data; no links.
    Raw,
}

impl fmt::Display for InputEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Raw => write!(f, "raw"),
        }
    }
}

impl FromStr for InputEncoding {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "raw" => Ok(Self::Raw),
            other => Err(TypeError::UnknownName {
                kind: "input encoding",
                name: other.to_string(),
            }),
        }
    }
}

/// Options for [`DagApi::put`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DagPutOptions {
    pub input_encoding: InputEncoding,
    pub format: CidFormat,
}

/// Options for [`DagApi::tree`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DagTreeOptions {
    /// Maximum link depth to list; `None` lists everything.
    pub depth: Option<usize>,
}

#[derive(Deserialize)]
struct JsonInput {
    #[serde(default)]
    data: String,
    #[serde(default)]
    links: Vec<Link>,
}

/// Reads and writes DAG nodes by path.
#[derive(Clone, Debug)]
pub struct DagApi {
    resolver: Resolver,
}

impl DagApi {
    pub fn new(store: Arc<dyn NodeStore>) -> Self {
        Self {
            resolver: Resolver::new(store),
        }
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    fn store(&self) -> &Arc<dyn NodeStore> {
        self.resolver.store()
    }

    /// Decode `input`, encode it as a node, store it, and return its path.
    pub async fn put(&self, ctx: &Context, input: &[u8], opts: DagPutOptions) -> DagResult<Path> {
        let (data, links) = match opts.input_encoding {
            InputEncoding::Raw => (input.to_vec(), Vec::new()),
            InputEncoding::Json => {
                let parsed: JsonInput = serde_json::from_slice(input)
                    .map_err(|e| DagError::InvalidInput(e.to_string()))?;
                (parsed.data.into_bytes(), parsed.links)
            }
        };

        let node = Node::new(&opts.format, data, links)?;
        let id = ctx
            .run(self.store().put(ctx, &node))
            .await
            .map_err(|e| DagError::from_store(ctx, e))?;
        info!(id = %id.short(), codec = %opts.format.codec, "stored node");
        Ok(Path::resolved(id))
    }

    /// Resolve `path` and fetch the node it names.
    pub async fn get(&self, ctx: &Context, path: &Path) -> DagResult<Node> {
        self.resolver.resolve_node(ctx, path).await
    }

    /// The links of the node at `path`, in declared order.
    pub async fn ls(&self, ctx: &Context, path: &Path) -> DagResult<Vec<Link>> {
        Ok(self.get(ctx, path).await?.links().to_vec())
    }

    /// Every link path below the node at `path`, breadth-first.
    ///
    /// Paths are rooted at the resolved node. A node reachable along several
    /// paths is listed once per path.
    pub async fn tree(
        &self,
        ctx: &Context,
        path: &Path,
        opts: DagTreeOptions,
    ) -> DagResult<Vec<Path>> {
        let root = self.get(ctx, path).await?;
        let base = Path::from_cid(root.id());

        let mut out = Vec::new();
        let mut queue: VecDeque<(Node, Vec<String>)> = VecDeque::new();
        queue.push_back((root, Vec::new()));

        while let Some((node, prefix)) = queue.pop_front() {
            let depth = prefix.len() + 1;
            if opts.depth.is_some_and(|max| depth > max) {
                continue;
            }
            for link in node.links() {
                let mut segments = prefix.clone();
                segments.push(link.name.clone());
                out.push(base.clone().with_segments(segments.iter().cloned()));

                if opts.depth.map_or(true, |max| depth < max) {
                    ctx.check()?;
                    let child = self
                        .store()
                        .get(ctx, &link.target)
                        .await
                        .map_err(|e| DagError::from_store(ctx, e))?;
                    queue.push_back((child, segments));
                }
            }
        }

        Ok(out)
    }
}
