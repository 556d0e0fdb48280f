use serde::{Deserialize, Serialize};

use dagnode_crypto::ContentHasher;
use dagnode_types::{Codec, ContentId, HashFn};

use crate::error::{StoreError, StoreResult};

/// How a new node is encoded and identified.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CidFormat {
    /// Codec used to serialize the node body.
    pub codec: Codec,
    /// Hash function applied to the encoded body.
    pub hash_fn: HashFn,
    /// Digest truncation in bytes; `None` keeps the full digest.
    pub hash_len: Option<usize>,
}

impl Default for CidFormat {
    fn default() -> Self {
        Self {
            codec: Codec::DagCbor,
            hash_fn: HashFn::Sha2_256,
            hash_len: None,
        }
    }
}

impl CidFormat {
    pub fn hasher(&self) -> StoreResult<ContentHasher> {
        Ok(ContentHasher::new(self.hash_fn, self.hash_len)?)
    }
}

/// A named edge from one node to another.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    pub name: String,
    #[serde(rename = "cid")]
    pub target: ContentId,
}

impl Link {
    pub fn new(name: impl Into<String>, target: ContentId) -> Self {
        Self {
            name: name.into(),
            target,
        }
    }
}

/// Wire shape of a linking codec body.
#[derive(Serialize, Deserialize)]
struct NodeBody {
    data: Vec<u8>,
    links: Vec<Link>,
}

/// A content-addressed DAG node.
///
/// The identifier is derived from the encoded body, so a `Node` is immutable:
/// changing data or links yields a different node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    id: ContentId,
    data: Vec<u8>,
    links: Vec<Link>,
}

impl Node {
    /// Encode `data` and `links` with `format` and derive the identifier.
    pub fn new(format: &CidFormat, data: Vec<u8>, links: Vec<Link>) -> StoreResult<Self> {
        let bytes = encode(format.codec, &data, &links)?;
        let id = format.hasher()?.hash(format.codec, &bytes);
        Ok(Self { id, data, links })
    }

    /// A link-free node holding `data`, encoded with the default format.
    pub fn leaf(data: impl Into<Vec<u8>>) -> StoreResult<Self> {
        Self::new(&CidFormat::default(), data.into(), Vec::new())
    }

    /// A node with `links` and no data, encoded with the default format.
    pub fn branch(links: Vec<Link>) -> StoreResult<Self> {
        Self::new(&CidFormat::default(), Vec::new(), links)
    }

    /// Decode stored bytes under the codec recorded in `id`.
    ///
    /// The digest is not checked here; see [`Node::check_integrity`].
    pub fn decode(id: ContentId, bytes: &[u8]) -> StoreResult<Self> {
        let codec_err = |reason: String| StoreError::Codec {
            codec: id.codec(),
            reason,
        };
        let (data, links) = match id.codec() {
            Codec::Raw => (bytes.to_vec(), Vec::new()),
            Codec::DagJson => {
                let body: NodeBody =
                    serde_json::from_slice(bytes).map_err(|e| codec_err(e.to_string()))?;
                (body.data, body.links)
            }
            Codec::DagCbor => {
                let body: NodeBody =
                    serde_ipld_dagcbor::from_slice(bytes).map_err(|e| codec_err(e.to_string()))?;
                (body.data, body.links)
            }
        };
        Ok(Self { id, data, links })
    }

    /// Encode this node's body with its own codec.
    pub fn encode(&self) -> StoreResult<Vec<u8>> {
        encode(self.id.codec(), &self.data, &self.links)
    }

    /// Re-encode the body and confirm it digests to the node's identifier.
    pub fn check_integrity(&self) -> StoreResult<()> {
        let bytes = self.encode()?;
        if ContentHasher::verify(&bytes, &self.id) {
            return Ok(());
        }
        let hasher = ContentHasher::new(self.id.hash_fn(), Some(self.id.digest().len()))?;
        Err(StoreError::HashMismatch {
            id: self.id,
            computed: hasher.hash(self.id.codec(), &bytes),
        })
    }

    pub fn id(&self) -> ContentId {
        self.id
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Outgoing links in declared order.
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// First link named `name`.
    pub fn link(&self, name: &str) -> Option<&Link> {
        self.links.iter().find(|l| l.name == name)
    }

    pub fn is_leaf(&self) -> bool {
        self.links.is_empty()
    }
}

fn encode(codec: Codec, data: &[u8], links: &[Link]) -> StoreResult<Vec<u8>> {
    let codec_err = |reason: String| StoreError::Codec { codec, reason };
    match codec {
        Codec::Raw if !links.is_empty() => Err(StoreError::LinksUnsupported(codec)),
        Codec::Raw => Ok(data.to_vec()),
        Codec::DagJson => {
            let body = NodeBody {
                data: data.to_vec(),
                links: links.to_vec(),
            };
            serde_json::to_vec(&body).map_err(|e| codec_err(e.to_string()))
        }
        Codec::DagCbor => {
            let body = NodeBody {
                data: data.to_vec(),
                links: links.to_vec(),
            };
            serde_ipld_dagcbor::to_vec(&body).map_err(|e| codec_err(e.to_string()))
        }
    }
}
