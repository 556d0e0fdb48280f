use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::cid::ContentId;
use crate::error::TypeError;

const IPFS_PREFIX: &str = "/ipfs/";
const IPNS_PREFIX: &str = "/ipns/";

/// Where a [`Path`] starts: an immutable node or a mutable name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PathRoot {
    Content(ContentId),
    Name(String),
}

/// A reference to a DAG node, optionally followed by named link segments.
///
/// Two paths with equal roots and segments are interchangeable; the
/// `resolved` flag only records that the path was produced by walking the
/// DAG, so it does not take part in equality.
#[derive(Clone, Debug)]
pub struct Path {
    root: PathRoot,
    segments: Vec<String>,
    resolved: bool,
}

impl Path {
    /// `/ipfs/<id>` with no segments.
    pub fn from_cid(id: ContentId) -> Self {
        Self {
            root: PathRoot::Content(id),
            segments: Vec::new(),
            resolved: false,
        }
    }

    /// `/ipns/<name>` with no segments.
    pub fn from_name(name: impl Into<String>) -> Self {
        Self {
            root: PathRoot::Name(name.into()),
            segments: Vec::new(),
            resolved: false,
        }
    }

    /// A path that has been walked to `id` with nothing left to resolve.
    pub fn resolved(id: ContentId) -> Self {
        Self {
            root: PathRoot::Content(id),
            segments: Vec::new(),
            resolved: true,
        }
    }

    /// Append segments, splitting on `/` and dropping empty components.
    pub fn join(mut self, rest: &str) -> Self {
        self.segments.extend(
            rest.split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        );
        self.resolved = false;
        self
    }

    /// Append already-split segments.
    pub fn with_segments<I, S>(mut self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.segments.extend(segments.into_iter().map(Into::into));
        self.resolved = false;
        self
    }

    pub fn root(&self) -> &PathRoot {
        &self.root
    }

    /// The root identifier, if this path starts at a node.
    pub fn root_cid(&self) -> Option<ContentId> {
        match &self.root {
            PathRoot::Content(id) => Some(*id),
            PathRoot::Name(_) => None,
        }
    }

    /// The node this path refers to, known only once resolved.
    pub fn cid(&self) -> Option<ContentId> {
        if self.is_resolved() {
            self.root_cid()
        } else {
            None
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// `true` once the path names a terminal node with no segments left.
    pub fn is_resolved(&self) -> bool {
        self.resolved && self.segments.is_empty() && matches!(self.root, PathRoot::Content(_))
    }

    pub fn is_name(&self) -> bool {
        matches!(self.root, PathRoot::Name(_))
    }
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root && self.segments == other.segments
    }
}

impl Eq for Path {}

impl std::hash::Hash for Path {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.root.hash(state);
        self.segments.hash(state);
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.root {
            PathRoot::Content(id) => write!(f, "{IPFS_PREFIX}{id}")?,
            PathRoot::Name(name) => write!(f, "{IPNS_PREFIX}{name}")?,
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = TypeError;

    /// Accepts `/ipfs/<id>/..`, `/ipns/<name>/..` and a bare `<id>/..`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| TypeError::InvalidPath {
            path: s.to_string(),
            reason: reason.to_string(),
        };

        let (is_name, rest) = if let Some(rest) = s.strip_prefix(IPFS_PREFIX) {
            (false, rest)
        } else if let Some(rest) = s.strip_prefix(IPNS_PREFIX) {
            (true, rest)
        } else if s.starts_with('/') {
            return Err(invalid("unknown namespace"));
        } else {
            (false, s)
        };

        let mut parts = rest.split('/').filter(|p| !p.is_empty());
        let root = parts.next().ok_or_else(|| invalid("missing root"))?;
        let base = if is_name {
            Path::from_name(root)
        } else {
            let id = root
                .parse::<ContentId>()
                .map_err(|e| invalid(&e.to_string()))?;
            Path::from_cid(id)
        };
        Ok(base.with_segments(parts))
    }
}

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Path {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl From<ContentId> for Path {
    fn from(id: ContentId) -> Self {
        Path::from_cid(id)
    }
}
