use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use dagnode_store::StoreError;
use dagnode_types::{ContentId, Path, TypeError};

/// How an object is retained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinKind {
    /// Retains exactly one object.
    Direct,
    /// Retains an object and its whole link closure.
    Recursive,
    /// Retained only because a recursive pin reaches it. Never stored.
    Indirect,
}

impl fmt::Display for PinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Recursive => write!(f, "recursive"),
            Self::Indirect => write!(f, "indirect"),
        }
    }
}

/// Which pins a listing returns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinType {
    Direct,
    Recursive,
    Indirect,
    #[default]
    All,
}

impl PinType {
    pub fn includes(&self, kind: PinKind) -> bool {
        match self {
            Self::All => true,
            Self::Direct => kind == PinKind::Direct,
            Self::Recursive => kind == PinKind::Recursive,
            Self::Indirect => kind == PinKind::Indirect,
        }
    }
}

impl fmt::Display for PinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Recursive => write!(f, "recursive"),
            Self::Indirect => write!(f, "indirect"),
            Self::All => write!(f, "all"),
        }
    }
}

impl FromStr for PinType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(Self::Direct),
            "recursive" => Ok(Self::Recursive),
            "indirect" => Ok(Self::Indirect),
            "all" => Ok(Self::All),
            other => Err(TypeError::UnknownName {
                kind: "pin type",
                name: other.to_string(),
            }),
        }
    }
}

/// A pinned identifier and how it is retained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PinEntry {
    pub target: ContentId,
    pub kind: PinKind,
}

impl PinEntry {
    pub fn new(target: ContentId, kind: PinKind) -> Self {
        Self { target, kind }
    }

    /// The resolved path of the pinned object.
    pub fn path(&self) -> Path {
        Path::resolved(self.target)
    }
}

/// Options for pin add.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinAddOptions {
    /// Pin the whole link closure, not just the root.
    pub recursive: bool,
}

impl Default for PinAddOptions {
    fn default() -> Self {
        Self { recursive: true }
    }
}

/// Options for pin ls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinLsOptions {
    pub pin_type: PinType,
}

/// Options for pin update.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinUpdateOptions {
    /// Remove `from` once `to` is pinned.
    pub unpin: bool,
}

impl Default for PinUpdateOptions {
    fn default() -> Self {
        Self { unpin: true }
    }
}

/// Verification outcome for one pinned object.
///
/// `ok` and `cause` describe the object itself, never its descendants; a
/// failing descendant of a recursive pin gets its own indirect record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PinStatus {
    pub path: Path,
    pub kind: PinKind,
    pub ok: bool,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_cause"
    )]
    pub cause: Option<StoreError>,
}

impl PinStatus {
    pub fn ok(path: Path, kind: PinKind) -> Self {
        Self {
            path,
            kind,
            ok: true,
            cause: None,
        }
    }

    pub fn failed(path: Path, kind: PinKind, cause: StoreError) -> Self {
        Self {
            path,
            kind,
            ok: false,
            cause: Some(cause),
        }
    }
}

fn serialize_cause<S: Serializer>(cause: &Option<StoreError>, s: S) -> Result<S::Ok, S::Error> {
    match cause {
        Some(err) => s.collect_str(err),
        None => s.serialize_none(),
    }
}
