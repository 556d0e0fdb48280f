use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Maximum digest length carried by a [`ContentId`].
pub const MAX_DIGEST_LEN: usize = 32;

/// Serialization format of a DAG node body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Codec {
    /// Deterministic CBOR encoding with links (multicodec 0x71).
    DagCbor,
    /// JSON encoding with links (multicodec 0x0129).
    DagJson,
    /// Opaque bytes without links (multicodec 0x55).
    Raw,
}

impl Codec {
    /// Multicodec code for this codec.
    pub const fn code(&self) -> u16 {
        match self {
            Self::DagCbor => 0x71,
            Self::DagJson => 0x0129,
            Self::Raw => 0x55,
        }
    }

    /// Look up a codec by its multicodec code.
    pub fn from_code(code: u16) -> Result<Self, TypeError> {
        match code {
            0x71 => Ok(Self::DagCbor),
            0x0129 => Ok(Self::DagJson),
            0x55 => Ok(Self::Raw),
            other => Err(TypeError::UnknownCodec(u64::from(other))),
        }
    }

    /// Whether nodes encoded with this codec may carry links.
    pub const fn supports_links(&self) -> bool {
        !matches!(self, Self::Raw)
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DagCbor => write!(f, "dag-cbor"),
            Self::DagJson => write!(f, "dag-json"),
            Self::Raw => write!(f, "raw"),
        }
    }
}

impl FromStr for Codec {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dag-cbor" | "cbor" => Ok(Self::DagCbor),
            "dag-json" | "json" => Ok(Self::DagJson),
            "raw" => Ok(Self::Raw),
            other => Err(TypeError::UnknownName {
                kind: "codec",
                name: other.to_string(),
            }),
        }
    }
}

/// Hash function used to derive a [`ContentId`] digest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HashFn {
    /// SHA2-256 (multihash 0x12).
    Sha2_256,
    /// BLAKE3 with a 32-byte output (multihash 0x1e).
    Blake3,
}

impl HashFn {
    /// Multihash code for this function.
    pub const fn code(&self) -> u8 {
        match self {
            Self::Sha2_256 => 0x12,
            Self::Blake3 => 0x1e,
        }
    }

    /// Look up a hash function by its multihash code.
    pub fn from_code(code: u8) -> Result<Self, TypeError> {
        match code {
            0x12 => Ok(Self::Sha2_256),
            0x1e => Ok(Self::Blake3),
            other => Err(TypeError::UnknownHash(u64::from(other))),
        }
    }

    /// Full digest length in bytes.
    pub const fn digest_len(&self) -> usize {
        32
    }
}

impl fmt::Display for HashFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha2_256 => write!(f, "sha2-256"),
            Self::Blake3 => write!(f, "blake3"),
        }
    }
}

impl FromStr for HashFn {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha2-256" | "sha256" => Ok(Self::Sha2_256),
            "blake3" => Ok(Self::Blake3),
            other => Err(TypeError::UnknownName {
                kind: "hash function",
                name: other.to_string(),
            }),
        }
    }
}

/// Content identifier of a DAG node.
///
/// A `ContentId` is a self-describing hash reference: the codec that encoded
/// the node, the hash function that digested the encoding, and the (possibly
/// truncated) digest itself. Equality is structural, so two identifiers are
/// equal exactly when all four parts are equal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentId {
    codec: Codec,
    hash_fn: HashFn,
    len: u8,
    digest: [u8; MAX_DIGEST_LEN],
}

impl ContentId {
    /// Build an identifier from a digest. The digest must be 1..=32 bytes.
    pub fn new(codec: Codec, hash_fn: HashFn, digest: &[u8]) -> Result<Self, TypeError> {
        if digest.is_empty() || digest.len() > MAX_DIGEST_LEN {
            return Err(TypeError::InvalidLength {
                expected: MAX_DIGEST_LEN,
                actual: digest.len(),
            });
        }
        let mut buf = [0u8; MAX_DIGEST_LEN];
        buf[..digest.len()].copy_from_slice(digest);
        Ok(Self {
            codec,
            hash_fn,
            len: digest.len() as u8,
            digest: buf,
        })
    }

    /// Build an identifier from a full digest truncated to `len` bytes.
    ///
    /// `len` is clamped to `1..=32`.
    pub fn truncated(codec: Codec, hash_fn: HashFn, digest: [u8; MAX_DIGEST_LEN], len: usize) -> Self {
        let len = len.clamp(1, MAX_DIGEST_LEN);
        let mut buf = [0u8; MAX_DIGEST_LEN];
        buf[..len].copy_from_slice(&digest[..len]);
        Self {
            codec,
            hash_fn,
            len: len as u8,
            digest: buf,
        }
    }

    /// The codec of the referenced node.
    pub fn codec(&self) -> Codec {
        self.codec
    }

    /// The hash function that produced the digest.
    pub fn hash_fn(&self) -> HashFn {
        self.hash_fn
    }

    /// The digest bytes.
    pub fn digest(&self) -> &[u8] {
        &self.digest[..self.len as usize]
    }

    /// Binary form: `codec (2 bytes BE) | hash fn | digest len | digest`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + self.len as usize);
        out.extend_from_slice(&self.codec.code().to_be_bytes());
        out.push(self.hash_fn.code());
        out.push(self.len);
        out.extend_from_slice(self.digest());
        out
    }

    /// Parse the binary form produced by [`ContentId::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypeError> {
        if bytes.len() < 5 {
            return Err(TypeError::InvalidLength {
                expected: 5,
                actual: bytes.len(),
            });
        }
        let codec = Codec::from_code(u16::from_be_bytes([bytes[0], bytes[1]]))?;
        let hash_fn = HashFn::from_code(bytes[2])?;
        let len = bytes[3] as usize;
        let digest = &bytes[4..];
        if digest.len() != len {
            return Err(TypeError::InvalidLength {
                expected: len,
                actual: digest.len(),
            });
        }
        Self::new(codec, hash_fn, digest)
    }

    /// Hex-encoded text form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Short digest prefix (first 8 hex characters), for logs.
    pub fn short(&self) -> String {
        let digest = self.digest();
        hex::encode(&digest[..digest.len().min(4)])
    }

    /// Parse the hex text form.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({}:{})", self.codec, self.short())
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for ContentId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for ContentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
