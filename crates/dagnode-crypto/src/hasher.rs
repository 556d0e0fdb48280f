use dagnode_types::{Codec, ContentId, HashFn, MAX_DIGEST_LEN};
use sha2::{Digest, Sha256};

/// Content hasher producing [`ContentId`]s.
///
/// A hasher is fixed to one hash function and an optional digest truncation.
/// The codec is supplied per call because it describes the bytes being
/// hashed, not the hash itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContentHasher {
    hash_fn: HashFn,
    len: usize,
}

impl ContentHasher {
    /// Full-length SHA2-256 hasher.
    pub const SHA2_256: Self = Self {
        hash_fn: HashFn::Sha2_256,
        len: MAX_DIGEST_LEN,
    };
    /// Full-length BLAKE3 hasher.
    pub const BLAKE3: Self = Self {
        hash_fn: HashFn::Blake3,
        len: MAX_DIGEST_LEN,
    };

    /// Create a hasher, optionally truncating digests to `hash_len` bytes.
    pub fn new(hash_fn: HashFn, hash_len: Option<usize>) -> Result<Self, HasherError> {
        let len = match hash_len {
            None => hash_fn.digest_len(),
            Some(len) if (1..=hash_fn.digest_len()).contains(&len) => len,
            Some(len) => {
                return Err(HasherError::InvalidLength {
                    hash_fn,
                    requested: len,
                })
            }
        };
        Ok(Self { hash_fn, len })
    }

    pub fn hash_fn(&self) -> HashFn {
        self.hash_fn
    }

    /// Raw digest of `data` without truncation.
    pub fn digest(hash_fn: HashFn, data: &[u8]) -> [u8; 32] {
        match hash_fn {
            HashFn::Sha2_256 => Sha256::digest(data).into(),
            HashFn::Blake3 => *blake3::hash(data).as_bytes(),
        }
    }

    /// Hash encoded node bytes into an identifier tagged with `codec`.
    pub fn hash(&self, codec: Codec, data: &[u8]) -> ContentId {
        ContentId::truncated(codec, self.hash_fn, Self::digest(self.hash_fn, data), self.len)
    }

    /// Recompute the digest of `data` with the parameters recorded in
    /// `expected` and compare.
    pub fn verify(data: &[u8], expected: &ContentId) -> bool {
        let digest = Self::digest(expected.hash_fn(), data);
        let len = expected.digest().len();
        len <= digest.len() && digest[..len] == *expected.digest()
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::SHA2_256
    }
}

/// Errors from hashing operations.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("invalid digest length {requested} for {hash_fn}")]
    InvalidLength { hash_fn: HashFn, requested: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let id1 = ContentHasher::SHA2_256.hash(Codec::Raw, b"hello world");
        let id2 = ContentHasher::SHA2_256.hash(Codec::Raw, b"hello world");
        assert_eq!(id1, id2);
    }

    #[test]
    fn sha256_matches_known_vector() {
        let id = ContentHasher::SHA2_256.hash(Codec::Raw, b"abc");
        assert_eq!(
            hex::encode(id.digest()),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn codec_is_part_of_the_identifier() {
        let raw = ContentHasher::SHA2_256.hash(Codec::Raw, b"same");
        let cbor = ContentHasher::SHA2_256.hash(Codec::DagCbor, b"same");
        assert_eq!(raw.digest(), cbor.digest());
        assert_ne!(raw, cbor);
    }

    #[test]
    fn hash_functions_differ() {
        let sha = ContentHasher::SHA2_256.hash(Codec::Raw, b"data");
        let b3 = ContentHasher::BLAKE3.hash(Codec::Raw, b"data");
        assert_ne!(sha.digest(), b3.digest());
    }

    #[test]
    fn truncation_is_honoured_and_verifiable() {
        let hasher = ContentHasher::new(HashFn::Blake3, Some(16)).unwrap();
        let id = hasher.hash(Codec::DagJson, b"payload");
        assert_eq!(id.digest().len(), 16);
        assert!(ContentHasher::verify(b"payload", &id));
        assert!(!ContentHasher::verify(b"tampered", &id));
    }

    #[test]
    fn invalid_truncation_is_rejected() {
        assert!(ContentHasher::new(HashFn::Sha2_256, Some(0)).is_err());
        assert!(ContentHasher::new(HashFn::Sha2_256, Some(33)).is_err());
    }
}
