//! Named publishing keys.
//!
//! Every key's publishing name is the hex text of its public key id, so a key
//! named `blog` publishes under `/ipns/<id>`. The node's own key is always
//! present under [`SELF_KEY`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use dagnode_crypto::KeyPair;
use dagnode_types::{ContentId, Path};

use crate::error::{NameError, NameResult};
use crate::names::{validate_user_key_name, SELF_KEY};

/// Key algorithms a caller may ask for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyAlgorithm {
    #[default]
    Ed25519,
    Rsa,
    Secp256k1,
}

impl FromStr for KeyAlgorithm {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ed25519" => Ok(Self::Ed25519),
            "rsa" => Ok(Self::Rsa),
            "secp256k1" => Ok(Self::Secp256k1),
            other => Err(NameError::UnsupportedKey(format!(
                "unknown key algorithm: {other}"
            ))),
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ed25519 => "ed25519",
            Self::Rsa => "rsa",
            Self::Secp256k1 => "secp256k1",
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyGenerateOptions {
    pub algorithm: KeyAlgorithm,
    /// Key size in bits. Only meaningful for variable-size algorithms.
    pub size: Option<u32>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRenameOptions {
    /// Replace an existing key with the target name.
    pub force: bool,
}

/// A named key and the path it publishes under.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    pub name: String,
    pub id: ContentId,
    pub path: Path,
}

impl Key {
    fn from_pair(name: &str, pair: &KeyPair) -> Self {
        let id = pair.public().id();
        Self {
            name: name.to_string(),
            id,
            path: Path::from_name(id.to_hex()),
        }
    }

    /// The name records for this key are published under.
    pub fn publish_name(&self) -> String {
        self.id.to_hex()
    }
}

/// Storage for named key pairs.
#[async_trait]
pub trait Keystore: Send + Sync {
    /// Create a new key under `name`.
    async fn generate(&self, name: &str, opts: KeyGenerateOptions) -> NameResult<Key>;

    /// Rename a key. Returns the renamed key and whether an existing key
    /// under `new` was overwritten.
    async fn rename(&self, old: &str, new: &str, opts: KeyRenameOptions)
        -> NameResult<(Key, bool)>;

    /// All keys, `self` first and the rest by name.
    async fn list(&self) -> NameResult<Vec<Key>>;

    /// Delete a key and return the path it published under.
    async fn remove(&self, name: &str) -> NameResult<Path>;

    async fn get(&self, name: &str) -> NameResult<Key>;
}

/// [`Keystore`] held in memory.
pub struct InMemoryKeystore {
    self_key: KeyPair,
    keys: RwLock<BTreeMap<String, KeyPair>>,
}

impl InMemoryKeystore {
    pub fn new(self_key: KeyPair) -> Self {
        Self {
            self_key,
            keys: RwLock::new(BTreeMap::new()),
        }
    }

    /// A keystore with a freshly generated node key.
    pub fn generate_self() -> Self {
        Self::new(KeyPair::generate())
    }

    fn read(&self) -> NameResult<std::sync::RwLockReadGuard<'_, BTreeMap<String, KeyPair>>> {
        self.keys
            .read()
            .map_err(|e| NameError::Backend(format!("lock poisoned: {e}")))
    }

    fn write(&self) -> NameResult<std::sync::RwLockWriteGuard<'_, BTreeMap<String, KeyPair>>> {
        self.keys
            .write()
            .map_err(|e| NameError::Backend(format!("lock poisoned: {e}")))
    }
}

#[async_trait]
impl Keystore for InMemoryKeystore {
    async fn generate(&self, name: &str, opts: KeyGenerateOptions) -> NameResult<Key> {
        validate_user_key_name(name, "generate")?;
        match (opts.algorithm, opts.size) {
            (KeyAlgorithm::Ed25519, None) => {}
            (KeyAlgorithm::Ed25519, Some(size)) => {
                return Err(NameError::UnsupportedKey(format!(
                    "ed25519 keys have a fixed size, got {size}"
                )))
            }
            (other, _) => {
                return Err(NameError::UnsupportedKey(format!(
                    "{other} keys are not supported"
                )))
            }
        }

        let mut keys = self.write()?;
        if keys.contains_key(name) {
            return Err(NameError::KeyExists {
                name: name.to_string(),
            });
        }
        let pair = KeyPair::generate();
        let key = Key::from_pair(name, &pair);
        keys.insert(name.to_string(), pair);
        info!(key = name, id = %key.id.short(), "generated key");
        Ok(key)
    }

    async fn rename(
        &self,
        old: &str,
        new: &str,
        opts: KeyRenameOptions,
    ) -> NameResult<(Key, bool)> {
        validate_user_key_name(old, "rename")?;
        validate_user_key_name(new, "rename")?;

        let mut keys = self.write()?;
        let Some(pair) = keys.get(old) else {
            return Err(NameError::KeyNotFound {
                name: old.to_string(),
            });
        };
        if old == new {
            return Ok((Key::from_pair(new, pair), false));
        }
        if keys.contains_key(new) && !opts.force {
            return Err(NameError::KeyExists {
                name: new.to_string(),
            });
        }

        let pair = keys.remove(old).ok_or_else(|| NameError::KeyNotFound {
            name: old.to_string(),
        })?;
        let key = Key::from_pair(new, &pair);
        let overwritten = keys.insert(new.to_string(), pair).is_some();
        info!(from = old, to = new, overwritten, "renamed key");
        Ok((key, overwritten))
    }

    async fn list(&self) -> NameResult<Vec<Key>> {
        let keys = self.read()?;
        let mut out = Vec::with_capacity(keys.len() + 1);
        out.push(Key::from_pair(SELF_KEY, &self.self_key));
        out.extend(keys.iter().map(|(name, pair)| Key::from_pair(name, pair)));
        Ok(out)
    }

    async fn remove(&self, name: &str) -> NameResult<Path> {
        validate_user_key_name(name, "remove")?;
        let pair = self
            .write()?
            .remove(name)
            .ok_or_else(|| NameError::KeyNotFound {
                name: name.to_string(),
            })?;
        let key = Key::from_pair(name, &pair);
        info!(key = name, id = %key.id.short(), "removed key");
        Ok(key.path)
    }

    async fn get(&self, name: &str) -> NameResult<Key> {
        if name == SELF_KEY {
            return Ok(Key::from_pair(SELF_KEY, &self.self_key));
        }
        self.read()?
            .get(name)
            .map(|pair| Key::from_pair(name, pair))
            .ok_or_else(|| NameError::KeyNotFound {
                name: name.to_string(),
            })
    }
}

impl std::fmt::Debug for InMemoryKeystore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.keys.read().map(|k| k.len()).unwrap_or(0);
        f.debug_struct("InMemoryKeystore")
            .field("self", &self.self_key.public().id().short())
            .field("keys", &count)
            .finish()
    }
}
