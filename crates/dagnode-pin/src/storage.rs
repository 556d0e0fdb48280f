//! Durable pin storage.
//!
//! Only direct and recursive entries are ever persisted; indirect pins are
//! derived from the store on demand.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use dagnode_types::ContentId;

use crate::error::{PinError, PinResult};
use crate::types::{PinEntry, PinKind};

/// The persisted entry set.
pub type PinMap = BTreeMap<ContentId, PinKind>;

/// Backend that loads the pin set at startup and saves it after every change.
#[async_trait]
pub trait PinStorage: Send + Sync {
    async fn load(&self) -> PinResult<PinMap>;

    /// Replace the persisted set. A failed save must leave the previous set
    /// intact.
    async fn save(&self, pins: &PinMap) -> PinResult<()>;
}

fn validate(entries: impl IntoIterator<Item = PinEntry>) -> PinResult<PinMap> {
    let mut map = PinMap::new();
    for entry in entries {
        if entry.kind == PinKind::Indirect {
            return Err(PinError::Corrupt(format!(
                "indirect pin {} cannot be persisted",
                entry.target
            )));
        }
        if map.insert(entry.target, entry.kind).is_some() {
            return Err(PinError::Corrupt(format!("duplicate pin {}", entry.target)));
        }
    }
    Ok(map)
}

// ---------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------

/// Pin storage that lives only as long as the process.
pub struct InMemoryPinStorage {
    pins: Mutex<PinMap>,
}

impl InMemoryPinStorage {
    pub fn new() -> Self {
        Self {
            pins: Mutex::new(PinMap::new()),
        }
    }

    /// Start from an existing set, as if loaded from disk.
    pub fn with_entries(entries: impl IntoIterator<Item = PinEntry>) -> PinResult<Self> {
        Ok(Self {
            pins: Mutex::new(validate(entries)?),
        })
    }

    fn lock(&self) -> PinResult<std::sync::MutexGuard<'_, PinMap>> {
        self.pins
            .lock()
            .map_err(|_| PinError::Storage("lock poisoned".into()))
    }
}

impl Default for InMemoryPinStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PinStorage for InMemoryPinStorage {
    async fn load(&self) -> PinResult<PinMap> {
        Ok(self.lock()?.clone())
    }

    async fn save(&self, pins: &PinMap) -> PinResult<()> {
        *self.lock()? = pins.clone();
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryPinStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.lock().map(|p| p.len()).unwrap_or(0);
        f.debug_struct("InMemoryPinStorage")
            .field("pin_count", &count)
            .finish()
    }
}

// ---------------------------------------------------------------
// File
// ---------------------------------------------------------------

const FILE_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct PinFile {
    version: u32,
    pins: Vec<PinEntry>,
}

/// Pin storage in a single JSON file.
///
/// Saves write a temporary file in the same directory and rename it over the
/// target, so a crash mid-save leaves either the old or the new set.
#[derive(Clone, Debug)]
pub struct FilePinStorage {
    path: PathBuf,
}

impl FilePinStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(path: &Path) -> PinResult<PinMap> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(PinMap::new()),
            Err(e) => return Err(e.into()),
        };
        let file: PinFile =
            serde_json::from_slice(&bytes).map_err(|e| PinError::Corrupt(e.to_string()))?;
        if file.version != FILE_VERSION {
            return Err(PinError::Corrupt(format!(
                "unsupported pin file version {}",
                file.version
            )));
        }
        validate(file.pins)
    }

    fn write(path: &Path, pins: &PinMap) -> PinResult<()> {
        let file = PinFile {
            version: FILE_VERSION,
            pins: pins
                .iter()
                .map(|(target, kind)| PinEntry::new(*target, *kind))
                .collect(),
        };
        let json =
            serde_json::to_vec_pretty(&file).map_err(|e| PinError::Storage(e.to_string()))?;

        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| PinError::Storage(e.error.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl PinStorage for FilePinStorage {
    async fn load(&self) -> PinResult<PinMap> {
        let path = self.path.clone();
        let pins = tokio::task::spawn_blocking(move || Self::read(&path))
            .await
            .map_err(|e| PinError::Storage(e.to_string()))??;
        debug!(path = %self.path.display(), pins = pins.len(), "loaded pin file");
        Ok(pins)
    }

    async fn save(&self, pins: &PinMap) -> PinResult<()> {
        let path = self.path.clone();
        let pins = pins.clone();
        tokio::task::spawn_blocking(move || Self::write(&path, &pins))
            .await
            .map_err(|e| PinError::Storage(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dagnode_types::{Codec, HashFn};

    fn id(seed: u8) -> ContentId {
        ContentId::new(Codec::DagCbor, HashFn::Sha2_256, &[seed; 32]).unwrap()
    }

    fn sample() -> PinMap {
        let mut map = PinMap::new();
        map.insert(id(1), PinKind::Direct);
        map.insert(id(2), PinKind::Recursive);
        map
    }

    // ---------------------------------------------------------------
    // In-memory
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn memory_save_then_load() {
        let storage = InMemoryPinStorage::new();
        assert!(storage.load().await.unwrap().is_empty());
        storage.save(&sample()).await.unwrap();
        assert_eq!(storage.load().await.unwrap(), sample());
    }

    #[test]
    fn indirect_entries_are_rejected() {
        let err = InMemoryPinStorage::with_entries([PinEntry::new(id(1), PinKind::Indirect)])
            .unwrap_err();
        assert!(matches!(err, PinError::Corrupt(_)));
    }

    #[test]
    fn duplicate_entries_are_rejected() {
        let err = InMemoryPinStorage::with_entries([
            PinEntry::new(id(1), PinKind::Direct),
            PinEntry::new(id(1), PinKind::Recursive),
        ])
        .unwrap_err();
        assert!(matches!(err, PinError::Corrupt(_)));
    }

    // ---------------------------------------------------------------
    // File
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FilePinStorage::new(dir.path().join("pins.json"));
        assert!(storage.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn file_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("pins.json");

        FilePinStorage::new(&path).save(&sample()).await.unwrap();
        let reopened = FilePinStorage::new(&path);
        assert_eq!(reopened.load().await.unwrap(), sample());
    }

    #[tokio::test]
    async fn save_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FilePinStorage::new(dir.path().join("pins.json"));
        storage.save(&sample()).await.unwrap();

        let mut smaller = PinMap::new();
        smaller.insert(id(3), PinKind::Direct);
        storage.save(&smaller).await.unwrap();
        assert_eq!(storage.load().await.unwrap(), smaller);
    }

    #[tokio::test]
    async fn garbage_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pins.json");
        std::fs::write(&path, b"not json").unwrap();

        let err = FilePinStorage::new(&path).load().await.unwrap_err();
        assert!(matches!(err, PinError::Corrupt(_)));
        assert_eq!(err.severity(), dagnode_types::ErrorSeverity::Implementation);
    }

    #[tokio::test]
    async fn unknown_version_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pins.json");
        std::fs::write(&path, br#"{"version": 9, "pins": []}"#).unwrap();
        assert!(matches!(
            FilePinStorage::new(&path).load().await,
            Err(PinError::Corrupt(_))
        ));
    }
}
