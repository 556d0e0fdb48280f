//! Naming records and the sources that supply them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace;

use dagnode_types::{Context, Path};

use crate::error::{NameError, NameResult};
use crate::names::validate_name;

/// What a name points at.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameValue {
    Path(Path),
    /// Another name, resolved in turn when resolution is recursive.
    Name(String),
}

impl From<Path> for NameValue {
    fn from(path: Path) -> Self {
        Self::Path(path)
    }
}

/// A binding from a name to a value, valid until a point in time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub value: NameValue,
    pub valid_until: DateTime<Utc>,
}

impl Record {
    pub fn new(value: impl Into<NameValue>, valid_until: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            valid_until,
        }
    }

    /// A record valid for `valid_for` from now.
    pub fn valid_for(value: impl Into<NameValue>, valid_for: Duration) -> Self {
        let valid_for = chrono::Duration::from_std(valid_for).unwrap_or(chrono::Duration::MAX);
        let valid_until = Utc::now()
            .checked_add_signed(valid_for)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self::new(value, valid_until)
    }

    pub fn is_expired(&self) -> bool {
        self.valid_until <= Utc::now()
    }

    /// Time left before the record lapses, if any.
    pub fn remaining(&self) -> Option<Duration> {
        (self.valid_until - Utc::now()).to_std().ok()
    }
}

/// Supplies and accepts naming records.
///
/// Fetches may reach the network unless `local_only` is set, so every call
/// runs under a [`Context`]. Implementations validate records before
/// returning them: an expired record is an error, not a value.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetch the current record for `name`.
    ///
    /// With `local_only`, only records already held locally are considered
    /// and a miss is [`NameError::NotFound`].
    async fn fetch_record(&self, ctx: &Context, name: &str, local_only: bool) -> NameResult<Record>;

    /// Store `record` under `name` locally and make it available to others.
    async fn publish(&self, ctx: &Context, name: &str, record: Record) -> NameResult<()>;
}

/// [`RecordSource`] held in memory.
///
/// Published records are local. Records added with
/// [`InMemoryRecordSource::insert_remote`] stand in for records only known to
/// the network and are invisible to local-only fetches.
pub struct InMemoryRecordSource {
    local: RwLock<HashMap<String, Record>>,
    remote: RwLock<HashMap<String, Record>>,
    latency: Option<Duration>,
    fetches: AtomicUsize,
}

impl InMemoryRecordSource {
    pub fn new() -> Self {
        Self {
            local: RwLock::new(HashMap::new()),
            remote: RwLock::new(HashMap::new()),
            latency: None,
            fetches: AtomicUsize::new(0),
        }
    }

    /// Delay every non-local fetch by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make `record` known to the network but not held locally.
    pub fn insert_remote(&self, name: &str, record: Record) -> NameResult<()> {
        validate_name(name)?;
        self.remote
            .write()
            .map_err(|e| NameError::Backend(format!("lock poisoned: {e}")))?
            .insert(name.to_string(), record);
        Ok(())
    }

    /// Number of `fetch_record` calls served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    fn lookup(map: &RwLock<HashMap<String, Record>>, name: &str) -> NameResult<Option<Record>> {
        let map = map
            .read()
            .map_err(|e| NameError::Backend(format!("lock poisoned: {e}")))?;
        Ok(map.get(name).cloned())
    }

    fn validated(name: &str, record: Record) -> NameResult<Record> {
        if record.is_expired() {
            return Err(NameError::Expired {
                name: name.to_string(),
            });
        }
        Ok(record)
    }
}

impl Default for InMemoryRecordSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordSource for InMemoryRecordSource {
    async fn fetch_record(&self, ctx: &Context, name: &str, local_only: bool) -> NameResult<Record> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        ctx.check()?;
        trace!(%name, local_only, "fetching record");

        if let Some(record) = Self::lookup(&self.local, name)? {
            return Self::validated(name, record);
        }
        if local_only {
            return Err(NameError::NotFound {
                name: name.to_string(),
            });
        }

        ctx.run(async {
            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }
            match Self::lookup(&self.remote, name)? {
                Some(record) => Self::validated(name, record),
                None => Err(NameError::NotFound {
                    name: name.to_string(),
                }),
            }
        })
        .await
    }

    async fn publish(&self, ctx: &Context, name: &str, record: Record) -> NameResult<()> {
        ctx.check()?;
        validate_name(name)?;
        self.local
            .write()
            .map_err(|e| NameError::Backend(format!("lock poisoned: {e}")))?
            .insert(name.to_string(), record);
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryRecordSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let local = self.local.read().map(|m| m.len()).unwrap_or(0);
        let remote = self.remote.read().map(|m| m.len()).unwrap_or(0);
        f.debug_struct("InMemoryRecordSource")
            .field("local", &local)
            .field("remote", &remote)
            .finish()
    }
}
