//! Name resolution with chain following and a bounded cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, trace};

use dagnode_types::{Context, Path, PathRoot};

use crate::error::{NameError, NameResult};
use crate::record::{NameValue, RecordSource};

/// Options for a single resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameResolveOptions {
    /// Follow records whose value is another name.
    pub recursive: bool,
    /// Never fetch records from the network.
    pub local_only: bool,
    /// Consult cached record values.
    pub use_cache: bool,
}

impl Default for NameResolveOptions {
    fn default() -> Self {
        Self {
            recursive: false,
            local_only: false,
            use_cache: true,
        }
    }
}

/// Resolver limits and cache sizing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Maximum number of record lookups per resolution.
    pub max_depth: usize,
    /// How long a cached record value stays fresh, in seconds.
    #[serde(with = "duration_secs")]
    pub cache_ttl: Duration,
    /// Maximum number of cached names; zero disables caching.
    pub cache_capacity: usize,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            max_depth: 32,
            cache_ttl: Duration::from_secs(60),
            cache_capacity: 128,
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

#[derive(Clone, Debug)]
struct CacheEntry {
    value: NameValue,
    expires: Instant,
}

/// Resolves names to paths through a [`RecordSource`].
pub struct NameResolver {
    source: Arc<dyn RecordSource>,
    config: NamingConfig,
    cache: Mutex<HashMap<String, CacheEntry>>,
}

impl NameResolver {
    pub fn new(source: Arc<dyn RecordSource>, config: NamingConfig) -> Self {
        Self {
            source,
            config,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &NamingConfig {
        &self.config
    }

    /// Resolve `name` to a path.
    ///
    /// Without `recursive`, the first record's value is returned as is, so a
    /// record pointing at another name yields `/ipns/<that name>`. With
    /// `recursive`, names are followed until a content path is reached or
    /// the lookup limit is exhausted. Segments carried by intermediate name
    /// paths are kept and appended in order.
    pub async fn resolve(
        &self,
        ctx: &Context,
        name: &str,
        opts: NameResolveOptions,
    ) -> NameResult<Path> {
        let mut current = name.to_string();
        let mut suffix: Vec<String> = Vec::new();
        let mut lookups = 0;

        loop {
            ctx.check()?;
            if lookups >= self.config.max_depth {
                return Err(NameError::RecursionLimitExceeded {
                    name: name.to_string(),
                    limit: self.config.max_depth,
                });
            }
            let value = self.lookup(ctx, &current, opts).await?;
            lookups += 1;

            let (path, next) = match value {
                NameValue::Name(next) => (Path::from_name(next.clone()), next),
                NameValue::Path(path) => match path.root().clone() {
                    PathRoot::Name(next) => (path, next),
                    PathRoot::Content(_) => {
                        debug!(%name, lookups, "resolved name");
                        return Ok(path.with_segments(suffix));
                    }
                },
            };

            if !opts.recursive {
                return Ok(path.with_segments(suffix));
            }
            let mut carried = path.segments().to_vec();
            carried.append(&mut suffix);
            suffix = carried;
            trace!(from = %current, to = %next, "following name");
            current = next;
        }
    }

    /// Drop any cached value for `name`.
    pub fn invalidate(&self, name: &str) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.remove(name);
        }
    }

    /// Number of names currently cached, fresh or not.
    pub fn cached(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    async fn lookup(
        &self,
        ctx: &Context,
        name: &str,
        opts: NameResolveOptions,
    ) -> NameResult<NameValue> {
        if opts.use_cache {
            if let Some(value) = self.cache_get(name) {
                trace!(%name, "name cache hit");
                return Ok(value);
            }
        }

        let record = self
            .source
            .fetch_record(ctx, name, opts.local_only)
            .await
            .map_err(|err| match err {
                NameError::NotFound { name } if opts.local_only => {
                    NameError::OfflineResolutionFailed { name }
                }
                other => other,
            })?;

        let ttl = record
            .remaining()
            .map_or(Duration::ZERO, |left| left.min(self.config.cache_ttl));
        self.cache_put(name, record.value.clone(), ttl);
        Ok(record.value)
    }

    fn cache_get(&self, name: &str) -> Option<NameValue> {
        let mut cache = self.cache.lock().ok()?;
        match cache.get(name) {
            Some(entry) if entry.expires > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                cache.remove(name);
                None
            }
            None => None,
        }
    }

    fn cache_put(&self, name: &str, value: NameValue, ttl: Duration) {
        if self.config.cache_capacity == 0 || ttl.is_zero() {
            return;
        }
        let Ok(mut cache) = self.cache.lock() else {
            return;
        };
        let now = Instant::now();
        if cache.len() >= self.config.cache_capacity && !cache.contains_key(name) {
            cache.retain(|_, entry| entry.expires > now);
            if cache.len() >= self.config.cache_capacity {
                let oldest = cache
                    .iter()
                    .min_by_key(|(_, entry)| entry.expires)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    cache.remove(&oldest);
                }
            }
        }
        cache.insert(
            name.to_string(),
            CacheEntry {
                value,
                expires: now + ttl,
            },
        );
    }
}

impl std::fmt::Debug for NameResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NameResolver")
            .field("config", &self.config)
            .field("cached", &self.cached())
            .finish()
    }
}
