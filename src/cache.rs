//! Memoized module verdicts keyed by file identity.
//!
//! Two tiers: a bounded in-memory `moka` cache keyed by `(path, fingerprint)`, and an
//! optional LMDB-backed [`VerdictStore`] that survives the process. A fingerprint is
//! taken from one `stat` on every lookup, so an entry for changed content is simply a
//! different key and never gets served.

use moka::sync::Cache;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use crate::error::{ClassifyError, Result};
use crate::store::VerdictStore;

pub const DEFAULT_CACHE_NAME: &str = "java-modules";
pub const DEFAULT_MAX_ENTRIES: u64 = 20_000;

/// Computes a verdict on a cache miss. `is_regular_file` comes from the cache's own stat.
pub trait Calculator: Send + Sync {
    fn calculate(&self, path: &Path, is_regular_file: bool) -> Result<bool>;
}

impl<F> Calculator for F
where
    F: Fn(&Path, bool) -> Result<bool> + Send + Sync,
{
    fn calculate(&self, path: &Path, is_regular_file: bool) -> Result<bool> {
        self(path, is_regular_file)
    }
}

/// What the partitioner needs from a cache. Implementations must be safe to call
/// from several threads at once and must fail rather than guess.
pub trait ModuleCache: Send + Sync {
    fn get(&self, path: &Path) -> Result<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    pub len: u64,
    pub modified_nanos: u64,
    pub is_regular_file: bool,
}

impl Fingerprint {
    pub fn of(meta: &std::fs::Metadata) -> Self {
        let modified_nanos = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        Self {
            len: meta.len(),
            modified_nanos,
            is_regular_file: meta.is_file(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub path: PathBuf,
    pub fingerprint: Fingerprint,
}

#[derive(Debug, Clone)]
pub struct CacheSpec {
    pub name: String,
    pub max_entries: u64,
}

impl Default for CacheSpec {
    fn default() -> Self {
        Self {
            name: DEFAULT_CACHE_NAME.to_string(),
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

pub struct FileContentCache {
    memory: Cache<CacheKey, bool>,
    store: Option<VerdictStore>,
    calculator: Arc<dyn Calculator>,
}

impl FileContentCache {
    pub fn new(spec: CacheSpec, calculator: impl Calculator + 'static) -> Self {
        let memory = Cache::builder().max_capacity(spec.max_entries).build();
        Self {
            memory,
            store: None,
            calculator: Arc::new(calculator),
        }
    }

    /// Backs the in-memory tier with a persistent store shared across runs.
    pub fn with_store(mut self, store: VerdictStore) -> Self {
        self.store = Some(store);
        self
    }

    fn key_for(&self, path: &Path) -> Result<Option<CacheKey>> {
        let meta = match std::fs::metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ClassifyError::io(path, e)),
        };
        let path = std::path::absolute(path).map_err(|e| ClassifyError::io(path, e))?;
        Ok(Some(CacheKey {
            path,
            fingerprint: Fingerprint::of(&meta),
        }))
    }

    fn compute(&self, key: &CacheKey) -> Result<bool> {
        if let Some(store) = self.store.as_ref()
            && let Some(verdict) = store.get(key)?
        {
            tracing::debug!(path = %key.path.display(), verdict, "module cache: persistent hit");
            return Ok(verdict);
        }

        tracing::debug!(path = %key.path.display(), "module cache: miss, scanning");
        let verdict = self
            .calculator
            .calculate(&key.path, key.fingerprint.is_regular_file)?;

        if let Some(store) = self.store.as_ref() {
            store.put(key, verdict)?;
        }
        Ok(verdict)
    }
}

impl ModuleCache for FileContentCache {
    fn get(&self, path: &Path) -> Result<bool> {
        let Some(key) = self.key_for(path)? else {
            return Ok(false);
        };
        // Concurrent misses on one key wait for a single scan.
        self.memory
            .try_get_with(key.clone(), || self.compute(&key))
            .map_err(ClassifyError::from_shared)
    }
}
