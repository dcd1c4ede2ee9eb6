//! Persistent verdict storage shared across process runs.
//!
//! Uses LMDB (via heed). Each cache namespace is one named database; rows are JSON and
//! keyed by the SHA-256 of the absolute path so long paths stay under LMDB's key limit.

use heed::types::Str;
use heed::{Database, Env, EnvFlags, EnvOpenOptions};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::cache::{CacheKey, CacheSpec, Fingerprint};
use crate::error::{ClassifyError, Result};

const DEFAULT_MAP_SIZE: usize = 256 * 1024 * 1024;
const DEFAULT_MAX_DBS: u32 = 32;

type StrDb = Database<Str, Str>;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredVerdict {
    path: String,
    len: u64,
    modified_nanos: u64,
    is_regular_file: bool,
    is_module: bool,
    #[serde(alias = "stored_at")]
    last_access: u64,
}

impl StoredVerdict {
    fn matches(&self, fingerprint: &Fingerprint) -> bool {
        self.len == fingerprint.len
            && self.modified_nanos == fingerprint.modified_nanos
            && self.is_regular_file == fingerprint.is_regular_file
    }
}

#[derive(Debug, Clone)]
pub struct VerdictStore {
    env: Arc<Env>,
    db_path: PathBuf,
    verdicts: StrDb,
    spec: CacheSpec,
}

impl VerdictStore {
    pub fn open(db_path: PathBuf, spec: CacheSpec) -> Result<Self> {
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| ClassifyError::io(parent, e))?;
        }

        let env = Arc::new(open_env(&db_path)?);
        let mut wtxn = env
            .write_txn()
            .map_err(|e| ClassifyError::store("begin write", e))?;
        let verdicts = env
            .create_database::<Str, Str>(&mut wtxn, Some(spec.name.as_str()))
            .map_err(|e| ClassifyError::store("create database", e))?;
        wtxn.commit().map_err(|e| ClassifyError::store("commit", e))?;

        Ok(Self {
            env,
            db_path,
            verdicts,
            spec,
        })
    }

    /// The stored verdict, only if it was computed for the same fingerprint. A hit
    /// refreshes the row's access time so pruning keeps rows that are still in use.
    /// A row that no longer decodes is a miss; the next `put` overwrites it.
    pub fn get(&self, key: &CacheKey) -> Result<Option<bool>> {
        let id = row_key(&key.path);
        let mut row = {
            let rtxn = self
                .env
                .read_txn()
                .map_err(|e| ClassifyError::store("begin read", e))?;
            let Some(raw) = self
                .verdicts
                .get(&rtxn, &id)
                .map_err(|e| ClassifyError::store("get", e))?
            else {
                return Ok(None);
            };
            match serde_json::from_str::<StoredVerdict>(raw) {
                Ok(row) => row,
                Err(e) => {
                    tracing::warn!(
                        cache = %self.spec.name,
                        path = %key.path.display(),
                        error = %e,
                        "undecodable module cache row, treating as a miss"
                    );
                    return Ok(None);
                }
            }
        };
        if !row.matches(&key.fingerprint) {
            return Ok(None);
        }

        row.last_access = now_nanos();
        self.write_row(&id, &row)?;
        Ok(Some(row.is_module))
    }

    pub fn put(&self, key: &CacheKey, is_module: bool) -> Result<()> {
        let row = StoredVerdict {
            path: key.path.to_string_lossy().to_string(),
            len: key.fingerprint.len,
            modified_nanos: key.fingerprint.modified_nanos,
            is_regular_file: key.fingerprint.is_regular_file,
            is_module,
            last_access: now_nanos(),
        };
        self.write_row(&row_key(&key.path), &row)?;

        let len = {
            let rtxn = self
                .env
                .read_txn()
                .map_err(|e| ClassifyError::store("begin read", e))?;
            self.verdicts
                .len(&rtxn)
                .map_err(|e| ClassifyError::store("len", e))?
        };
        if len > self.spec.max_entries {
            self.prune(len)?;
        }
        Ok(())
    }

    fn write_row(&self, id: &str, row: &StoredVerdict) -> Result<()> {
        let payload = serde_json::to_string(row)?;
        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| ClassifyError::store("begin write", e))?;
        self.verdicts
            .put(&mut wtxn, id, &payload)
            .map_err(|e| ClassifyError::store("put", e))?;
        wtxn.commit().map_err(|e| ClassifyError::store("commit", e))
    }

    // Drops the least recently used rows down to 90% of capacity.
    fn prune(&self, len: u64) -> Result<()> {
        let target = prune_target(self.spec.max_entries);
        let excess = len.saturating_sub(target) as usize;

        let victims: Vec<String> = {
            let rtxn = self
                .env
                .read_txn()
                .map_err(|e| ClassifyError::store("begin read", e))?;
            let mut rows: Vec<(u64, String)> = Vec::new();
            for item in self
                .verdicts
                .iter(&rtxn)
                .map_err(|e| ClassifyError::store("iter", e))?
            {
                let (k, v) = item.map_err(|e| ClassifyError::store("iter", e))?;
                let last_access = serde_json::from_str::<StoredVerdict>(v)
                    .map(|row| row.last_access)
                    .unwrap_or(0);
                rows.push((last_access, k.to_string()));
            }
            rows.sort();
            rows.into_iter().take(excess).map(|(_, k)| k).collect()
        };

        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| ClassifyError::store("begin write", e))?;
        for k in victims.iter() {
            self.verdicts
                .delete(&mut wtxn, k)
                .map_err(|e| ClassifyError::store("delete", e))?;
        }
        wtxn.commit().map_err(|e| ClassifyError::store("commit", e))?;

        tracing::warn!(
            cache = %self.spec.name,
            removed = victims.len(),
            capacity = self.spec.max_entries,
            "module cache over capacity, pruned least recently used entries"
        );
        Ok(())
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| ClassifyError::store("begin read", e))?;
        let mut entries = 0u64;
        let mut modules = 0u64;
        for item in self
            .verdicts
            .iter(&rtxn)
            .map_err(|e| ClassifyError::store("iter", e))?
        {
            let (_, v) = item.map_err(|e| ClassifyError::store("iter", e))?;
            let Ok(row) = serde_json::from_str::<StoredVerdict>(v) else {
                continue;
            };
            entries += 1;
            if row.is_module {
                modules += 1;
            }
        }
        Ok(StoreStats {
            name: self.spec.name.clone(),
            db_path: self.db_path.to_string_lossy().to_string(),
            entries,
            max_entries: self.spec.max_entries,
            modules,
            non_modules: entries - modules,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StoreStats {
    pub name: String,
    pub db_path: String,
    pub entries: u64,
    pub max_entries: u64,
    pub modules: u64,
    pub non_modules: u64,
}

fn open_env(db_path: &Path) -> Result<Env> {
    let mut options = EnvOpenOptions::new();
    options.map_size(DEFAULT_MAP_SIZE);
    options.max_dbs(DEFAULT_MAX_DBS);
    // SAFETY: default LMDB locking stays on; NO_SUB_DIR keeps the store a single file
    // plus its `-lock` sibling.
    unsafe {
        options.flags(EnvFlags::NO_SUB_DIR);
        options
            .open(db_path)
            .map_err(|e| ClassifyError::store(format!("open {}", db_path.display()), e))
    }
}

/// Rows kept after a prune: 90% of capacity, never fewer than one.
fn prune_target(max_entries: u64) -> u64 {
    (max_entries - max_entries / 10).max(1)
}

fn row_key(path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    hex::encode(hasher.finalize())
}

fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
