//! Splits build inputs into classpath and module path entries.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::ModuleCache;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionPolicy {
    /// When false every candidate stays on the classpath, whatever it contains.
    pub infer_module_path: bool,
}

impl Default for PartitionPolicy {
    fn default() -> Self {
        Self {
            infer_module_path: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Partition {
    pub classpath: Vec<PathBuf>,
    pub module_path: Vec<PathBuf>,
}

#[derive(Clone)]
pub struct ModuleDetector {
    cache: Arc<dyn ModuleCache>,
}

impl ModuleDetector {
    pub fn new(cache: Arc<dyn ModuleCache>) -> Self {
        Self { cache }
    }

    pub fn is_module(&self, path: &Path) -> Result<bool> {
        if !path.exists() {
            return Ok(false);
        }
        self.cache.get(path)
    }

    /// Candidates that belong on the classpath. Missing files stay here.
    pub fn infer_classpath<P: AsRef<Path>>(
        &self,
        module_aware: bool,
        policy: PartitionPolicy,
        candidates: Option<&[P]>,
    ) -> Result<Vec<PathBuf>> {
        let Some(candidates) = candidates else {
            return Ok(Vec::new());
        };
        if !module_aware || !policy.infer_module_path {
            return Ok(owned(candidates));
        }
        Ok(self.partition_all(candidates)?.classpath)
    }

    /// Candidates that belong on the module path. Only existing modules qualify.
    pub fn infer_module_path<P: AsRef<Path>>(
        &self,
        module_aware: bool,
        policy: PartitionPolicy,
        candidates: Option<&[P]>,
    ) -> Result<Vec<PathBuf>> {
        let Some(candidates) = candidates else {
            return Ok(Vec::new());
        };
        if !module_aware || !policy.infer_module_path {
            return Ok(Vec::new());
        }
        Ok(self.partition_all(candidates)?.module_path)
    }

    /// Both lists from one classification pass.
    pub fn partition<P: AsRef<Path>>(
        &self,
        module_aware: bool,
        policy: PartitionPolicy,
        candidates: Option<&[P]>,
    ) -> Result<Partition> {
        let Some(candidates) = candidates else {
            return Ok(Partition::default());
        };
        if !module_aware || !policy.infer_module_path {
            return Ok(Partition {
                classpath: owned(candidates),
                module_path: Vec::new(),
            });
        }
        self.partition_all(candidates)
    }

    fn partition_all<P: AsRef<Path>>(&self, candidates: &[P]) -> Result<Partition> {
        // Runs on the caller's thread; callers that want parallelism warm the cache first.
        let verdicts: Vec<Option<bool>> = candidates
            .iter()
            .map(|p| {
                let path = p.as_ref();
                if path.exists() {
                    self.cache.get(path).map(Some)
                } else {
                    Ok(None)
                }
            })
            .collect::<Result<_>>()?;

        let mut out = Partition::default();
        for (candidate, verdict) in candidates.iter().zip(verdicts) {
            let path = candidate.as_ref().to_path_buf();
            match verdict {
                Some(true) => out.module_path.push(path),
                Some(false) | None => out.classpath.push(path),
            }
        }
        tracing::debug!(
            classpath = out.classpath.len(),
            module_path = out.module_path.len(),
            "partitioned candidates"
        );
        Ok(out)
    }
}

fn owned<P: AsRef<Path>>(candidates: &[P]) -> Vec<PathBuf> {
    candidates.iter().map(|p| p.as_ref().to_path_buf()).collect()
}
