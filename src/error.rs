use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClassifyError>;

/// A candidate that could not be inspected.
///
/// Kept apart from a `false` verdict: a corrupt archive says nothing about whether
/// it is a module.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read archive {}: {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("module cache store failure ({context}): {source}")]
    Store {
        context: String,
        #[source]
        source: heed::Error,
    },

    #[error("module cache row is malformed: {0}")]
    Codec(#[from] serde_json::Error),

    /// The same failure handed to every caller that waited on one coalesced scan.
    #[error(transparent)]
    Shared(Arc<ClassifyError>),
}

impl ClassifyError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn from_shared(err: Arc<ClassifyError>) -> Self {
        Arc::try_unwrap(err).unwrap_or_else(Self::Shared)
    }

    pub fn store(context: impl Into<String>, source: heed::Error) -> Self {
        Self::Store {
            context: context.into(),
            source,
        }
    }
}
