//! # modpath
//!
//! Decides which Java build inputs go on the classpath and which on the module path.
//!
//! ## Architecture
//!
//! - **scanner**: per-file module detection for directories and jars
//! - **manifest**: `MANIFEST.MF` main-section attribute lookup
//! - **cache**: fingerprint-keyed verdict cache with single-flight misses
//! - **store**: LMDB-backed verdict persistence across runs
//! - **partition**: classpath / module path split under a policy
//! - **source**: `module-info.java` detection in source roots
//! - **scan**: jar discovery below a directory

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod partition;
pub mod scan;
pub mod scanner;
pub mod source;
pub mod store;

pub use cache::{CacheSpec, Calculator, FileContentCache, ModuleCache};
pub use error::{ClassifyError, Result};
pub use partition::{ModuleDetector, Partition, PartitionPolicy};
pub use scanner::{FileKind, ModuleInfoLocator};
