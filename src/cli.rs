use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cache::DEFAULT_MAX_ENTRIES;
use crate::logging::DEFAULT_LOG_LEVEL;

#[derive(Debug, Clone, Parser)]
#[command(name = "modpath")]
#[command(about = "Split Java build inputs into classpath and module path entries")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Persistent verdict store (LMDB file).
    #[arg(long, value_name = "FILE", env = "MODPATH_DB", global = true)]
    pub db: Option<PathBuf>,

    /// Keep verdicts in memory only.
    #[arg(long, global = true)]
    pub no_persist: bool,

    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_ENTRIES, global = true)]
    pub max_entries: u64,

    #[arg(long, value_name = "LEVEL", env = "MODPATH_LOG", default_value = DEFAULT_LOG_LEVEL, global = true)]
    pub log_level: String,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Report the module verdict of each path.
    Classify {
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,
    },
    /// Split paths into classpath and module path.
    Partition {
        #[arg(value_name = "PATH")]
        paths: Vec<PathBuf>,

        /// Append every jar found below DIR to the candidates.
        #[arg(long, value_name = "DIR")]
        scan: Option<PathBuf>,

        /// Treat the build step as non-modular: everything goes on the classpath.
        #[arg(long)]
        not_module_aware: bool,

        /// Disable module path inference.
        #[arg(long)]
        no_infer: bool,

        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// Check whether source roots declare a module.
    Source {
        #[arg(value_name = "ROOT")]
        roots: Vec<PathBuf>,
    },
    Stats,
    Clear,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}
