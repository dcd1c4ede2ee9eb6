use anyhow::{Context, Result};
use clap::Parser;
use modpath::cache::{CacheSpec, FileContentCache, ModuleCache};
use modpath::cli::{Cli, Commands, OutputFormat};
use modpath::config::{cache_spec, clear_db, resolve_db_path};
use modpath::logging;
use modpath::partition::{ModuleDetector, Partition, PartitionPolicy};
use modpath::scan::scan_jars;
use modpath::scanner::{FileKind, ModuleInfoLocator};
use modpath::source::{declared_module_name, is_module_source};
use modpath::store::VerdictStore;
use rayon::prelude::*;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    match cli.command.clone() {
        Commands::Clear => {
            let db_path = resolve_db_path(&cli)?;
            clear_db(&db_path)?;
        }
        Commands::Stats => {
            let db_path = resolve_db_path(&cli)?;
            let store = VerdictStore::open(db_path, cache_spec(&cli))?;
            println!("{}", serde_json::to_string_pretty(&store.stats()?)?);
        }
        Commands::Classify { paths } => {
            let cache = open_cache(&cli)?;
            let report = classify_paths(cache.as_ref(), &paths)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Partition {
            mut paths,
            scan,
            not_module_aware,
            no_infer,
            format,
        } => {
            if let Some(dir) = scan {
                paths.extend(scan_jars(&dir));
            }
            let detector = ModuleDetector::new(open_cache(&cli)?);
            let policy = PartitionPolicy {
                infer_module_path: !no_infer,
            };
            if !not_module_aware && policy.infer_module_path {
                // Scan jars across the rayon pool; the partition below then hits the cache.
                paths
                    .par_iter()
                    .try_for_each(|p| detector.is_module(p).map(drop))
                    .context("Failed to classify partition candidates")?;
            }
            let partition = detector.partition(!not_module_aware, policy, Some(&paths[..]))?;
            print!("{}", render_partition(&partition, format)?);
        }
        Commands::Source { roots } => {
            let report = SourceReport {
                is_module_source: is_module_source(&roots),
                module_name: declared_module_name(&roots),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn open_cache(cli: &Cli) -> Result<Arc<FileContentCache>> {
    let spec: CacheSpec = cache_spec(cli);
    let cache = FileContentCache::new(spec.clone(), ModuleInfoLocator);
    if cli.no_persist {
        return Ok(Arc::new(cache));
    }
    let db_path = resolve_db_path(cli)?;
    let store = VerdictStore::open(db_path.clone(), spec)
        .with_context(|| format!("Failed to open module cache: {}", db_path.display()))?;
    Ok(Arc::new(cache.with_store(store)))
}

#[derive(Debug, Serialize)]
struct ClassifiedPath {
    path: String,
    kind: FileKind,
    exists: bool,
    is_module: bool,
}

#[derive(Debug, Serialize)]
struct SourceReport {
    is_module_source: bool,
    module_name: Option<String>,
}

fn classify_paths(cache: &dyn ModuleCache, paths: &[PathBuf]) -> Result<Vec<ClassifiedPath>> {
    // Indexed parallel collect keeps input order.
    paths
        .par_iter()
        .map(|path| -> Result<ClassifiedPath> {
            let kind = FileKind::probe(path)?;
            let exists = kind != FileKind::Missing;
            let is_module = if exists {
                cache
                    .get(path)
                    .with_context(|| format!("Failed to classify {}", path.display()))?
            } else {
                false
            };
            Ok(ClassifiedPath {
                path: path.to_string_lossy().to_string(),
                kind,
                exists,
                is_module,
            })
        })
        .collect()
}

fn render_partition(partition: &Partition, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => format!("{}\n", serde_json::to_string_pretty(partition)?),
        OutputFormat::Text => {
            let mut out = String::new();
            out.push_str(&format!("classpath: {}\n", join_paths(&partition.classpath)));
            out.push_str(&format!("module_path: {}\n", join_paths(&partition.module_path)));
            out
        }
    })
}

fn join_paths(paths: &[PathBuf]) -> String {
    let sep = if cfg!(windows) { ";" } else { ":" };
    paths
        .iter()
        .map(|p| p.to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join(sep)
}
