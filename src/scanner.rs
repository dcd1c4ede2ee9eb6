//! Decides whether a single file looks like a Java module.
//!
//! A directory is a module when it holds `module-info.class` directly. A `.jar` is a
//! module when its manifest names an automatic module or it carries a
//! `module-info.class` entry at the archive root. Anything else is not a module.

use memmap2::Mmap;
use std::fs::File;
use std::io::{Cursor, ErrorKind, Read};
use std::path::Path;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::cache::Calculator;
use crate::error::{ClassifyError, Result};
use crate::manifest::{AUTOMATIC_MODULE_NAME, MANIFEST_PATH, main_attribute};

pub const MODULE_INFO_CLASS_FILE: &str = "module-info.class";
pub const JAR_SUFFIX: &str = ".jar";

// Sizes in the central directory are untrusted; never read more manifest than this.
const MAX_MANIFEST_BYTES: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Directory,
    Archive,
    Plain,
    Missing,
}

impl FileKind {
    /// Resolves the kind with a single `stat`. A path that does not exist is `Missing`,
    /// any other stat failure is an error.
    pub fn probe(path: &Path) -> Result<Self> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_dir() => Ok(Self::Directory),
            Ok(_) => Ok(Self::from_hint(path, true)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::Missing),
            Err(e) => Err(ClassifyError::io(path, e)),
        }
    }

    /// Kind for a path whose existence is already known, without touching the disk.
    pub fn from_hint(path: &Path, is_regular_file: bool) -> Self {
        if !is_regular_file {
            return Self::Directory;
        }
        if is_jar_name(path) {
            Self::Archive
        } else {
            Self::Plain
        }
    }
}

pub fn is_jar_name(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|n| n.to_string_lossy().ends_with(JAR_SUFFIX))
}

pub fn classify(path: &Path, kind: FileKind) -> Result<bool> {
    let verdict = match kind {
        FileKind::Directory => classify_directory(path)?,
        FileKind::Archive => classify_archive(path)?,
        FileKind::Plain | FileKind::Missing => false,
    };
    tracing::debug!(path = %path.display(), ?kind, is_module = verdict, "classified");
    Ok(verdict)
}

pub fn classify_directory(dir: &Path) -> Result<bool> {
    let descriptor = dir.join(MODULE_INFO_CLASS_FILE);
    match std::fs::metadata(&descriptor) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(ClassifyError::io(descriptor, e)),
    }
}

pub fn classify_archive(jar_path: &Path) -> Result<bool> {
    let file = File::open(jar_path).map_err(|e| ClassifyError::io(jar_path, e))?;
    // SAFETY: the file is opened read-only and outlives the map; nothing here writes to it.
    let mmap = unsafe { Mmap::map(&file) }.map_err(|e| ClassifyError::io(jar_path, e))?;
    let mut archive = ZipArchive::new(Cursor::new(&mmap[..])).map_err(|e| archive_error(jar_path, e))?;

    if let Some(manifest) = read_manifest(&mut archive, jar_path)?
        && main_attribute(&manifest, AUTOMATIC_MODULE_NAME).is_some()
    {
        return Ok(true);
    }

    match archive.by_name(MODULE_INFO_CLASS_FILE) {
        Ok(_) => Ok(true),
        Err(ZipError::FileNotFound) => Ok(false),
        Err(e) => Err(archive_error(jar_path, e)),
    }
}

fn read_manifest(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    jar_path: &Path,
) -> Result<Option<String>> {
    let mut entry = match archive.by_name(MANIFEST_PATH) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(archive_error(jar_path, e)),
    };
    let mut raw = Vec::new();
    entry
        .by_ref()
        .take(MAX_MANIFEST_BYTES + 1)
        .read_to_end(&mut raw)
        .map_err(|e| ClassifyError::io(jar_path, e))?;
    if raw.len() as u64 > MAX_MANIFEST_BYTES {
        return Err(archive_error(
            jar_path,
            ZipError::InvalidArchive("manifest exceeds size limit"),
        ));
    }
    Ok(Some(String::from_utf8_lossy(&raw).into_owned()))
}

fn archive_error(jar_path: &Path, source: ZipError) -> ClassifyError {
    ClassifyError::Archive {
        path: jar_path.to_path_buf(),
        source,
    }
}

/// The calculator a module cache runs on a miss.
#[derive(Debug, Default, Clone, Copy)]
pub struct ModuleInfoLocator;

impl Calculator for ModuleInfoLocator {
    fn calculate(&self, path: &Path, is_regular_file: bool) -> Result<bool> {
        classify(path, FileKind::from_hint(path, is_regular_file))
    }
}
