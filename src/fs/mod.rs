// src/fs/mod.rs

//! Filesystem abstraction.
//!
//! Staleness scans, dependency checks, spec discovery and validation all go
//! through [`FileSystem`] so they can run against [`mock::MockFileSystem`].
//! The OS watcher talks to the real filesystem directly.

use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};

pub mod mock;

/// The read-only slice of a filesystem the engine needs.
pub trait FileSystem: Send + Sync + Debug {
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn is_file(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;

    /// Last modification time of a file or directory.
    fn modified(&self, path: &Path) -> Result<SystemTime>;

    /// Full paths of the entries directly inside `path`.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;
}

/// `std::fs`-backed implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn modified(&self, path: &Path) -> Result<SystemTime> {
        let meta = fs::metadata(path).with_context(|| format!("stat {}", path.display()))?;
        meta.modified()
            .with_context(|| format!("modification time of {}", path.display()))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        fs::read_dir(path)
            .with_context(|| format!("listing {}", path.display()))?
            .map(|entry| entry.map(|e| e.path()).map_err(Into::into))
            .collect()
    }
}

/// Every file below `root` accepted by `keep`, sorted.
///
/// Directories named in `ignored_dirs` (e.g. `bin`, `obj`) are not entered.
/// Unreadable subdirectories are skipped; an unreadable `root` is an error.
pub fn walk_files<F>(
    fs: &dyn FileSystem,
    root: &Path,
    ignored_dirs: &[String],
    mut keep: F,
) -> Result<Vec<PathBuf>>
where
    F: FnMut(&Path) -> bool,
{
    let is_ignored = |dir: &Path| {
        dir.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| ignored_dirs.iter().any(|d| d == n))
    };

    let mut found = Vec::new();
    let mut pending = fs.read_dir(root)?;

    while let Some(path) = pending.pop() {
        if fs.is_dir(&path) {
            if is_ignored(&path) {
                continue;
            }
            match fs.read_dir(&path) {
                Ok(entries) => pending.extend(entries),
                Err(err) => tracing::debug!(dir = %path.display(), error = %err, "skipping unreadable directory"),
            }
        } else if fs.is_file(&path) && keep(&path) {
            found.push(path);
        }
    }

    found.sort();
    Ok(found)
}
