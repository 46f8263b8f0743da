// src/build/project.rs

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, trace};

use crate::fs::FileSystem;

/// Finds the nearest enclosing buildable project for a spec directory.
#[derive(Clone)]
pub struct ProjectLocator {
    fs: Arc<dyn FileSystem>,
    markers: GlobSet,
    marker_patterns: Vec<String>,
}

impl fmt::Debug for ProjectLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectLocator")
            .field("markers", &self.marker_patterns)
            .finish_non_exhaustive()
    }
}

impl ProjectLocator {
    /// `markers` are file-name globs of project descriptors, e.g. `*.csproj`.
    pub fn new(fs: Arc<dyn FileSystem>, markers: &[String]) -> Result<Self> {
        Ok(Self {
            fs,
            markers: build_globset(markers).context("building project marker globset")?,
            marker_patterns: markers.to_vec(),
        })
    }

    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// Walk upward from `start` (inclusive) and return the first directory
    /// containing a project descriptor.
    pub fn find_project_dir(&self, start: &Path) -> Option<PathBuf> {
        for dir in start.ancestors() {
            if dir.as_os_str().is_empty() || !self.fs.is_dir(dir) {
                continue;
            }
            let Ok(entries) = self.fs.read_dir(dir) else {
                continue;
            };
            let found = entries.iter().any(|entry| {
                self.fs.is_file(entry)
                    && entry
                        .file_name()
                        .is_some_and(|name| self.markers.is_match(Path::new(name)))
            });
            if found {
                debug!(start = %start.display(), project = %dir.display(), "found project directory");
                return Some(dir.to_path_buf());
            }
            trace!(dir = %dir.display(), "no project descriptor");
        }
        None
    }
}

/// Build a GlobSet from simple string patterns.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
