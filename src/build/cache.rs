// src/build/cache.rs

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use dashmap::DashMap;
use tracing::debug;

/// What we remember about the last successful build of a project directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildCacheEntry {
    pub last_build_time: SystemTime,
    pub last_source_modified: SystemTime,
}

/// In-memory staleness ledger, keyed by project directory.
///
/// Concurrent readers and writers only contend on the map shard of the key
/// they touch.
#[derive(Debug, Default)]
pub struct BuildCache {
    entries: DashMap<PathBuf, BuildCacheEntry>,
}

impl BuildCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `directory` was never built, or its sources are strictly newer
    /// than at the last build.
    pub fn needs_rebuild(&self, directory: &Path, current_source_modified: SystemTime) -> bool {
        match self.entries.get(directory) {
            None => true,
            Some(entry) => current_source_modified > entry.last_source_modified,
        }
    }

    pub fn update_cache(
        &self,
        directory: &Path,
        build_time: SystemTime,
        source_modified: SystemTime,
    ) {
        debug!(dir = %directory.display(), "updating build cache entry");
        self.entries.insert(
            directory.to_path_buf(),
            BuildCacheEntry {
                last_build_time: build_time,
                last_source_modified: source_modified,
            },
        );
    }

    pub fn entry(&self, directory: &Path) -> Option<BuildCacheEntry> {
        self.entries.get(directory).map(|e| *e)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
