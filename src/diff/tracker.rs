// src/diff/tracker.rs

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use dashmap::DashMap;
use tracing::debug;

use crate::diff::{SpecChangeSet, differ};
use crate::parse::StaticParseResult;
use crate::watch::path_utils::path_key;

/// Process-lifetime store of the last snapshot per spec file and the last
/// seen modification time per dependency.
///
/// Keys follow host path semantics (see [`path_key`]). Safe to share between
/// tasks.
#[derive(Debug, Default)]
pub struct SpecChangeTracker {
    states: DashMap<PathBuf, TrackedState>,
    dependencies: DashMap<PathBuf, SystemTime>,
}

#[derive(Debug, Clone)]
struct TrackedState {
    path: PathBuf,
    result: StaticParseResult,
}

impl SpecChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the baseline for `path`.
    pub fn record_state(&self, path: &Path, result: StaticParseResult) {
        debug!(file = %path.display(), specs = result.specs.len(), "recording spec baseline");
        self.states.insert(
            path_key(path),
            TrackedState {
                path: path.to_path_buf(),
                result,
            },
        );
    }

    pub fn has_state(&self, path: &Path) -> bool {
        self.states.contains_key(&path_key(path))
    }

    pub fn state(&self, path: &Path) -> Option<StaticParseResult> {
        self.states.get(&path_key(path)).map(|s| s.result.clone())
    }

    pub fn remove_state(&self, path: &Path) {
        self.states.remove(&path_key(path));
    }

    /// Files that currently have a baseline.
    pub fn tracked_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self.states.iter().map(|s| s.path.clone()).collect();
        files.sort();
        files
    }

    /// Diff `new` against the recorded baseline (if any).
    ///
    /// Does not update the baseline; callers record it once the run that
    /// covers these changes has succeeded.
    pub fn get_changes(
        &self,
        path: &Path,
        new: &StaticParseResult,
        dependency_changed: bool,
    ) -> SpecChangeSet {
        let previous = self.states.get(&path_key(path));
        differ::diff(
            path,
            previous.as_ref().map(|s| &s.result),
            new,
            dependency_changed,
        )
    }

    pub fn record_dependency(&self, path: &Path, modified: SystemTime) {
        self.dependencies.insert(path_key(path), modified);
    }

    /// True if `modified` is strictly newer than what was recorded, or if the
    /// dependency has never been seen.
    pub fn has_dependency_changed(&self, path: &Path, modified: SystemTime) -> bool {
        match self.dependencies.get(&path_key(path)) {
            Some(seen) => modified > *seen,
            None => true,
        }
    }

    /// Forget all baselines and dependency times.
    pub fn clear(&self) {
        self.states.clear();
        self.dependencies.clear();
    }
}
