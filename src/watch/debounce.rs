// src/watch/debounce.rs

//! Pure classification and coalescing of filesystem events.
//!
//! The OS watcher in [`super::watcher`] only owns the timer; everything that
//! decides *what* a burst of events means lives here so it can be tested
//! without a real filesystem.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::trace;

use crate::watch::path_utils::{PathNormalizer, is_editor_artifact, relative_str};

/// One coalesced change, emitted once per debounce window.
///
/// `file_path == None` is the escalation marker: a non-spec file changed, or
/// more than one relevant file changed, so the caller should run everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChangeInfo {
    pub file_path: Option<PathBuf>,
    pub is_spec_file: bool,
}

impl FileChangeInfo {
    pub fn spec(path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: Some(path.into()),
            is_spec_file: true,
        }
    }

    pub fn escalation() -> Self {
        Self {
            file_path: None,
            is_spec_file: false,
        }
    }
}

/// Watcher behaviour knobs.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Quiet period after the last relevant event before emitting.
    pub debounce: Duration,
    /// File-name suffix identifying spec files (e.g. `.spec.csx`).
    pub spec_suffix: String,
    /// Extensions (without dot) of non-spec files that should escalate.
    pub source_extensions: Vec<String>,
    /// Directory names whose contents are never considered.
    pub ignored_dirs: Vec<String>,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            spec_suffix: ".spec.csx".to_string(),
            source_extensions: ["csx", "cs", "csproj", "json", "props", "targets"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ignored_dirs: ["bin", "obj", ".git", ".vs", "node_modules"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl WatchOptions {
    pub fn is_spec_file(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(&self.spec_suffix) && n.len() > self.spec_suffix.len())
    }

    fn is_source_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.source_extensions
                    .iter()
                    .any(|s| s.eq_ignore_ascii_case(ext))
            })
    }
}

/// How a single changed path is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    Ignored,
    Spec,
    Source,
}

/// Classifies raw event paths relative to the watch root.
#[derive(Debug, Clone)]
pub struct ChangeClassifier {
    root: PathBuf,
    only_file: Option<PathBuf>,
    options: WatchOptions,
    normalizer: Arc<dyn PathNormalizer>,
}

impl ChangeClassifier {
    /// `root` and `only_file` must already be normalized.
    pub fn new(
        root: PathBuf,
        only_file: Option<PathBuf>,
        options: WatchOptions,
        normalizer: Arc<dyn PathNormalizer>,
    ) -> Self {
        Self {
            root,
            only_file,
            options,
            normalizer,
        }
    }

    pub fn options(&self) -> &WatchOptions {
        &self.options
    }

    /// Normalize and classify one path. Returns the normalized path too.
    pub fn classify(&self, raw: &Path) -> (PathClass, PathBuf) {
        let path = self.normalizer.normalize(raw);

        if let Some(target) = &self.only_file {
            if &path != target {
                return (PathClass::Ignored, path);
            }
        }

        if is_editor_artifact(&path) {
            trace!(path = %path.display(), "ignoring editor artifact");
            return (PathClass::Ignored, path);
        }

        let Some(rel) = relative_str(&self.root, &path) else {
            return (PathClass::Ignored, path);
        };
        if rel
            .split('/')
            .any(|segment| self.options.ignored_dirs.iter().any(|d| d == segment))
        {
            return (PathClass::Ignored, path);
        }

        let class = if self.options.is_spec_file(&path) {
            PathClass::Spec
        } else if self.options.is_source_file(&path) {
            PathClass::Source
        } else {
            PathClass::Ignored
        };
        (class, path)
    }
}

/// Accumulates the relevant paths seen during one debounce window.
#[derive(Debug, Default)]
pub struct ChangeBatch {
    spec_files: BTreeSet<PathBuf>,
    source_changed: bool,
}

impl ChangeBatch {
    /// Record one classified path. Returns true if the path was relevant
    /// (and therefore should restart the debounce timer).
    pub fn ingest(&mut self, class: PathClass, path: PathBuf) -> bool {
        match class {
            PathClass::Ignored => false,
            PathClass::Spec => {
                self.spec_files.insert(path);
                true
            }
            PathClass::Source => {
                self.source_changed = true;
                true
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.spec_files.is_empty() && !self.source_changed
    }

    /// Collapse the window into a single change, if anything relevant happened.
    pub fn finish(self) -> Option<FileChangeInfo> {
        if self.is_empty() {
            return None;
        }
        if self.source_changed || self.spec_files.len() > 1 {
            return Some(FileChangeInfo::escalation());
        }
        self.spec_files.into_iter().next().map(FileChangeInfo::spec)
    }
}
