// src/engine/processor.rs

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::Result;
use globset::GlobSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::build::ProjectLocator;
use crate::build::project::build_globset;
use crate::diff::SpecChangeTracker;
use crate::errors::SpecwatchError;
use crate::engine::WatchAction;
use crate::fs::walk_files;
use crate::parse::StaticParser;
use crate::types::WatchFlags;
use crate::watch::FileChangeInfo;
use crate::watch::path_utils::{PathNormalizer, host_normalizer, path_key};

/// Knobs for the decision layer.
#[derive(Debug, Clone)]
pub struct ProcessorOptions {
    pub spec_suffix: String,
    /// Globs (relative to the project directory) of files whose changes
    /// invalidate every spec in the project.
    pub dependency_globs: Vec<String>,
    pub ignored_dirs: Vec<String>,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            spec_suffix: ".spec.csx".to_string(),
            dependency_globs: vec!["**/*.csx".to_string()],
            ignored_dirs: ["bin", "obj", ".git", ".vs", "node_modules"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Decides the minimal [`WatchAction`] for a debounced change.
///
/// Never fails: parse problems and cancellation are folded into the action.
pub struct WatchEventProcessor {
    parser: Arc<dyn StaticParser>,
    tracker: Arc<SpecChangeTracker>,
    locator: ProjectLocator,
    options: ProcessorOptions,
    dependency_set: GlobSet,
    normalizer: Arc<dyn PathNormalizer>,
}

impl std::fmt::Debug for WatchEventProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchEventProcessor")
            .field("locator", &self.locator)
            .field("options", &self.options)
            .field("normalizer", &self.normalizer)
            .finish_non_exhaustive()
    }
}

impl WatchEventProcessor {
    pub fn new(
        parser: Arc<dyn StaticParser>,
        tracker: Arc<SpecChangeTracker>,
        locator: ProjectLocator,
        options: ProcessorOptions,
    ) -> Result<Self> {
        let dependency_set = build_globset(&options.dependency_globs)?;
        Ok(Self {
            parser,
            tracker,
            locator,
            options,
            dependency_set,
            normalizer: host_normalizer(),
        })
    }

    pub fn with_normalizer(mut self, normalizer: Arc<dyn PathNormalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn tracker(&self) -> &Arc<SpecChangeTracker> {
        &self.tracker
    }

    pub async fn process(
        &self,
        change: &FileChangeInfo,
        known_specs: &[PathBuf],
        project_root: &Path,
        flags: WatchFlags,
        cancel: &CancellationToken,
    ) -> WatchAction {
        if cancel.is_cancelled() {
            return WatchAction::Skip {
                message: Some("cancelled".to_string()),
            };
        }

        let changed = match &change.file_path {
            Some(path) if change.is_spec_file => path,
            _ => {
                debug!("change is not a single spec file; running everything");
                return WatchAction::RunAll;
            }
        };

        let Some(spec_file) = self.find_known(changed, known_specs) else {
            info!(file = %changed.display(), "changed spec is not known; re-discovering");
            return WatchAction::RunAll;
        };

        if !flags.incremental {
            return WatchAction::run_file(spec_file);
        }
        if flags.no_cache {
            return WatchAction::RunFile {
                file_path: spec_file,
                message: Some("cache disabled".to_string()),
                parse_result_to_record: None,
            };
        }

        let project_dir = self.project_dir_for(&spec_file, project_root);

        let parsed = match self.parser.parse_file(&spec_file, cancel).await {
            Ok(parsed) => parsed,
            Err(SpecwatchError::Cancelled) => {
                return WatchAction::Skip {
                    message: Some("cancelled".to_string()),
                };
            }
            Err(err) => {
                warn!(file = %spec_file.display(), error = %err, "static parse failed; running whole file");
                return WatchAction::RunFile {
                    file_path: spec_file,
                    message: Some(format!("static parse failed: {err}")),
                    parse_result_to_record: None,
                };
            }
        };

        let dependency_changed = self.check_dependencies(&project_dir, known_specs);
        let changes = self
            .tracker
            .get_changes(&spec_file, &parsed, dependency_changed);

        if !changes.has_changes() {
            debug!(file = %spec_file.display(), "no spec changes");
            return WatchAction::Skip {
                message: Some("no spec changes detected".to_string()),
            };
        }

        if changes.has_dynamic_specs {
            return WatchAction::RunFile {
                file_path: spec_file,
                message: Some("dynamic specs detected".to_string()),
                parse_result_to_record: None,
            };
        }
        if changes.dependency_changed {
            return WatchAction::RunFile {
                file_path: spec_file,
                message: Some("dependency changed".to_string()),
                parse_result_to_record: Some(parsed),
            };
        }

        let descriptions: Vec<&str> = changes
            .specs_to_run()
            .map(|c| c.description.as_str())
            .collect();

        if descriptions.is_empty() {
            // Only deletions: nothing to run, but the baseline must move on.
            let deleted = changes.changes.len();
            self.tracker.record_state(&spec_file, parsed);
            return WatchAction::Skip {
                message: Some(format!("{deleted} spec(s) removed")),
            };
        }

        let filter_pattern = build_filter_pattern(descriptions.iter().copied());
        let message = format!("running {} changed spec(s)", descriptions.len());
        info!(file = %spec_file.display(), pattern = %filter_pattern, "incremental run");

        WatchAction::RunFiltered {
            file_path: spec_file,
            filter_pattern,
            message,
            parse_result_to_record: parsed,
        }
    }

    /// Parse `spec_file` and make the result its tracked baseline.
    pub async fn record_baseline(&self, spec_file: &Path, cancel: &CancellationToken) {
        match self.parser.parse_file(spec_file, cancel).await {
            Ok(parsed) => self.tracker.record_state(spec_file, parsed),
            Err(err) => {
                debug!(file = %spec_file.display(), error = %err, "could not parse for baseline")
            }
        }
    }

    /// Record current modification times of every dependency under
    /// `project_root`, so the first edit after start-up isn't mistaken for a
    /// dependency change.
    pub fn prime_dependencies(&self, project_root: &Path, known_specs: &[PathBuf]) {
        let times = self.dependency_times(project_root, known_specs);
        debug!(root = %project_root.display(), dependencies = times.len(), "primed dependency times");
        self.record_dependency_times(times);
    }

    /// Current modification times of every dependency under `dir`.
    ///
    /// Take this before a run and hand it to [`Self::record_dependency_times`]
    /// once the run finished, so edits made during the run are not lost.
    pub fn dependency_times(&self, dir: &Path, known_specs: &[PathBuf]) -> Vec<(PathBuf, SystemTime)> {
        let fs = self.locator.fs();
        self.dependency_files(dir, known_specs)
            .into_iter()
            .filter_map(|dep| match fs.modified(&dep) {
                Ok(modified) => Some((dep, modified)),
                Err(err) => {
                    debug!(file = %dep.display(), error = %err, "cannot stat dependency");
                    None
                }
            })
            .collect()
    }

    pub fn record_dependency_times(&self, times: Vec<(PathBuf, SystemTime)>) {
        for (dep, modified) in times {
            self.tracker.record_dependency(&dep, modified);
        }
    }

    /// Accept the current dependency times of `spec_file`'s project, after a
    /// run of that file succeeded.
    pub fn record_dependencies(&self, spec_file: &Path, project_root: &Path, known_specs: &[PathBuf]) {
        let project_dir = self.project_dir_for(spec_file, project_root);
        let times = self.dependency_times(&project_dir, known_specs);
        self.record_dependency_times(times);
    }

    /// True if any dependency under `project_dir` is newer than last
    /// recorded. Nothing is recorded here.
    fn check_dependencies(&self, project_dir: &Path, known_specs: &[PathBuf]) -> bool {
        let mut changed = false;
        for (dep, modified) in self.dependency_times(project_dir, known_specs) {
            if self.tracker.has_dependency_changed(&dep, modified) {
                debug!(file = %dep.display(), "dependency changed");
                changed = true;
            }
        }
        changed
    }

    fn project_dir_for(&self, spec_file: &Path, project_root: &Path) -> PathBuf {
        spec_file
            .parent()
            .and_then(|dir| self.locator.find_project_dir(dir))
            .unwrap_or_else(|| project_root.to_path_buf())
    }

    fn dependency_files(&self, dir: &Path, known_specs: &[PathBuf]) -> Vec<PathBuf> {
        let known: HashSet<PathBuf> = known_specs
            .iter()
            .map(|p| path_key(&self.normalizer.normalize(p)))
            .collect();
        let suffix = self.options.spec_suffix.as_str();

        let scan = walk_files(
            self.locator.fs().as_ref(),
            dir,
            &self.options.ignored_dirs,
            |path| {
                let Ok(rel) = path.strip_prefix(dir) else {
                    return false;
                };
                let is_spec = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(suffix));
                !is_spec
                    && self.dependency_set.is_match(rel)
                    && !known.contains(&path_key(&self.normalizer.normalize(path)))
            },
        );

        match scan {
            Ok(files) => files,
            Err(err) => {
                warn!(dir = %dir.display(), error = %err, "dependency scan failed");
                Vec::new()
            }
        }
    }

    fn find_known(&self, changed: &Path, known_specs: &[PathBuf]) -> Option<PathBuf> {
        let wanted = path_key(&self.normalizer.normalize(changed));
        known_specs
            .iter()
            .find(|k| path_key(&self.normalizer.normalize(k)) == wanted)
            .cloned()
    }
}

/// `^(d1|d2|...)$` with every description escaped and duplicates removed.
pub fn build_filter_pattern<'a>(descriptions: impl IntoIterator<Item = &'a str>) -> String {
    let mut seen = HashSet::new();
    let alternatives: Vec<String> = descriptions
        .into_iter()
        .filter(|d| seen.insert(*d))
        .map(regex::escape)
        .collect();
    format!("^({})$", alternatives.join("|"))
}

