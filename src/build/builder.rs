// src/build/builder.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use dashmap::DashMap;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};

use crate::build::cache::BuildCache;
use crate::build::project::ProjectLocator;
use crate::build::tool::BuildTool;
use crate::fs::walk_files;

/// Which files count as build inputs and where build output lands.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Extensions (without dot) whose modification times drive rebuilds.
    pub source_extensions: Vec<String>,
    /// Directory names skipped while scanning sources (build output, VCS).
    pub ignored_dirs: Vec<String>,
    /// Candidate output directories, relative to the project directory.
    pub output_dirs: Vec<String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            source_extensions: ["cs", "csproj", "props", "targets"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ignored_dirs: ["bin", "obj", ".git", ".vs", "node_modules"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            output_dirs: vec!["bin/Debug".to_string(), "bin/Release".to_string()],
        }
    }
}

/// Outcome of one build invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResult {
    pub project: PathBuf,
    pub success: bool,
    /// Captured stdout (and stderr, appended) of the build tool.
    pub output: String,
    /// Set when the build failed or the tool could not be started.
    pub error: Option<String>,
}

/// Build lifecycle notifications, published on a broadcast channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    Started(PathBuf),
    Completed(BuildResult),
    Skipped(PathBuf),
}

/// What `build_projects` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// No project descriptor above the spec directory; nothing to build.
    NoProject,
    /// Project sources unchanged since the last successful build.
    Skipped(PathBuf),
    Built(BuildResult),
}

impl BuildOutcome {
    /// The build result if a build ran and failed.
    pub fn failure(&self) -> Option<&BuildResult> {
        match self {
            BuildOutcome::Built(result) if !result.success => Some(result),
            _ => None,
        }
    }
}

/// Staleness-aware builder for the projects that contain spec files.
///
/// Builds of the same project are serialized; different projects can build
/// concurrently.
pub struct ProjectBuilder {
    locator: ProjectLocator,
    tool: Arc<dyn BuildTool>,
    options: BuildOptions,
    cache: BuildCache,
    /// Latest source modification time per project, valid until the next
    /// build of that project or the next build cycle.
    source_times: DashMap<PathBuf, SystemTime>,
    build_locks: DashMap<PathBuf, Arc<Mutex<()>>>,
    events: broadcast::Sender<BuildEvent>,
}

impl std::fmt::Debug for ProjectBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectBuilder")
            .field("locator", &self.locator)
            .field("options", &self.options)
            .field("cached_projects", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl ProjectBuilder {
    pub fn new(locator: ProjectLocator, tool: Arc<dyn BuildTool>, options: BuildOptions) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            locator,
            tool,
            options,
            cache: BuildCache::new(),
            source_times: DashMap::new(),
            build_locks: DashMap::new(),
            events,
        }
    }

    /// Receive build lifecycle events from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<BuildEvent> {
        self.events.subscribe()
    }

    pub fn cache(&self) -> &BuildCache {
        &self.cache
    }

    pub fn locator(&self) -> &ProjectLocator {
        &self.locator
    }

    /// Build the project enclosing `spec_dir` if its sources changed since
    /// the last successful build.
    ///
    /// Never fails: a failing build is reported as a `BuildResult` with
    /// `success == false`.
    pub async fn build_projects(&self, spec_dir: &Path) -> BuildOutcome {
        let Some(project) = self.locator.find_project_dir(spec_dir) else {
            debug!(dir = %spec_dir.display(), "no project found; nothing to build");
            return BuildOutcome::NoProject;
        };

        let lock = self.build_locks.entry(project.clone()).or_default().clone();
        let _guard = lock.lock().await;

        let source_modified = self.latest_source_modification(&project);
        if !self.cache.needs_rebuild(&project, source_modified) {
            debug!(project = %project.display(), "build up to date; skipping");
            self.publish(BuildEvent::Skipped(project.clone()));
            return BuildOutcome::Skipped(project);
        }

        self.publish(BuildEvent::Started(project.clone()));
        let result = self.invoke_tool(&project).await;

        // Any build may have touched the sources' surroundings; rescan next time.
        self.invalidate_source_cache(&project);

        if result.success {
            self.cache
                .update_cache(&project, SystemTime::now(), source_modified);
        }

        self.publish(BuildEvent::Completed(result.clone()));
        BuildOutcome::Built(result)
    }

    async fn invoke_tool(&self, project: &Path) -> BuildResult {
        match self.tool.build(project).await {
            Ok(out) => {
                let success = out.success();
                let mut output = out.stdout;
                if !out.stderr.is_empty() {
                    if !output.is_empty() && !output.ends_with('\n') {
                        output.push('\n');
                    }
                    output.push_str(&out.stderr);
                }
                if success {
                    info!(project = %project.display(), "build succeeded");
                } else {
                    warn!(project = %project.display(), exit_code = out.exit_code, "build failed");
                }
                BuildResult {
                    project: project.to_path_buf(),
                    success,
                    error: (!success).then(|| format!("build exited with code {}", out.exit_code)),
                    output,
                }
            }
            Err(err) => {
                warn!(project = %project.display(), error = %err, "could not run build tool");
                BuildResult {
                    project: project.to_path_buf(),
                    success: false,
                    output: String::new(),
                    error: Some(format!("{err:#}")),
                }
            }
        }
    }

    /// Latest modification time among the project's source files.
    ///
    /// Cached per project until the next build or an explicit invalidation.
    /// A failed scan yields "now" so the project is rebuilt.
    pub fn latest_source_modification(&self, project: &Path) -> SystemTime {
        if let Some(cached) = self.source_times.get(project) {
            return *cached;
        }

        let fs = self.locator.fs();
        let extensions = &self.options.source_extensions;
        let scan = walk_files(fs.as_ref(), project, &self.options.ignored_dirs, |p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| extensions.iter().any(|s| s.eq_ignore_ascii_case(ext)))
        });

        let files = match scan {
            Ok(files) => files,
            Err(err) => {
                warn!(project = %project.display(), error = %err, "source scan failed; forcing rebuild");
                return SystemTime::now();
            }
        };

        let latest = files
            .iter()
            .filter_map(|f| fs.modified(f).ok())
            .max()
            .unwrap_or(SystemTime::UNIX_EPOCH);

        debug!(project = %project.display(), files = files.len(), "scanned project sources");
        self.source_times.insert(project.to_path_buf(), latest);
        latest
    }

    /// Forget the cached source scan for one project directory.
    pub fn invalidate_source_cache(&self, project: &Path) {
        self.source_times.remove(project);
    }

    /// Start a new build cycle: every project is rescanned on its next
    /// `build_projects`, so edits made since the last cycle are seen.
    pub fn begin_build_cycle(&self) {
        self.source_times.clear();
    }

    /// Directory holding compiled artifacts for the spec's project, or the
    /// spec directory itself if nothing has been built.
    pub fn find_output_directory(&self, spec_dir: &Path) -> PathBuf {
        let Some(project) = self.locator.find_project_dir(spec_dir) else {
            return spec_dir.to_path_buf();
        };
        let fs = self.locator.fs();

        let mut candidates: Vec<(SystemTime, PathBuf)> = Vec::new();
        for rel in &self.options.output_dirs {
            let dir = project.join(rel);
            if !fs.is_dir(&dir) {
                continue;
            }
            // Prefer a nested target folder (e.g. `net8.0`) when present.
            let nested = fs
                .read_dir(&dir)
                .map(|entries| entries.into_iter().filter(|p| fs.is_dir(p)).collect::<Vec<_>>())
                .unwrap_or_default();
            if nested.is_empty() {
                candidates.push((fs.modified(&dir).unwrap_or(SystemTime::UNIX_EPOCH), dir));
            } else {
                for sub in nested {
                    candidates.push((fs.modified(&sub).unwrap_or(SystemTime::UNIX_EPOCH), sub));
                }
            }
        }

        candidates
            .into_iter()
            .max()
            .map(|(_, dir)| dir)
            .unwrap_or_else(|| spec_dir.to_path_buf())
    }

    /// Forget every build and every source scan.
    pub fn clear_build_cache(&self) {
        info!("clearing build cache");
        self.cache.clear();
        self.source_times.clear();
    }

    fn publish(&self, event: BuildEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
