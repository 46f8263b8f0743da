// src/exec/runner.rs

//! In-process spec runner.
//!
//! Per file the lifecycle is: validate → build → reset registry → execute →
//! reset registry → collect. Build caching makes the build step cheap when
//! nothing changed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::build::{BuildOutcome, ProjectBuilder};
use crate::errors::{Result, SpecwatchError};
use crate::exec::diagnostics::{CompilationFailure, CompileDiagnostic};
use crate::exec::executor::{ExecutionRequest, ExecutorError, ScriptExecutor};
use crate::exec::registry::{RegistryFactory, ResetOnDrop, SpecRegistry};
use crate::exec::report::{InProcessRunResult, InProcessRunSummary, SpecReport};
use crate::filter::RunFilters;
use crate::fs::FileSystem;
use crate::validation::PathValidator;

/// Runs spec files against the script executor.
///
/// Cheap to clone; clones share the builder, executor and registry factory.
#[derive(Clone)]
pub struct InProcessSpecRunner {
    builder: Arc<ProjectBuilder>,
    executor: Arc<dyn ScriptExecutor>,
    registries: Arc<dyn RegistryFactory>,
    filters: RunFilters,
    validator: Option<PathValidator>,
}

impl std::fmt::Debug for InProcessSpecRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InProcessSpecRunner")
            .field("filters", &self.filters)
            .field("validator", &self.validator)
            .finish_non_exhaustive()
    }
}

impl InProcessSpecRunner {
    pub fn new(
        builder: Arc<ProjectBuilder>,
        executor: Arc<dyn ScriptExecutor>,
        registries: Arc<dyn RegistryFactory>,
        filters: RunFilters,
    ) -> Self {
        Self {
            builder,
            executor,
            registries,
            filters,
            validator: None,
        }
    }

    /// Reject spec paths outside `base_dir`.
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.validator = Some(PathValidator::new(base_dir));
        self
    }

    /// A runner sharing every collaborator but using other filters.
    pub fn with_filters(&self, filters: RunFilters) -> Self {
        Self {
            filters,
            ..self.clone()
        }
    }

    pub fn filters(&self) -> &RunFilters {
        &self.filters
    }

    pub fn builder(&self) -> &Arc<ProjectBuilder> {
        &self.builder
    }

    fn fs(&self) -> &Arc<dyn FileSystem> {
        self.builder.locator().fs()
    }

    /// Build (if stale) and run one spec file.
    ///
    /// Returns `Err` only for path validation failures and cancellation;
    /// build, compilation and runtime failures are recorded in the result.
    pub async fn run_file(
        &self,
        spec_file: &Path,
        cancel: &CancellationToken,
    ) -> Result<InProcessRunResult> {
        self.builder.begin_build_cycle();
        self.run_prepared(spec_file, None, cancel).await
    }

    /// `run_file` without the build step when `prebuilt` already holds the
    /// outcome for this file's directory.
    async fn run_prepared(
        &self,
        spec_file: &Path,
        prebuilt: Option<BuildOutcome>,
        cancel: &CancellationToken,
    ) -> Result<InProcessRunResult> {
        if cancel.is_cancelled() {
            return Err(SpecwatchError::Cancelled);
        }

        let spec_file = self.validate(spec_file)?;
        let started = Instant::now();
        let spec_dir = parent_dir(&spec_file);

        let outcome = match prebuilt {
            Some(outcome) => outcome,
            None => self.builder.build_projects(&spec_dir).await,
        };
        if let Some(failure) = outcome.failure() {
            warn!(spec = %spec_file.display(), project = %failure.project.display(), "not running spec: build failed");
            return Ok(InProcessRunResult::failed(
                &spec_file,
                started.elapsed(),
                SpecwatchError::Build {
                    project: failure.project.clone(),
                    output: failure
                        .error
                        .clone()
                        .unwrap_or_else(|| failure.output.clone()),
                },
            ));
        }

        if cancel.is_cancelled() {
            return Err(SpecwatchError::Cancelled);
        }

        let output_dir = self.builder.find_output_directory(&spec_dir);
        let registry = self.registries.create();
        self.execute(&spec_file, &output_dir, registry.as_ref(), cancel, started)
            .await
    }

    async fn execute(
        &self,
        spec_file: &Path,
        output_dir: &Path,
        registry: &dyn SpecRegistry,
        cancel: &CancellationToken,
        started: Instant,
    ) -> Result<InProcessRunResult> {
        debug!(spec = %spec_file.display(), output = %output_dir.display(), "executing spec file");

        registry.reset();
        let executed = {
            let _reset = ResetOnDrop::new(registry);
            self.executor
                .execute(ExecutionRequest {
                    spec_file,
                    output_dir,
                    registry,
                    filters: &self.filters,
                    cancel,
                })
                .await
        };
        let duration = started.elapsed();

        match executed {
            Ok(context) => {
                let report = match context {
                    Some(root) => SpecReport::from_context(spec_file, &root),
                    None => SpecReport::empty(spec_file),
                };
                info!(
                    spec = %spec_file.display(),
                    total = report.summary.total,
                    failed = report.summary.failed,
                    ?duration,
                    "spec file finished"
                );
                Ok(InProcessRunResult::completed(spec_file, report, duration))
            }
            Err(ExecutorError::Cancelled) => Err(SpecwatchError::Cancelled),
            Err(ExecutorError::Compilation(diagnostic)) => {
                let failure = self.compilation_failure(spec_file, diagnostic);
                warn!(spec = %spec_file.display(), error = %failure.message(), "spec file failed to compile");
                Ok(InProcessRunResult::failed(
                    spec_file,
                    duration,
                    SpecwatchError::Compilation(Box::new(failure)),
                ))
            }
            Err(ExecutorError::Failed(err)) => {
                warn!(spec = %spec_file.display(), error = %err, "spec file execution failed");
                Ok(InProcessRunResult::failed(
                    spec_file,
                    duration,
                    SpecwatchError::Execution(err),
                ))
            }
        }
    }

    fn compilation_failure(&self, spec_file: &Path, diagnostic: CompileDiagnostic) -> CompilationFailure {
        let source = match diagnostic.line {
            Some(_) => self.fs().read_to_string(spec_file).ok(),
            None => None,
        };
        CompilationFailure::new(spec_file, diagnostic, source.as_deref())
    }

    /// Run many files, sequentially (results in input order) or concurrently
    /// (one result per file, any order).
    ///
    /// Each distinct directory is built once up front and every file reuses
    /// its directory's outcome, failures included. Cancellation stops
    /// further work and returns `Err(Cancelled)`; in parallel mode running
    /// files are aborted.
    pub async fn run_all(
        &self,
        spec_files: &[PathBuf],
        parallel: bool,
        cancel: &CancellationToken,
    ) -> Result<InProcessRunSummary> {
        if cancel.is_cancelled() {
            return Err(SpecwatchError::Cancelled);
        }

        self.builder.begin_build_cycle();
        let mut builds: HashMap<PathBuf, BuildOutcome> = HashMap::new();
        for dir in spec_files.iter().map(|f| parent_dir(f)) {
            if builds.contains_key(&dir) {
                continue;
            }
            if cancel.is_cancelled() {
                return Err(SpecwatchError::Cancelled);
            }
            let outcome = self.builder.build_projects(&dir).await;
            builds.insert(dir, outcome);
        }

        info!(files = spec_files.len(), parallel, "running spec files");

        let results = if parallel {
            self.run_parallel(spec_files, &builds, cancel).await?
        } else {
            let mut results = Vec::with_capacity(spec_files.len());
            for file in spec_files {
                if cancel.is_cancelled() {
                    return Err(SpecwatchError::Cancelled);
                }
                let prebuilt = builds.get(&parent_dir(file)).cloned();
                let outcome = self.run_prepared(file, prebuilt, cancel).await;
                results.push(settle(file, outcome)?);
            }
            results
        };

        Ok(InProcessRunSummary::from_results(results))
    }

    async fn run_parallel(
        &self,
        spec_files: &[PathBuf],
        builds: &HashMap<PathBuf, BuildOutcome>,
        cancel: &CancellationToken,
    ) -> Result<Vec<InProcessRunResult>> {
        let mut set = JoinSet::new();
        let mut files_by_task = HashMap::with_capacity(spec_files.len());

        for file in spec_files {
            let runner = self.clone();
            let cancel = cancel.clone();
            let task_file = file.clone();
            let prebuilt = builds.get(&parent_dir(file)).cloned();
            let handle = set.spawn(async move {
                runner.run_prepared(&task_file, prebuilt, &cancel).await
            });
            files_by_task.insert(handle.id(), file.clone());
        }

        let mut results = Vec::with_capacity(spec_files.len());
        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    debug!(pending = set.len(), "cancellation requested; aborting spec runs");
                    set.abort_all();
                    return Err(SpecwatchError::Cancelled);
                }

                joined = set.join_next_with_id() => {
                    let Some(joined) = joined else { break };
                    match joined {
                        Ok((id, outcome)) => {
                            let file = files_by_task.remove(&id).unwrap_or_default();
                            results.push(settle(&file, outcome)?);
                        }
                        Err(join_err) => {
                            let file = files_by_task.remove(&join_err.id()).unwrap_or_default();
                            warn!(spec = %file.display(), error = %join_err, "spec run task did not complete");
                            results.push(InProcessRunResult::failed(
                                file,
                                Duration::ZERO,
                                SpecwatchError::Execution(anyhow!("spec run task failed: {join_err}")),
                            ));
                        }
                    }
                }
            }
        }

        Ok(results)
    }

    pub fn clear_build_cache(&self) {
        self.builder.clear_build_cache();
    }

    fn validate(&self, spec_file: &Path) -> Result<PathBuf> {
        match &self.validator {
            Some(validator) => validator.validate_existing_file(self.fs().as_ref(), spec_file),
            None => {
                if spec_file.as_os_str().is_empty() {
                    return Err(SpecwatchError::InvalidArgument(
                        "spec file path must not be empty".to_string(),
                    ));
                }
                if !self.fs().is_file(spec_file) {
                    return Err(SpecwatchError::FileNotFound(spec_file.to_path_buf()));
                }
                Ok(spec_file.to_path_buf())
            }
        }
    }
}

/// Keep multi-file runs going: only cancellation escapes, anything else
/// becomes a failed result for that file.
fn settle(file: &Path, outcome: Result<InProcessRunResult>) -> Result<InProcessRunResult> {
    match outcome {
        Ok(result) => Ok(result),
        Err(SpecwatchError::Cancelled) => Err(SpecwatchError::Cancelled),
        Err(err) => {
            warn!(spec = %file.display(), error = %err, "spec file rejected");
            Ok(InProcessRunResult::failed(file, Duration::ZERO, err))
        }
    }
}

fn parent_dir(file: &Path) -> PathBuf {
    match file.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
