// src/engine/session.rs

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::{WatchAction, WatchEventProcessor};
use crate::errors::{Result, SpecwatchError};
use crate::exec::{InProcessRunSummary, InProcessSpecRunner};
use crate::fs::walk_files;
use crate::parse::StaticParseResult;
use crate::types::WatchFlags;
use crate::watch::FileChangeInfo;

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub project_root: PathBuf,
    pub spec_suffix: String,
    pub ignored_dirs: Vec<String>,
    pub flags: WatchFlags,
    pub parallel: bool,
}

/// Published once per processed change.
#[derive(Debug)]
pub struct SessionUpdate {
    pub action: WatchAction,
    /// `None` when nothing ran.
    pub summary: Option<InProcessRunSummary>,
}

/// Applies [`WatchAction`]s: owns the known spec list and decides when a
/// parse result becomes the tracked baseline (only after a successful run).
/// Dependency times are accepted after a full run, or with a single file's
/// baseline.
#[derive(Debug)]
pub struct WatchSession {
    processor: WatchEventProcessor,
    runner: InProcessSpecRunner,
    options: SessionOptions,
    known_specs: Vec<PathBuf>,
}

impl WatchSession {
    pub fn new(processor: WatchEventProcessor, runner: InProcessSpecRunner, options: SessionOptions) -> Self {
        Self {
            processor,
            runner,
            options,
            known_specs: Vec::new(),
        }
    }

    pub fn known_specs(&self) -> &[PathBuf] {
        &self.known_specs
    }

    pub fn processor(&self) -> &WatchEventProcessor {
        &self.processor
    }

    fn tracks_baselines(&self) -> bool {
        self.options.flags.incremental && !self.options.flags.no_cache
    }

    /// Re-enumerate spec files under the project root.
    pub fn discover_specs(&mut self) -> Result<&[PathBuf]> {
        let fs = self.runner.builder().locator().fs().clone();
        let suffix = self.options.spec_suffix.as_str();
        let found = walk_files(
            fs.as_ref(),
            &self.options.project_root,
            &self.options.ignored_dirs,
            |path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(suffix))
            },
        )?;
        debug!(root = %self.options.project_root.display(), specs = found.len(), "discovered spec files");
        self.known_specs = found;
        Ok(&self.known_specs)
    }

    /// Initial run: discover, run everything, then record baselines and
    /// dependency times.
    pub async fn start(&mut self, cancel: &CancellationToken) -> Result<InProcessRunSummary> {
        self.discover_specs()?;
        info!(specs = self.known_specs.len(), "starting watch session");
        self.run_everything(cancel).await
    }

    pub async fn handle_change(
        &mut self,
        change: &FileChangeInfo,
        cancel: &CancellationToken,
    ) -> Result<SessionUpdate> {
        let action = self
            .processor
            .process(
                change,
                &self.known_specs,
                &self.options.project_root,
                self.options.flags,
                cancel,
            )
            .await;

        if let Some(message) = action.message() {
            info!(file = ?change.file_path, reason = message, "watch action decided");
        }

        let summary = match &action {
            WatchAction::Skip { .. } => None,
            WatchAction::RunAll => {
                self.discover_specs()?;
                Some(self.run_everything(cancel).await?)
            }
            WatchAction::RunFile {
                file_path,
                parse_result_to_record,
                ..
            } => {
                let summary = self.run_one(&self.runner, file_path, cancel).await?;
                self.record_if_successful(file_path, parse_result_to_record.as_ref(), &summary);
                Some(summary)
            }
            WatchAction::RunFiltered {
                file_path,
                filter_pattern,
                parse_result_to_record,
                ..
            } => {
                let filtered = self
                    .runner
                    .with_filters(self.runner.filters().with_name_pattern(filter_pattern));
                let summary = self.run_one(&filtered, file_path, cancel).await?;
                self.record_if_successful(file_path, Some(parse_result_to_record), &summary);
                Some(summary)
            }
        };

        Ok(SessionUpdate { action, summary })
    }

    /// Process changes until the stream ends, the receiver of updates goes
    /// away, or `cancel` fires.
    pub async fn run(
        mut self,
        mut changes: mpsc::Receiver<FileChangeInfo>,
        updates: mpsc::Sender<SessionUpdate>,
        cancel: CancellationToken,
    ) -> Result<()> {
        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    debug!("watch session cancelled");
                    break;
                }

                change = changes.recv() => {
                    let Some(change) = change else {
                        debug!("change stream closed; stopping watch session");
                        break;
                    };
                    match self.handle_change(&change, &cancel).await {
                        Ok(update) => {
                            if updates.send(update).await.is_err() {
                                debug!("update receiver dropped; stopping watch session");
                                break;
                            }
                        }
                        Err(SpecwatchError::Cancelled) => break,
                        Err(err) => warn!(error = %err, "failed to handle change"),
                    }
                }
            }
        }
        Ok(())
    }

    async fn run_everything(&self, cancel: &CancellationToken) -> Result<InProcessRunSummary> {
        if self.options.flags.no_cache {
            self.runner.clear_build_cache();
        }
        // Times from before the run: a helper edited mid-run still counts as changed.
        let dependencies = self.tracks_baselines().then(|| {
            self.processor
                .dependency_times(&self.options.project_root, &self.known_specs)
        });
        let summary = self
            .runner
            .run_all(&self.known_specs, self.options.parallel, cancel)
            .await?;

        if let Some(dependencies) = dependencies {
            self.processor.record_dependency_times(dependencies);
            self.refresh_baselines(&summary, cancel).await;
        }
        Ok(summary)
    }

    async fn run_one(
        &self,
        runner: &InProcessSpecRunner,
        file: &Path,
        cancel: &CancellationToken,
    ) -> Result<InProcessRunSummary> {
        if self.options.flags.no_cache {
            runner.clear_build_cache();
        }
        let files = [file.to_path_buf()];
        runner.run_all(&files, false, cancel).await
    }

    fn record_if_successful(
        &self,
        file: &Path,
        parsed: Option<&StaticParseResult>,
        summary: &InProcessRunSummary,
    ) {
        let Some(parsed) = parsed else { return };
        if !self.tracks_baselines() {
            return;
        }
        if summary.success() {
            self.processor.tracker().record_state(file, parsed.clone());
            self.processor
                .record_dependencies(file, &self.options.project_root, &self.known_specs);
        } else {
            debug!(file = %file.display(), "run failed; keeping previous baseline");
        }
    }

    /// Parse every successfully run file and make it the new baseline.
    async fn refresh_baselines(&self, summary: &InProcessRunSummary, cancel: &CancellationToken) {
        for result in summary.results.iter().filter(|r| r.success()) {
            if cancel.is_cancelled() {
                return;
            }
            self.processor.record_baseline(&result.spec_file, cancel).await;
        }
    }
}
