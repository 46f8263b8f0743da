// src/lib.rs

pub mod build;
pub mod config;
pub mod diff;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod filter;
pub mod fs;
pub mod logging;
pub mod parse;
pub mod types;
pub mod validation;
pub mod watch;

use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::build::{BuildTool, CommandBuildTool, ProjectBuilder, ProjectLocator};
use crate::config::ConfigFile;
use crate::diff::SpecChangeTracker;
use crate::engine::{SessionOptions, SessionUpdate, WatchAction, WatchEventProcessor, WatchSession};
use crate::errors::{Result, SpecwatchError};
use crate::exec::{FreshRegistries, InProcessSpecRunner, RegistryFactory, ScriptExecutor};
use crate::fs::{FileSystem, RealFileSystem};
use crate::parse::StaticParser;
use crate::watch::FileWatcher;

/// External pieces the engine drives but does not implement.
#[derive(Clone)]
pub struct Collaborators {
    pub parser: Arc<dyn StaticParser>,
    pub executor: Arc<dyn ScriptExecutor>,
    pub registries: Arc<dyn RegistryFactory>,
    pub fs: Arc<dyn FileSystem>,
    /// `None` runs `[build].command` through the shell.
    pub build_tool: Option<Arc<dyn BuildTool>>,
}

impl Collaborators {
    pub fn new(parser: Arc<dyn StaticParser>, executor: Arc<dyn ScriptExecutor>) -> Self {
        Self {
            parser,
            executor,
            registries: Arc::new(FreshRegistries),
            fs: Arc::new(RealFileSystem),
            build_tool: None,
        }
    }

    pub fn with_registries(mut self, registries: Arc<dyn RegistryFactory>) -> Self {
        self.registries = registries;
        self
    }

    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_build_tool(mut self, tool: Arc<dyn BuildTool>) -> Self {
        self.build_tool = Some(tool);
        self
    }
}

/// Wire builder, runner, tracker and processor into a session rooted at
/// `project_root`.
pub fn build_session(
    project_root: &Path,
    config: &ConfigFile,
    collaborators: Collaborators,
) -> Result<WatchSession> {
    let Collaborators {
        parser,
        executor,
        registries,
        fs,
        build_tool,
    } = collaborators;

    let locator = ProjectLocator::new(fs, &config.build.project_markers)?;
    let tool = build_tool.unwrap_or_else(|| Arc::new(CommandBuildTool::new(&config.build.command)));
    let builder = Arc::new(ProjectBuilder::new(locator.clone(), tool, config.build_options()));

    let runner = InProcessSpecRunner::new(builder, executor, registries, config.run_filters())
        .with_base_dir(project_root);

    let tracker = Arc::new(SpecChangeTracker::new());
    let processor = WatchEventProcessor::new(parser, tracker, locator, config.processor_options())?;

    Ok(WatchSession::new(
        processor,
        runner,
        SessionOptions {
            project_root: project_root.to_path_buf(),
            spec_suffix: config.watch.spec_suffix.clone(),
            ignored_dirs: config.watch.ignored_dirs.clone(),
            flags: config.flags(),
            parallel: config.run.parallel,
        },
    ))
}

/// High-level entry point for embedding tools.
///
/// This wires together:
/// - the session (builder, runner, tracker, processor)
/// - the file watcher on `project_root`
/// - Ctrl-C handling
///
/// The initial full run is published as a `RunAll` update, followed by one
/// update per debounced change. Returns when `cancel` fires, on Ctrl-C, or
/// when `updates` is dropped.
pub async fn watch(
    project_root: &Path,
    config: &ConfigFile,
    collaborators: Collaborators,
    updates: mpsc::Sender<SessionUpdate>,
    cancel: CancellationToken,
) -> Result<()> {
    // Event paths are absolute; known spec paths must be too.
    let root = project_root
        .canonicalize()
        .map_err(|_| SpecwatchError::FileNotFound(project_root.to_path_buf()))?;

    let mut session = build_session(&root, config, collaborators)?;

    // Start watching before the first run so edits made meanwhile are seen.
    let (watcher, changes) = FileWatcher::spawn(&root, config.watch_options())?;

    // Cancelled on every return path, which also ends the Ctrl-C listener.
    let shutdown = cancel.child_token();
    let _stop_on_return = shutdown.clone().drop_guard();
    spawn_interrupt_listener(shutdown.clone());

    match session.start(&shutdown).await {
        Ok(summary) => {
            let initial = SessionUpdate {
                action: WatchAction::RunAll,
                summary: Some(summary),
            };
            if updates.send(initial).await.is_err() {
                return Ok(());
            }
        }
        Err(SpecwatchError::Cancelled) => return Ok(()),
        Err(err) => return Err(err),
    }

    session.run(changes, updates, shutdown.clone()).await?;
    watcher.stop();
    Ok(())
}

/// Cancel `shutdown` on Ctrl-C.
///
/// The listener task ends as soon as `shutdown` is cancelled, by a signal or
/// by anyone else.
pub fn spawn_interrupt_listener(shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                if let Err(e) = res {
                    warn!(error = %e, "failed to listen for Ctrl+C");
                    return;
                }
                info!("Ctrl+C received; shutting down");
                shutdown.cancel();
            }
            _ = shutdown.cancelled() => debug!("interrupt listener stopped"),
        }
    })
}
