// src/watch/watcher.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{Result, SpecwatchError};
use crate::watch::debounce::{ChangeBatch, ChangeClassifier, FileChangeInfo, WatchOptions};
use crate::watch::path_utils::{PathNormalizer, host_normalizer};

/// Handle for the filesystem watcher.
///
/// Dropping the handle stops the OS watch and ends the change stream; a
/// window that is still debouncing at that point is discarded.
pub struct FileWatcher {
    root: PathBuf,
    shutdown: CancellationToken,
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl FileWatcher {
    /// Watch `target` (a directory, recursively, or a single file via its
    /// parent directory) and emit one [`FileChangeInfo`] per debounce window.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(
        target: impl Into<PathBuf>,
        options: WatchOptions,
    ) -> Result<(Self, mpsc::Receiver<FileChangeInfo>)> {
        Self::spawn_with_normalizer(target, options, host_normalizer())
    }

    pub fn spawn_with_normalizer(
        target: impl Into<PathBuf>,
        options: WatchOptions,
        normalizer: Arc<dyn PathNormalizer>,
    ) -> Result<(Self, mpsc::Receiver<FileChangeInfo>)> {
        let target = target.into();
        if !target.exists() {
            return Err(SpecwatchError::FileNotFound(target));
        }
        // Canonicalize once so we have a stable base path.
        let target = target.canonicalize().unwrap_or(target);

        let (watch_dir, only_file, mode) = if target.is_file() {
            let parent = target
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| SpecwatchError::InvalidArgument(format!(
                    "cannot watch {}: no parent directory",
                    target.display()
                )))?;
            (parent, Some(normalizer.normalize(&target)), RecursiveMode::NonRecursive)
        } else {
            (target.clone(), None, RecursiveMode::Recursive)
        };

        let root = normalizer.normalize(&watch_dir);
        let debounce = options.debounce;
        let classifier = ChangeClassifier::new(root.clone(), only_file, options, normalizer);

        // Channel from the blocking notify callback into the async world.
        let (event_tx, event_rx) = mpsc::unbounded_channel::<Event>();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event_tx.send(event).is_err() {
                        debug!("watcher event loop gone; dropping notify event");
                    }
                }
                Err(err) => warn!(error = %err, "file watch error"),
            },
            Config::default(),
        )?;

        watcher.watch(&watch_dir, mode)?;
        info!(root = %root.display(), ?mode, "file watcher started");

        let (out_tx, out_rx) = mpsc::channel::<FileChangeInfo>(16);
        let shutdown = CancellationToken::new();

        tokio::spawn(debounce_loop(
            event_rx,
            classifier,
            debounce,
            out_tx,
            shutdown.clone(),
        ));

        Ok((
            Self {
                root,
                shutdown,
                _inner: watcher,
            },
            out_rx,
        ))
    }

    /// Normalized directory being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stop watching. Equivalent to dropping the handle.
    pub fn stop(self) {}
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.shutdown.cancel();
        debug!(root = %self.root.display(), "file watcher stopped");
    }
}

/// Trailing-edge debounce: every relevant event pushes the deadline out; the
/// deadline firing emits the coalesced window.
async fn debounce_loop(
    mut event_rx: mpsc::UnboundedReceiver<Event>,
    classifier: ChangeClassifier,
    debounce: std::time::Duration,
    out_tx: mpsc::Sender<FileChangeInfo>,
    shutdown: CancellationToken,
) {
    let mut batch = ChangeBatch::default();
    let timer = tokio::time::sleep(debounce);
    tokio::pin!(timer);

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => break,

            maybe_event = event_rx.recv() => {
                let Some(event) = maybe_event else { break };
                if ingest_event(&classifier, &mut batch, &event) {
                    timer.as_mut().reset(Instant::now() + debounce);
                }
            }

            _ = timer.as_mut(), if !batch.is_empty() => {
                let Some(info) = std::mem::take(&mut batch).finish() else { continue };
                debug!(?info, "debounce window closed");
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    sent = out_tx.send(info) => {
                        if sent.is_err() {
                            debug!("change receiver dropped; stopping watcher loop");
                            break;
                        }
                    }
                }
            }
        }
    }

    debug!("watcher event loop finished");
}

fn ingest_event(classifier: &ChangeClassifier, batch: &mut ChangeBatch, event: &Event) -> bool {
    // Reads and metadata-only opens must not count as changes.
    if matches!(event.kind, EventKind::Access(_)) {
        return false;
    }

    let mut relevant = false;
    for raw in &event.paths {
        let (class, path) = classifier.classify(raw);
        if batch.ingest(class, path) {
            relevant = true;
        }
    }
    relevant
}
