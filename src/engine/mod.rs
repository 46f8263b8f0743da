// src/engine/mod.rs

//! Watch decision engine.
//!
//! [`processor`] turns one debounced change into exactly one [`WatchAction`];
//! [`session`] applies those actions against the runner and owns the tracked
//! baselines' lifecycle.

pub mod processor;
pub mod session;

use std::path::PathBuf;

use crate::parse::StaticParseResult;

pub use processor::{ProcessorOptions, WatchEventProcessor, build_filter_pattern};
pub use session::{SessionOptions, SessionUpdate, WatchSession};

/// What to do about a file-system change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchAction {
    /// Nothing to run.
    Skip { message: Option<String> },
    /// Re-discover spec files and run all of them.
    RunAll,
    /// Run every spec in one file.
    RunFile {
        file_path: PathBuf,
        message: Option<String>,
        /// Baseline to record once the run succeeds; `None` for files that
        /// can't be diffed.
        parse_result_to_record: Option<StaticParseResult>,
    },
    /// Run only the specs whose description matches `filter_pattern`.
    RunFiltered {
        file_path: PathBuf,
        filter_pattern: String,
        message: String,
        parse_result_to_record: StaticParseResult,
    },
}

impl WatchAction {
    pub fn skip() -> Self {
        WatchAction::Skip { message: None }
    }

    pub fn run_file(file_path: impl Into<PathBuf>) -> Self {
        WatchAction::RunFile {
            file_path: file_path.into(),
            message: None,
            parse_result_to_record: None,
        }
    }

    /// Human-readable reason, if the action carries one.
    pub fn message(&self) -> Option<&str> {
        match self {
            WatchAction::Skip { message } | WatchAction::RunFile { message, .. } => {
                message.as_deref()
            }
            WatchAction::RunFiltered { message, .. } => Some(message),
            WatchAction::RunAll => None,
        }
    }

    pub fn file_path(&self) -> Option<&PathBuf> {
        match self {
            WatchAction::RunFile { file_path, .. } | WatchAction::RunFiltered { file_path, .. } => {
                Some(file_path)
            }
            _ => None,
        }
    }
}
