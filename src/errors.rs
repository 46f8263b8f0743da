// src/errors.rs

//! Crate-wide error type and aliases.
//!
//! The variants follow how callers are expected to react:
//! - `Security` / `InvalidArgument` / `FileNotFound` are raised before any
//!   filesystem access and surfaced verbatim.
//! - `Compilation` carries a rendered source excerpt so tooling can show it
//!   differently from runtime failures.
//! - `Execution` and `Build` are normally *recorded* inside a run result
//!   rather than returned.
//! - `Cancelled` always propagates.

use std::path::PathBuf;

use thiserror::Error;

use crate::exec::diagnostics::CompilationFailure;

#[derive(Error, Debug)]
pub enum SpecwatchError {
    #[error("Security violation: {0}")]
    Security(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("{0}")]
    Compilation(Box<CompilationFailure>),

    #[error("Execution failed: {0:#}")]
    Execution(anyhow::Error),

    #[error("Build failed for {}: {output}", project.display())]
    Build { project: PathBuf, output: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("File watch error: {0}")]
    WatchError(#[from] notify::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SpecwatchError {
    /// True for failures that happened while compiling a spec script.
    pub fn is_compilation(&self) -> bool {
        matches!(self, SpecwatchError::Compilation(_))
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SpecwatchError>;
