// src/exec/executor.rs

//! Seam to the external script executor.

use std::path::Path;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::exec::diagnostics::CompileDiagnostic;
use crate::exec::registry::SpecRegistry;
use crate::exec::report::RootContext;
use crate::filter::RunFilters;
use crate::types::BoxFuture;

/// Why the executor could not produce a context.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("compilation failed: {}", .0.message)]
    Compilation(CompileDiagnostic),

    #[error("execution cancelled")]
    Cancelled,

    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

/// Everything the executor needs for one file.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionRequest<'a> {
    pub spec_file: &'a Path,
    /// Where compiled project artifacts live (for script references).
    pub output_dir: &'a Path,
    /// Registry the file's declarations go into; already reset.
    pub registry: &'a dyn SpecRegistry,
    /// Filters the executor must apply when choosing which specs to run.
    pub filters: &'a RunFilters,
    pub cancel: &'a CancellationToken,
}

/// Compiles and runs one spec file.
///
/// Returns the root context of what ran, or `None` if the file declared
/// nothing.
pub trait ScriptExecutor: Send + Sync {
    fn execute<'a>(
        &'a self,
        request: ExecutionRequest<'a>,
    ) -> BoxFuture<'a, Result<Option<RootContext>, ExecutorError>>;
}
