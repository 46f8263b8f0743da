// src/exec/mod.rs

//! In-process execution layer.
//!
//! - [`executor`] is the seam to the external script executor.
//! - [`registry`] holds the per-execution test-registration state.
//! - [`diagnostics`] renders compilation failures with source context.
//! - [`report`] defines per-file results and multi-file summaries.
//! - [`runner`] drives build → reset → execute → reset → collect.

pub mod diagnostics;
pub mod executor;
pub mod registry;
pub mod report;
pub mod runner;

pub use diagnostics::{CompilationFailure, CompileDiagnostic};
pub use executor::{ExecutionRequest, ExecutorError, ScriptExecutor};
pub use registry::{DeclaredSpec, FreshRegistries, InMemoryRegistry, RegistryFactory, SpecRegistry};
pub use report::{
    ContextNode, InProcessRunResult, InProcessRunSummary, ReportSummary, RootContext, SpecOutcome,
    SpecReport, SpecResult, SpecStatus,
};
pub use runner::InProcessSpecRunner;
