// src/exec/report.rs

//! Run results: what the executor hands back, and what the runner returns.

use std::ops::{Add, AddAssign};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::SpecwatchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecStatus {
    Passed,
    Failed,
    Pending,
    Skipped,
}

/// One executed spec inside a context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecOutcome {
    pub description: String,
    pub status: SpecStatus,
    pub duration: Duration,
    pub error: Option<String>,
}

impl SpecOutcome {
    pub fn new(description: impl Into<String>, status: SpecStatus) -> Self {
        Self {
            description: description.into(),
            status,
            duration: Duration::ZERO,
            error: None,
        }
    }
}

/// Context tree produced by the script executor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextNode {
    pub description: String,
    pub specs: Vec<SpecOutcome>,
    pub children: Vec<ContextNode>,
}

/// The root of an executed file. Its description is usually empty.
pub type RootContext = ContextNode;

impl ContextNode {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn with_spec(mut self, spec: SpecOutcome) -> Self {
        self.specs.push(spec);
        self
    }

    pub fn with_child(mut self, child: ContextNode) -> Self {
        self.children.push(child);
        self
    }
}

/// Flattened spec result with its context path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecResult {
    pub context_path: Vec<String>,
    pub description: String,
    pub status: SpecStatus,
    pub duration: Duration,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub pending: usize,
    pub skipped: usize,
}

impl ReportSummary {
    pub fn new(total: usize, passed: usize, failed: usize, pending: usize, skipped: usize) -> Self {
        Self {
            total,
            passed,
            failed,
            pending,
            skipped,
        }
    }

    fn count(&mut self, status: SpecStatus) {
        self.total += 1;
        match status {
            SpecStatus::Passed => self.passed += 1,
            SpecStatus::Failed => self.failed += 1,
            SpecStatus::Pending => self.pending += 1,
            SpecStatus::Skipped => self.skipped += 1,
        }
    }
}

impl Add for ReportSummary {
    type Output = ReportSummary;

    fn add(self, rhs: ReportSummary) -> ReportSummary {
        ReportSummary {
            total: self.total + rhs.total,
            passed: self.passed + rhs.passed,
            failed: self.failed + rhs.failed,
            pending: self.pending + rhs.pending,
            skipped: self.skipped + rhs.skipped,
        }
    }
}

impl AddAssign for ReportSummary {
    fn add_assign(&mut self, rhs: ReportSummary) {
        *self = *self + rhs;
    }
}

/// Per-file report handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecReport {
    pub spec_file: PathBuf,
    pub results: Vec<SpecResult>,
    pub summary: ReportSummary,
}

impl SpecReport {
    pub fn empty(spec_file: impl Into<PathBuf>) -> Self {
        Self {
            spec_file: spec_file.into(),
            results: Vec::new(),
            summary: ReportSummary::default(),
        }
    }

    /// Report for a file that could not run at all: one failure.
    pub fn failed(spec_file: impl Into<PathBuf>) -> Self {
        Self {
            spec_file: spec_file.into(),
            results: Vec::new(),
            summary: ReportSummary::new(1, 0, 1, 0, 0),
        }
    }

    pub fn from_context(spec_file: &Path, root: &RootContext) -> Self {
        let mut report = Self::empty(spec_file);
        let mut path = Vec::new();
        report.collect(root, &mut path);
        report
    }

    fn collect(&mut self, node: &ContextNode, path: &mut Vec<String>) {
        let named = !node.description.is_empty();
        if named {
            path.push(node.description.clone());
        }

        for spec in &node.specs {
            self.summary.count(spec.status);
            self.results.push(SpecResult {
                context_path: path.clone(),
                description: spec.description.clone(),
                status: spec.status,
                duration: spec.duration,
                error: spec.error.clone(),
            });
        }
        for child in &node.children {
            self.collect(child, path);
        }

        if named {
            path.pop();
        }
    }
}

/// Outcome of running one spec file.
#[derive(Debug)]
pub struct InProcessRunResult {
    pub spec_file: PathBuf,
    pub report: SpecReport,
    pub duration: Duration,
    pub error: Option<SpecwatchError>,
}

impl InProcessRunResult {
    pub fn completed(spec_file: impl Into<PathBuf>, report: SpecReport, duration: Duration) -> Self {
        Self {
            spec_file: spec_file.into(),
            report,
            duration,
            error: None,
        }
    }

    /// A file that failed before producing results.
    pub fn failed(spec_file: impl Into<PathBuf>, duration: Duration, error: SpecwatchError) -> Self {
        let spec_file = spec_file.into();
        Self {
            report: SpecReport::failed(&spec_file),
            spec_file,
            duration,
            error: Some(error),
        }
    }

    pub fn success(&self) -> bool {
        self.error.is_none() && self.report.summary.failed == 0
    }

    pub fn is_compilation_failure(&self) -> bool {
        self.error.as_ref().is_some_and(SpecwatchError::is_compilation)
    }
}

/// Aggregate over several files.
#[derive(Debug, Default)]
pub struct InProcessRunSummary {
    pub results: Vec<InProcessRunResult>,
    /// Sum of per-file durations (not wall-clock).
    pub total_duration: Duration,
}

impl InProcessRunSummary {
    pub fn from_results(results: Vec<InProcessRunResult>) -> Self {
        let total_duration = results.iter().map(|r| r.duration).sum();
        Self {
            results,
            total_duration,
        }
    }

    pub fn totals(&self) -> ReportSummary {
        self.results
            .iter()
            .fold(ReportSummary::default(), |acc, r| acc + r.report.summary)
    }

    pub fn total_specs(&self) -> usize {
        self.totals().total
    }

    pub fn passed(&self) -> usize {
        self.totals().passed
    }

    pub fn failed(&self) -> usize {
        self.totals().failed
    }

    pub fn pending(&self) -> usize {
        self.totals().pending
    }

    pub fn skipped(&self) -> usize {
        self.totals().skipped
    }

    pub fn success(&self) -> bool {
        self.results.iter().all(InProcessRunResult::success)
    }

    /// Combine two summaries (e.g. an incremental run and a follow-up).
    pub fn merge(mut self, other: InProcessRunSummary) -> Self {
        self.results.extend(other.results);
        self.total_duration += other.total_duration;
        self
    }
}
