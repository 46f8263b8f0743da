#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use tokio_util::sync::CancellationToken;

use specwatch::build::{BuildOutput, BuildTool};
use specwatch::errors::{Result, SpecwatchError};
use specwatch::exec::{
    CompileDiagnostic, ContextNode, DeclaredSpec, ExecutionRequest, ExecutorError,
    InMemoryRegistry, RegistryFactory, RootContext, ScriptExecutor, SpecRegistry,
};
use specwatch::filter::SpecCandidate;
use specwatch::parse::{StaticParseResult, StaticParser};
use specwatch::types::BoxFuture;

/// Static parser backed by a map of canned results.
///
/// Unknown files parse as an empty, complete result.
#[derive(Default)]
pub struct FakeParser {
    results: Mutex<HashMap<PathBuf, std::result::Result<StaticParseResult, String>>>,
    parses: AtomicUsize,
}

impl FakeParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, path: impl Into<PathBuf>, result: StaticParseResult) {
        self.results.lock().unwrap().insert(path.into(), Ok(result));
    }

    pub fn fail(&self, path: impl Into<PathBuf>, message: &str) {
        self.results
            .lock()
            .unwrap()
            .insert(path.into(), Err(message.to_string()));
    }

    pub fn parse_count(&self) -> usize {
        self.parses.load(Ordering::SeqCst)
    }
}

impl StaticParser for FakeParser {
    fn parse_file<'a>(
        &'a self,
        path: &'a Path,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<StaticParseResult>> {
        Box::pin(async move {
            if cancel.is_cancelled() {
                return Err(SpecwatchError::Cancelled);
            }
            self.parses.fetch_add(1, Ordering::SeqCst);
            match self.results.lock().unwrap().get(path) {
                Some(Ok(result)) => Ok(result.clone()),
                Some(Err(message)) => Err(SpecwatchError::Other(anyhow!(message.clone()))),
                None => Ok(StaticParseResult::complete(Vec::new())),
            }
        })
    }
}

/// What the fake executor does for a file.
#[derive(Debug, Clone)]
pub enum FakeOutcome {
    Context(RootContext),
    Empty,
    Compilation(CompileDiagnostic),
    Fail(String),
    Cancelled,
    Panic,
}

/// One recorded `execute` call.
#[derive(Debug, Clone)]
pub struct ExecutedCall {
    pub spec_file: PathBuf,
    pub output_dir: PathBuf,
    pub name_patterns: Vec<String>,
    pub changed_pattern: Option<String>,
    /// Whether the registry was empty when execution started.
    pub registry_was_clean: bool,
}

/// Script executor with canned per-file outcomes.
///
/// Specs in a returned context pass through the request's filters, like a
/// real filtered runner. Every spec that runs is also declared in the
/// registry.
pub struct FakeExecutor {
    outcomes: Mutex<HashMap<PathBuf, FakeOutcome>>,
    default_outcome: Mutex<FakeOutcome>,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<ExecutedCall>>,
}

impl Default for FakeExecutor {
    fn default() -> Self {
        Self {
            outcomes: Mutex::new(HashMap::new()),
            default_outcome: Mutex::new(FakeOutcome::Context(crate::builders::root_counts(1, 0))),
            delay: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, path: impl Into<PathBuf>, outcome: FakeOutcome) {
        self.outcomes.lock().unwrap().insert(path.into(), outcome);
    }

    pub fn set_default(&self, outcome: FakeOutcome) {
        *self.default_outcome.lock().unwrap() = outcome;
    }

    /// Every execution sleeps this long (cancellable) before finishing.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> Vec<ExecutedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn executed_files(&self) -> Vec<PathBuf> {
        self.calls().into_iter().map(|c| c.spec_file).collect()
    }

    fn outcome_for(&self, path: &Path) -> FakeOutcome {
        self.outcomes
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .unwrap_or_else(|| self.default_outcome.lock().unwrap().clone())
    }
}

impl ScriptExecutor for FakeExecutor {
    fn execute<'a>(
        &'a self,
        request: ExecutionRequest<'a>,
    ) -> BoxFuture<'a, std::result::Result<Option<RootContext>, ExecutorError>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(ExecutedCall {
                spec_file: request.spec_file.to_path_buf(),
                output_dir: request.output_dir.to_path_buf(),
                name_patterns: request
                    .filters
                    .name_patterns()
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
                changed_pattern: request.filters.changed_spec_pattern().map(str::to_string),
                registry_was_clean: request.registry.declared().is_empty(),
            });

            let delay = *self.delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::select! {
                    _ = request.cancel.cancelled() => return Err(ExecutorError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            match self.outcome_for(request.spec_file) {
                FakeOutcome::Context(root) => {
                    let mut path = Vec::new();
                    Ok(Some(run_filtered(&root, &request, &mut path)))
                }
                FakeOutcome::Empty => Ok(None),
                FakeOutcome::Compilation(diag) => Err(ExecutorError::Compilation(diag)),
                FakeOutcome::Fail(message) => Err(ExecutorError::Failed(anyhow!(message))),
                FakeOutcome::Cancelled => Err(ExecutorError::Cancelled),
                FakeOutcome::Panic => panic!("script executor panicked"),
            }
        })
    }
}

fn run_filtered(node: &ContextNode, request: &ExecutionRequest<'_>, path: &mut Vec<String>) -> ContextNode {
    let named = !node.description.is_empty();
    if named {
        path.push(node.description.clone());
    }

    let mut out = ContextNode::new(node.description.clone());
    for spec in &node.specs {
        let candidate = SpecCandidate {
            description: &spec.description,
            context_path: path,
            tags: &[],
        };
        if request.filters.allows(candidate) {
            request.registry.register(DeclaredSpec {
                context_path: path.clone(),
                description: spec.description.clone(),
                tags: Vec::new(),
            });
            out.specs.push(spec.clone());
        }
    }
    for child in &node.children {
        out.children.push(run_filtered(child, request, path));
    }

    if named {
        path.pop();
    }
    out
}

/// Registry that counts resets.
#[derive(Debug, Default)]
pub struct CountingRegistry {
    inner: InMemoryRegistry,
    resets: AtomicUsize,
}

impl CountingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

impl SpecRegistry for CountingRegistry {
    fn register(&self, spec: DeclaredSpec) {
        self.inner.register(spec);
    }

    fn declared(&self) -> Vec<DeclaredSpec> {
        self.inner.declared()
    }

    fn reset(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
        self.inner.reset();
    }
}

/// Factory handing out the same registry every time.
pub fn shared_registry(registry: Arc<CountingRegistry>) -> Arc<dyn RegistryFactory> {
    Arc::new(move || -> Arc<dyn SpecRegistry> { registry.clone() })
}

/// Factory that hands out fresh counting registries and remembers them.
#[derive(Default)]
pub struct CountingRegistries {
    created: Mutex<Vec<Arc<CountingRegistry>>>,
}

impl CountingRegistries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&self) -> Vec<Arc<CountingRegistry>> {
        self.created.lock().unwrap().clone()
    }
}

impl RegistryFactory for CountingRegistries {
    fn create(&self) -> Arc<dyn SpecRegistry> {
        let registry = Arc::new(CountingRegistry::new());
        self.created.lock().unwrap().push(registry.clone());
        registry
    }
}

/// Build tool that never spawns anything.
pub struct FakeBuildTool {
    exit_code: AtomicI32,
    builds: Mutex<Vec<PathBuf>>,
    fail_to_start: Mutex<bool>,
}

impl Default for FakeBuildTool {
    fn default() -> Self {
        Self {
            exit_code: AtomicI32::new(0),
            builds: Mutex::new(Vec::new()),
            fail_to_start: Mutex::new(false),
        }
    }
}

impl FakeBuildTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_exit_code(&self, code: i32) {
        self.exit_code.store(code, Ordering::SeqCst);
    }

    pub fn set_fail_to_start(&self, fail: bool) {
        *self.fail_to_start.lock().unwrap() = fail;
    }

    pub fn build_count(&self) -> usize {
        self.builds.lock().unwrap().len()
    }

    pub fn built_projects(&self) -> Vec<PathBuf> {
        self.builds.lock().unwrap().clone()
    }
}

impl BuildTool for FakeBuildTool {
    fn build<'a>(&'a self, project_dir: &'a Path) -> BoxFuture<'a, anyhow::Result<BuildOutput>> {
        Box::pin(async move {
            self.builds.lock().unwrap().push(project_dir.to_path_buf());
            if *self.fail_to_start.lock().unwrap() {
                return Err(anyhow!("build tool not found"));
            }
            let exit_code = self.exit_code.load(Ordering::SeqCst);
            Ok(BuildOutput {
                exit_code,
                stdout: format!("building {}", project_dir.display()),
                stderr: if exit_code == 0 {
                    String::new()
                } else {
                    "error CS1002: ; expected".to_string()
                },
            })
        })
    }
}
