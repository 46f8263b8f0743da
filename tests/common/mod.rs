#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use specwatch::Collaborators;
use specwatch::build::{BuildOptions, ProjectBuilder, ProjectLocator};
use specwatch::diff::SpecChangeTracker;
use specwatch::engine::{ProcessorOptions, WatchEventProcessor};
use specwatch::exec::InProcessSpecRunner;
use specwatch::filter::RunFilters;
use specwatch::fs::mock::MockFileSystem;
use specwatch::watch::IdentityNormalizer;

pub use specwatch_test_utils::fakes::{
    CountingRegistries, CountingRegistry, FakeBuildTool, FakeExecutor, FakeOutcome, FakeParser,
    shared_registry,
};
pub use specwatch_test_utils::{builders, init_tracing, with_timeout};

pub const PROJECT: &str = "/proj";

/// Fixed point in time plus `secs`, so mtimes compare predictably.
pub fn at(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(1_700_000_000 + secs)
}

/// In-memory project at `/proj` with fake collaborators.
///
/// Layout: `/proj/App.csproj` and `/proj/src/Calculator.cs`, both at `at(0)`.
pub struct Harness {
    pub fs: MockFileSystem,
    pub parser: Arc<FakeParser>,
    pub executor: Arc<FakeExecutor>,
    pub tool: Arc<FakeBuildTool>,
    pub registries: Arc<CountingRegistries>,
}

impl Harness {
    pub fn new() -> Self {
        let fs = MockFileSystem::new();
        fs.add_file_with_mtime(project_path("App.csproj"), "<Project />", at(0));
        fs.add_file_with_mtime(project_path("src/Calculator.cs"), "class Calculator {}", at(0));
        Self {
            fs,
            parser: Arc::new(FakeParser::new()),
            executor: Arc::new(FakeExecutor::new()),
            tool: Arc::new(FakeBuildTool::new()),
            registries: Arc::new(CountingRegistries::new()),
        }
    }

    /// Add a spec file under the project and return its absolute path.
    pub fn add_spec(&self, rel: &str, content: &str) -> PathBuf {
        let path = project_path(rel);
        self.fs.add_file_with_mtime(&path, content, at(1));
        path
    }

    pub fn locator(&self) -> ProjectLocator {
        ProjectLocator::new(Arc::new(self.fs.clone()), &["*.csproj".to_string()])
            .expect("valid marker globs")
    }

    pub fn builder(&self) -> Arc<ProjectBuilder> {
        Arc::new(ProjectBuilder::new(
            self.locator(),
            self.tool.clone(),
            BuildOptions::default(),
        ))
    }

    pub fn runner(&self) -> InProcessSpecRunner {
        InProcessSpecRunner::new(
            self.builder(),
            self.executor.clone(),
            self.registries.clone(),
            RunFilters::none(),
        )
    }

    pub fn processor(&self, tracker: Arc<SpecChangeTracker>) -> WatchEventProcessor {
        WatchEventProcessor::new(
            self.parser.clone(),
            tracker,
            self.locator(),
            ProcessorOptions::default(),
        )
        .expect("valid dependency globs")
        .with_normalizer(Arc::new(IdentityNormalizer))
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators::new(self.parser.clone(), self.executor.clone())
            .with_fs(Arc::new(self.fs.clone()))
            .with_registries(self.registries.clone())
            .with_build_tool(self.tool.clone())
    }
}

pub fn project_path(rel: &str) -> PathBuf {
    Path::new(PROJECT).join(rel)
}
