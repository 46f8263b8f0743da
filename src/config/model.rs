// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::build::BuildOptions;
use crate::engine::ProcessorOptions;
use crate::filter::{FilterOptions, RunFilters};
use crate::logging::LogLevel;
use crate::types::WatchFlags;
use crate::watch::WatchOptions;

/// Configuration as read from `specwatch.toml`, before validation.
///
/// ```toml
/// [watch]
/// debounce_ms = 300
/// spec_suffix = ".spec.csx"
///
/// [run]
/// incremental = true
/// parallel = false
///
/// [build]
/// project_markers = ["*.csproj"]
/// command = "dotnet build --nologo"
///
/// [dependencies]
/// globs = ["**/*.csx"]
///
/// [filters]
/// exclude_tags = ["slow"]
/// ```
///
/// Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub watch: WatchSection,
    #[serde(default)]
    pub run: RunSection,
    #[serde(default)]
    pub build: BuildSection,
    #[serde(default)]
    pub dependencies: DependenciesSection,
    #[serde(default)]
    pub filters: FilterOptions,
}

/// Validated configuration. Obtain one via `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub watch: WatchSection,
    pub run: RunSection,
    pub build: BuildSection,
    pub dependencies: DependenciesSection,
    pub filters: FilterOptions,
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// Quiet period in milliseconds; must be > 0.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default = "default_spec_suffix")]
    pub spec_suffix: String,

    /// Non-spec files with these extensions escalate to a full run.
    #[serde(default = "default_watch_extensions")]
    pub source_extensions: Vec<String>,

    /// Directory names never watched, scanned or discovered into.
    #[serde(default = "default_ignored_dirs")]
    pub ignored_dirs: Vec<String>,
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_spec_suffix() -> String {
    WatchOptions::default().spec_suffix
}

fn default_watch_extensions() -> Vec<String> {
    WatchOptions::default().source_extensions
}

fn default_ignored_dirs() -> Vec<String> {
    WatchOptions::default().ignored_dirs
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            spec_suffix: default_spec_suffix(),
            source_extensions: default_watch_extensions(),
            ignored_dirs: default_ignored_dirs(),
        }
    }
}

/// `[run]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RunSection {
    #[serde(default = "default_true")]
    pub incremental: bool,

    #[serde(default)]
    pub no_cache: bool,

    #[serde(default)]
    pub parallel: bool,

    #[serde(default)]
    pub log_level: Option<LogLevel>,
}

fn default_true() -> bool {
    true
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            incremental: true,
            no_cache: false,
            parallel: false,
            log_level: None,
        }
    }
}

/// `[build]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildSection {
    /// File-name globs identifying a project descriptor.
    #[serde(default = "default_project_markers")]
    pub project_markers: Vec<String>,

    /// Shell command run in the project directory.
    #[serde(default = "default_build_command")]
    pub command: String,

    #[serde(default = "default_build_extensions")]
    pub source_extensions: Vec<String>,

    /// Candidate artifact directories relative to the project.
    #[serde(default = "default_output_dirs")]
    pub output_dirs: Vec<String>,
}

fn default_project_markers() -> Vec<String> {
    vec!["*.csproj".to_string()]
}

fn default_build_command() -> String {
    "dotnet build --nologo".to_string()
}

fn default_build_extensions() -> Vec<String> {
    BuildOptions::default().source_extensions
}

fn default_output_dirs() -> Vec<String> {
    BuildOptions::default().output_dirs
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            project_markers: default_project_markers(),
            command: default_build_command(),
            source_extensions: default_build_extensions(),
            output_dirs: default_output_dirs(),
        }
    }
}

/// `[dependencies]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DependenciesSection {
    /// Globs, relative to the project directory, of shared helper files.
    #[serde(default = "default_dependency_globs")]
    pub globs: Vec<String>,
}

fn default_dependency_globs() -> Vec<String> {
    ProcessorOptions::default().dependency_globs
}

impl Default for DependenciesSection {
    fn default() -> Self {
        Self {
            globs: default_dependency_globs(),
        }
    }
}

impl ConfigFile {
    /// Only for use after validation.
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            watch: raw.watch,
            run: raw.run,
            build: raw.build,
            dependencies: raw.dependencies,
            filters: raw.filters,
        }
    }

    pub fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            debounce: Duration::from_millis(self.watch.debounce_ms),
            spec_suffix: self.watch.spec_suffix.clone(),
            source_extensions: self.watch.source_extensions.clone(),
            ignored_dirs: self.watch.ignored_dirs.clone(),
        }
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            source_extensions: self.build.source_extensions.clone(),
            ignored_dirs: self.watch.ignored_dirs.clone(),
            output_dirs: self.build.output_dirs.clone(),
        }
    }

    pub fn processor_options(&self) -> ProcessorOptions {
        ProcessorOptions {
            spec_suffix: self.watch.spec_suffix.clone(),
            dependency_globs: self.dependencies.globs.clone(),
            ignored_dirs: self.watch.ignored_dirs.clone(),
        }
    }

    pub fn flags(&self) -> WatchFlags {
        WatchFlags {
            incremental: self.run.incremental,
            no_cache: self.run.no_cache,
        }
    }

    pub fn run_filters(&self) -> RunFilters {
        RunFilters::from_options(&self.filters)
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(RawConfigFile::default())
    }
}
