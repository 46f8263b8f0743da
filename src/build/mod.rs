// src/build/mod.rs

//! Build staleness tracking and invocation.
//!
//! - [`cache`] keeps the per-directory staleness ledger.
//! - [`project`] finds the project descriptor above a spec directory.
//! - [`tool`] is the seam to the external build tool.
//! - [`builder`] ties them together and publishes [`BuildEvent`]s.

pub mod builder;
pub mod cache;
pub mod project;
pub mod tool;

pub use builder::{BuildEvent, BuildOptions, BuildOutcome, BuildResult, ProjectBuilder};
pub use cache::{BuildCache, BuildCacheEntry};
pub use project::ProjectLocator;
pub use tool::{BuildOutput, BuildTool, CommandBuildTool};
