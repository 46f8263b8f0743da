// src/types.rs

//! Small shared types used across modules.

use std::future::Future;
use std::pin::Pin;

/// Boxed, sendable future returned by the collaborator traits
/// (`StaticParser`, `ScriptExecutor`, `BuildTool`).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Flags the embedding tool passes to the watch decision layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchFlags {
    /// Diff static snapshots and only rerun changed specs.
    pub incremental: bool,
    /// Don't trust cached state (tracked snapshots, build cache).
    pub no_cache: bool,
}

impl Default for WatchFlags {
    fn default() -> Self {
        Self {
            incremental: true,
            no_cache: false,
        }
    }
}
