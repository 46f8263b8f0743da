// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Ignoring editor noise and build output.
//! - Coalescing a burst of events into exactly one [`FileChangeInfo`].
//!
//! It does **not** know about specs or diffs; it only says "this one spec file
//! changed" or "something broader changed".

pub mod debounce;
pub mod path_utils;
pub mod watcher;

pub use debounce::{ChangeBatch, ChangeClassifier, FileChangeInfo, PathClass, WatchOptions};
pub use path_utils::{
    IdentityNormalizer, PathNormalizer, PrivatePrefixNormalizer, host_normalizer, path_key,
};
pub use watcher::FileWatcher;
