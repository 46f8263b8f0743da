// src/watch/path_utils.rs

//! Utility functions for path handling in the watcher and trackers.

use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Strategy for rewriting OS-reported paths into a stable form before they are
/// compared with user-supplied paths.
pub trait PathNormalizer: Send + Sync + Debug {
    fn normalize(&self, path: &Path) -> PathBuf;
}

/// Leaves paths untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityNormalizer;

impl PathNormalizer for IdentityNormalizer {
    fn normalize(&self, path: &Path) -> PathBuf {
        path.to_path_buf()
    }
}

/// macOS reports watched temp/var directories under `/private` (`/var` is a
/// symlink to `/private/var`). Strip that prefix so event paths line up with
/// the paths callers passed in.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrivatePrefixNormalizer;

const PRIVATE_ALIASES: &[&str] = &["/private/var", "/private/tmp", "/private/etc"];

impl PathNormalizer for PrivatePrefixNormalizer {
    fn normalize(&self, path: &Path) -> PathBuf {
        for alias in PRIVATE_ALIASES {
            if let Ok(rest) = path.strip_prefix(alias) {
                let short = &alias["/private".len()..];
                return Path::new(short).join(rest);
            }
        }
        path.to_path_buf()
    }
}

/// Normalizer for the host OS.
pub fn host_normalizer() -> Arc<dyn PathNormalizer> {
    if cfg!(target_os = "macos") {
        Arc::new(PrivatePrefixNormalizer)
    } else {
        Arc::new(IdentityNormalizer)
    }
}

/// Key used when paths are stored in maps.
///
/// Follows host semantics: case-insensitive on Windows and macOS,
/// case-sensitive elsewhere.
pub fn path_key(path: &Path) -> PathBuf {
    if cfg!(any(windows, target_os = "macos")) {
        PathBuf::from(path.to_string_lossy().to_lowercase())
    } else {
        path.to_path_buf()
    }
}

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// First we try a direct `strip_prefix(root)`; if that fails (symlinks,
/// different absolute prefixes) we canonicalize both paths and try again.
///
/// Returns `None` if the path cannot be reasonably related to `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(rel.to_string_lossy().replace('\\', "/"));
    }

    if let (Ok(root_canon), Ok(path_canon)) = (root.canonicalize(), path.canonicalize()) {
        if let Ok(rel) = path_canon.strip_prefix(&root_canon) {
            return Some(rel.to_string_lossy().replace('\\', "/"));
        }
    }

    None
}

/// Editor temp/autosave artifacts: dot-prefixed or `~`-suffixed names.
pub fn is_editor_artifact(path: &Path) -> bool {
    match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name.starts_with('.') || name.ends_with('~'),
        None => false,
    }
}
