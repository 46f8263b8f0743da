// src/validation.rs

//! Path validation performed before any filesystem access.

use std::path::{Component, Path, PathBuf};

use crate::errors::{Result, SpecwatchError};
use crate::fs::FileSystem;

/// Rejects path traversal and unsafe file names.
///
/// All checks except [`PathValidator::validate_existing_file`] are purely
/// lexical and never touch the filesystem.
#[derive(Debug, Clone)]
pub struct PathValidator {
    base_dir: PathBuf,
}

impl PathValidator {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: lexical_normalize(&base_dir.into()),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// A bare file name: no separators, no `.`/`..`, not empty.
    pub fn validate_file_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(SpecwatchError::InvalidArgument(
                "file name must not be empty".to_string(),
            ));
        }
        if name.contains('/') || name.contains('\\') {
            return Err(SpecwatchError::Security(format!(
                "file name {name:?} must not contain path separators"
            )));
        }
        if name == "." || name == ".." || name.contains("..") {
            return Err(SpecwatchError::Security(format!(
                "file name {name:?} must not contain relative traversal"
            )));
        }
        if name.contains('\0') {
            return Err(SpecwatchError::Security(format!(
                "file name {name:?} contains a NUL byte"
            )));
        }
        Ok(())
    }

    /// Resolve `path` (relative paths are taken relative to the base dir) and
    /// make sure the result stays inside the base directory.
    pub fn validate_within_base(&self, path: &Path) -> Result<PathBuf> {
        if path.as_os_str().is_empty() {
            return Err(SpecwatchError::InvalidArgument(
                "path must not be empty".to_string(),
            ));
        }

        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        };
        let resolved = lexical_normalize(&joined);

        if !resolved.starts_with(&self.base_dir) {
            return Err(SpecwatchError::Security(format!(
                "path {} escapes base directory {}",
                path.display(),
                self.base_dir.display()
            )));
        }

        if let Some(name) = resolved.file_name().and_then(|n| n.to_str()) {
            Self::validate_file_name(name)?;
        }

        Ok(resolved)
    }

    /// Full validation of a spec file: within base, safe name, exists.
    pub fn validate_existing_file(&self, fs: &dyn FileSystem, path: &Path) -> Result<PathBuf> {
        let resolved = self.validate_within_base(path)?;
        if !fs.is_file(&resolved) {
            return Err(SpecwatchError::FileNotFound(resolved));
        }
        Ok(resolved)
    }
}

/// Resolve `.` and `..` components without consulting the filesystem.
///
/// `..` never climbs above the root of an absolute path.
pub fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = match out.components().next_back() {
                    Some(Component::Normal(_)) => out.pop(),
                    _ => false,
                };
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
