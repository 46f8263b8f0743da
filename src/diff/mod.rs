// src/diff/mod.rs

//! Static incremental diffing.
//!
//! [`differ::diff`] compares two snapshots of one spec file and
//! [`tracker::SpecChangeTracker`] remembers the last snapshot per file that
//! was part of a successful run.

pub mod differ;
pub mod tracker;

use std::path::PathBuf;

pub use differ::diff;
pub use tracker::SpecChangeTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeType {
    Added,
    Modified,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecChange {
    pub description: String,
    pub context_path: Vec<String>,
    pub change_type: ChangeType,
    pub old_line_number: Option<u32>,
    pub new_line_number: Option<u32>,
}

/// Result of diffing one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecChangeSet {
    pub file_path: PathBuf,
    pub changes: Vec<SpecChange>,
    pub has_dynamic_specs: bool,
    pub dependency_changed: bool,
}

impl SpecChangeSet {
    pub fn empty(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            changes: Vec::new(),
            has_dynamic_specs: false,
            dependency_changed: false,
        }
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty() || self.has_dynamic_specs || self.dependency_changed
    }

    /// Static diffing can't be trusted; the whole file must run.
    pub fn requires_full_run(&self) -> bool {
        self.has_dynamic_specs || self.dependency_changed
    }

    /// Added and modified specs, in diff order.
    pub fn specs_to_run(&self) -> impl Iterator<Item = &SpecChange> {
        self.changes
            .iter()
            .filter(|c| matches!(c.change_type, ChangeType::Added | ChangeType::Modified))
    }

    pub fn count(&self, change_type: ChangeType) -> usize {
        self.changes
            .iter()
            .filter(|c| c.change_type == change_type)
            .count()
    }
}
