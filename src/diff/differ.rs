// src/diff/differ.rs

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::Path;

use tracing::{debug, warn};

use crate::diff::{ChangeType, SpecChange, SpecChangeSet};
use crate::parse::{StaticParseResult, StaticSpec};

/// Compute the change set between the last known snapshot and a new one.
///
/// Order of checks:
/// 1. Either snapshot incomplete → `has_dynamic_specs`, no diff attempted.
/// 2. `dependency_changed` → flagged, no diff attempted.
/// 3. Keyed diff. Added/Modified follow the new file's order, Deleted the
///    old file's order. On duplicate keys the first occurrence wins.
pub fn diff(
    file_path: &Path,
    old: Option<&StaticParseResult>,
    new: &StaticParseResult,
    dependency_changed: bool,
) -> SpecChangeSet {
    let mut set = SpecChangeSet::empty(file_path);

    if !new.is_complete || old.is_some_and(|o| !o.is_complete) {
        debug!(file = %file_path.display(), "snapshot incomplete; dynamic specs");
        set.has_dynamic_specs = true;
        return set;
    }

    if dependency_changed {
        debug!(file = %file_path.display(), "dependency changed; skipping static diff");
        set.dependency_changed = true;
        return set;
    }

    let old_specs: &[StaticSpec] = old.map(|o| o.specs.as_slice()).unwrap_or(&[]);
    let (old_index, old_order) = index_specs(file_path, old_specs);
    let (new_index, new_order) = index_specs(file_path, &new.specs);

    for key in &new_order {
        let current = new_index[key];
        match old_index.get(key) {
            None => set.changes.push(change(current, ChangeType::Added, None, Some(current))),
            Some(&previous) if is_modified(previous, current) => set.changes.push(change(
                current,
                ChangeType::Modified,
                Some(previous),
                Some(current),
            )),
            Some(_) => {}
        }
    }

    for key in &old_order {
        if !new_index.contains_key(key) {
            let previous = old_index[key];
            set.changes.push(change(previous, ChangeType::Deleted, Some(previous), None));
        }
    }

    debug!(
        file = %file_path.display(),
        added = set.count(ChangeType::Added),
        modified = set.count(ChangeType::Modified),
        deleted = set.count(ChangeType::Deleted),
        "static diff computed"
    );

    set
}

/// Index specs by key, keeping the first occurrence and the first-seen order.
fn index_specs<'a>(
    file_path: &Path,
    specs: &'a [StaticSpec],
) -> (HashMap<String, &'a StaticSpec>, Vec<String>) {
    let mut index = HashMap::with_capacity(specs.len());
    let mut order = Vec::with_capacity(specs.len());

    for spec in specs {
        let key = spec.key();
        match index.entry(key.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(spec);
                order.push(key);
            }
            Entry::Occupied(first) => {
                warn!(
                    file = %file_path.display(),
                    key = %key,
                    first_line = first.get().line_number,
                    duplicate_line = spec.line_number,
                    "duplicate spec key; only the first occurrence is diffed"
                );
            }
        }
    }

    (index, order)
}

fn is_modified(old: &StaticSpec, new: &StaticSpec) -> bool {
    old.line_number != new.line_number
        || old.spec_type != new.spec_type
        || old.is_pending != new.is_pending
}

fn change(
    spec: &StaticSpec,
    change_type: ChangeType,
    old: Option<&StaticSpec>,
    new: Option<&StaticSpec>,
) -> SpecChange {
    SpecChange {
        description: spec.description.clone(),
        context_path: spec.context_path.clone(),
        change_type,
        old_line_number: old.map(|s| s.line_number),
        new_line_number: new.map(|s| s.line_number),
    }
}
