// tests/spec_diff.rs

mod common;
use crate::common::builders::{SpecBuilder, complete, dynamic, spec};
use crate::common::init_tracing;

use std::error::Error;
use std::path::Path;
use std::time::{Duration, UNIX_EPOCH};

use specwatch::diff::{ChangeType, SpecChangeTracker, diff};

type TestResult = Result<(), Box<dyn Error>>;

const FILE: &str = "/proj/calc.spec.csx";

#[test]
fn moved_spec_is_reported_as_modified_with_both_line_numbers() -> TestResult {
    init_tracing();

    let old = complete(vec![spec("A", "x", 5)]);
    let new = complete(vec![spec("A", "x", 9)]);

    let set = diff(Path::new(FILE), Some(&old), &new, false);

    assert_eq!(set.changes.len(), 1);
    let change = &set.changes[0];
    assert_eq!(change.change_type, ChangeType::Modified);
    assert_eq!(change.description, "x");
    assert_eq!(change.context_path, vec!["A".to_string()]);
    assert_eq!(change.old_line_number, Some(5));
    assert_eq!(change.new_line_number, Some(9));
    assert!(!set.requires_full_run());
    Ok(())
}

#[test]
fn added_and_deleted_follow_file_order() -> TestResult {
    init_tracing();

    let old = complete(vec![spec("A", "keep", 1), spec("A", "gone1", 2), spec("B", "gone2", 3)]);
    let new = complete(vec![spec("A", "new1", 1), spec("A", "keep", 2), spec("C", "new2", 8)]);

    let set = diff(Path::new(FILE), Some(&old), &new, false);

    let summary: Vec<(ChangeType, &str)> = set
        .changes
        .iter()
        .map(|c| (c.change_type, c.description.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (ChangeType::Added, "new1"),
            (ChangeType::Modified, "keep"),
            (ChangeType::Added, "new2"),
            (ChangeType::Deleted, "gone1"),
            (ChangeType::Deleted, "gone2"),
        ]
    );

    let to_run: Vec<&str> = set.specs_to_run().map(|c| c.description.as_str()).collect();
    assert_eq!(to_run, vec!["new1", "keep", "new2"]);
    assert_eq!(set.count(ChangeType::Deleted), 2);
    Ok(())
}

#[test]
fn type_or_pending_change_counts_as_modified() -> TestResult {
    let old = complete(vec![spec("A", "focus", 3), spec("A", "later", 4)]);
    let new = complete(vec![
        SpecBuilder::new("focus").context("A").line(3).focused().build(),
        SpecBuilder::new("later").context("A").line(4).pending().build(),
    ]);

    let set = diff(Path::new(FILE), Some(&old), &new, false);

    assert_eq!(set.count(ChangeType::Modified), 2);
    Ok(())
}

#[test]
fn identical_snapshots_have_no_changes() -> TestResult {
    let snapshot = complete(vec![spec("A > B", "x", 5), spec("A", "y", 7)]);

    let set = diff(Path::new(FILE), Some(&snapshot), &snapshot, false);

    assert!(!set.has_changes());
    assert!(set.changes.is_empty());
    Ok(())
}

#[test]
fn incomplete_new_snapshot_forces_full_run_even_if_identical() -> TestResult {
    let old = complete(vec![spec("A", "x", 5)]);
    let new = dynamic(vec![spec("A", "x", 5)]);

    let set = diff(Path::new(FILE), Some(&old), &new, false);

    assert!(set.has_dynamic_specs);
    assert!(set.requires_full_run());
    assert!(set.has_changes());
    assert!(set.changes.is_empty());
    Ok(())
}

#[test]
fn incomplete_old_snapshot_forces_full_run() -> TestResult {
    let old = dynamic(vec![]);
    let new = complete(vec![spec("A", "x", 5)]);

    let set = diff(Path::new(FILE), Some(&old), &new, true);

    assert!(set.has_dynamic_specs);
    assert!(!set.dependency_changed);
    Ok(())
}

#[test]
fn dependency_change_skips_static_diff() -> TestResult {
    let old = complete(vec![spec("A", "x", 5)]);
    let new = complete(vec![spec("A", "x", 9), spec("A", "z", 10)]);

    let set = diff(Path::new(FILE), Some(&old), &new, true);

    assert!(set.dependency_changed);
    assert!(set.requires_full_run());
    assert!(set.changes.is_empty());
    Ok(())
}

#[test]
fn first_occurrence_wins_for_duplicate_keys() -> TestResult {
    init_tracing();

    // Two specs share "A > dup"; only the first one (line 5) takes part.
    let old = complete(vec![spec("A", "dup", 5), spec("A", "dup", 20)]);
    let new = complete(vec![spec("A", "dup", 5), spec("A", "dup", 30)]);

    let set = diff(Path::new(FILE), Some(&old), &new, false);
    assert!(set.changes.is_empty());

    let moved = complete(vec![spec("A", "dup", 6), spec("A", "dup", 20)]);
    let set = diff(Path::new(FILE), Some(&old), &moved, false);
    assert_eq!(set.changes.len(), 1);
    assert_eq!(set.changes[0].old_line_number, Some(5));
    assert_eq!(set.changes[0].new_line_number, Some(6));
    Ok(())
}

#[test]
fn no_baseline_means_everything_is_added() -> TestResult {
    let new = complete(vec![spec("Calculator", "adds", 3), spec("Calculator", "subtracts", 7)]);

    let set = diff(Path::new(FILE), None, &new, false);

    assert_eq!(set.count(ChangeType::Added), 2);
    assert!(set.changes.iter().all(|c| c.old_line_number.is_none()));
    Ok(())
}

#[test]
fn tracker_diffs_against_recorded_baseline() -> TestResult {
    init_tracing();
    let tracker = SpecChangeTracker::new();
    let path = Path::new(FILE);

    assert!(!tracker.has_state(path));
    tracker.record_state(path, complete(vec![spec("A", "x", 5)]));
    assert!(tracker.has_state(path));

    let set = tracker.get_changes(path, &complete(vec![spec("A", "x", 9)]), false);
    assert_eq!(set.count(ChangeType::Modified), 1);

    // get_changes never moves the baseline.
    let again = tracker.get_changes(path, &complete(vec![spec("A", "x", 9)]), false);
    assert_eq!(again.count(ChangeType::Modified), 1);

    tracker.remove_state(path);
    assert!(!tracker.has_state(path));
    Ok(())
}

#[test]
fn tracker_dependency_times_are_strictly_increasing() -> TestResult {
    let tracker = SpecChangeTracker::new();
    let dep = Path::new("/proj/helpers.csx");
    let t0 = UNIX_EPOCH + Duration::from_secs(100);

    assert!(tracker.has_dependency_changed(dep, t0), "unseen dependency counts as changed");

    tracker.record_dependency(dep, t0);
    assert!(!tracker.has_dependency_changed(dep, t0));
    assert!(!tracker.has_dependency_changed(dep, t0 - Duration::from_secs(1)));
    assert!(tracker.has_dependency_changed(dep, t0 + Duration::from_secs(1)));

    tracker.clear();
    assert!(tracker.has_dependency_changed(dep, t0));
    Ok(())
}

#[cfg(any(windows, target_os = "macos"))]
#[test]
fn tracker_keys_are_case_insensitive_on_this_host() -> TestResult {
    let tracker = SpecChangeTracker::new();
    tracker.record_state(Path::new("/Proj/Calc.spec.csx"), complete(vec![]));
    assert!(tracker.has_state(Path::new("/proj/calc.spec.csx")));
    Ok(())
}

#[cfg(not(any(windows, target_os = "macos")))]
#[test]
fn tracker_keys_are_case_sensitive_on_this_host() -> TestResult {
    let tracker = SpecChangeTracker::new();
    tracker.record_state(Path::new("/Proj/Calc.spec.csx"), complete(vec![]));
    assert!(!tracker.has_state(Path::new("/proj/calc.spec.csx")));
    assert_eq!(tracker.tracked_files(), vec![Path::new("/Proj/Calc.spec.csx").to_path_buf()]);
    Ok(())
}
