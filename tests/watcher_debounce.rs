// tests/watcher_debounce.rs

mod common;
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::time::{sleep, timeout};

use specwatch::watch::{
    ChangeBatch, ChangeClassifier, FileChangeInfo, FileWatcher, IdentityNormalizer,
    PathClass, PathNormalizer, PrivatePrefixNormalizer, WatchOptions,
};

type TestResult = Result<(), Box<dyn Error>>;

const DEBOUNCE: Duration = Duration::from_millis(200);

fn options() -> WatchOptions {
    WatchOptions {
        debounce: DEBOUNCE,
        ..WatchOptions::default()
    }
}

fn classifier(root: &str) -> ChangeClassifier {
    ChangeClassifier::new(PathBuf::from(root), None, options(), Arc::new(IdentityNormalizer))
}

// ----- pure classification / coalescing -----

#[test]
fn classifier_separates_specs_sources_and_noise() {
    let c = classifier("/proj");

    assert_eq!(c.classify(Path::new("/proj/calc.spec.csx")).0, PathClass::Spec);
    assert_eq!(c.classify(Path::new("/proj/src/Calculator.cs")).0, PathClass::Source);
    assert_eq!(c.classify(Path::new("/proj/App.csproj")).0, PathClass::Source);
    assert_eq!(c.classify(Path::new("/proj/README.md")).0, PathClass::Ignored);
    assert_eq!(c.classify(Path::new("/proj/.calc.spec.csx.swp")).0, PathClass::Ignored);
    assert_eq!(c.classify(Path::new("/proj/calc.spec.csx~")).0, PathClass::Ignored);
    assert_eq!(c.classify(Path::new("/proj/bin/Debug/App.dll")).0, PathClass::Ignored);
    assert_eq!(c.classify(Path::new("/proj/obj/gen.cs")).0, PathClass::Ignored);
    assert_eq!(c.classify(Path::new("/elsewhere/x.spec.csx")).0, PathClass::Ignored);
}

#[test]
fn single_file_watch_ignores_siblings() {
    let c = ChangeClassifier::new(
        PathBuf::from("/proj"),
        Some(PathBuf::from("/proj/calc.spec.csx")),
        options(),
        Arc::new(IdentityNormalizer),
    );

    assert_eq!(c.classify(Path::new("/proj/calc.spec.csx")).0, PathClass::Spec);
    assert_eq!(c.classify(Path::new("/proj/other.spec.csx")).0, PathClass::Ignored);
    assert_eq!(c.classify(Path::new("/proj/Calculator.cs")).0, PathClass::Ignored);
}

#[test]
fn private_prefix_is_stripped_before_comparison() {
    let normalizer = PrivatePrefixNormalizer;
    assert_eq!(
        normalizer.normalize(Path::new("/private/var/folders/x/calc.spec.csx")),
        PathBuf::from("/var/folders/x/calc.spec.csx")
    );
    assert_eq!(
        normalizer.normalize(Path::new("/private/tmp/p")),
        PathBuf::from("/tmp/p")
    );
    assert_eq!(
        normalizer.normalize(Path::new("/home/u/p")),
        PathBuf::from("/home/u/p")
    );

    let c = ChangeClassifier::new(
        PathBuf::from("/var/folders/x"),
        None,
        options(),
        Arc::new(PrivatePrefixNormalizer),
    );
    let (class, path) = c.classify(Path::new("/private/var/folders/x/calc.spec.csx"));
    assert_eq!(class, PathClass::Spec);
    assert_eq!(path, PathBuf::from("/var/folders/x/calc.spec.csx"));
}

#[test]
fn batch_with_repeated_spec_events_yields_that_spec() {
    let c = classifier("/proj");
    let mut batch = ChangeBatch::default();
    for _ in 0..5 {
        let (class, path) = c.classify(Path::new("/proj/calc.spec.csx"));
        assert!(batch.ingest(class, path));
    }
    assert_eq!(
        batch.finish(),
        Some(FileChangeInfo::spec("/proj/calc.spec.csx"))
    );
}

#[test]
fn batch_escalates_on_two_specs_or_any_source() {
    let c = classifier("/proj");

    let mut two_specs = ChangeBatch::default();
    for p in ["/proj/a.spec.csx", "/proj/b.spec.csx"] {
        let (class, path) = c.classify(Path::new(p));
        two_specs.ingest(class, path);
    }
    assert_eq!(two_specs.finish(), Some(FileChangeInfo::escalation()));

    let mut with_source = ChangeBatch::default();
    for p in ["/proj/a.spec.csx", "/proj/src/Calculator.cs"] {
        let (class, path) = c.classify(Path::new(p));
        with_source.ingest(class, path);
    }
    let info = with_source.finish().expect("a change");
    assert_eq!(info.file_path, None);
    assert!(!info.is_spec_file);
}

#[test]
fn noise_only_batch_emits_nothing() {
    let c = classifier("/proj");
    let mut batch = ChangeBatch::default();
    for p in ["/proj/.swp", "/proj/bin/x.cs", "/proj/notes.txt"] {
        let (class, path) = c.classify(Path::new(p));
        assert!(!batch.ingest(class, path));
    }
    assert!(batch.is_empty());
    assert_eq!(batch.finish(), None);
}

// ----- real watcher -----

fn canonical_tempdir() -> Result<(TempDir, PathBuf), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let root = dir.path().canonicalize()?;
    Ok((dir, root))
}

/// Give the OS watcher a moment to arm before writing.
async fn settle() {
    sleep(Duration::from_millis(150)).await;
}

#[tokio::test]
async fn rapid_writes_to_one_spec_coalesce_into_one_change() -> TestResult {
    init_tracing();
    let (_dir, root) = canonical_tempdir()?;
    let spec = root.join("calc.spec.csx");
    fs::write(&spec, "// v0")?;

    let (watcher, mut rx) = FileWatcher::spawn(&root, options())?;
    settle().await;

    for i in 0..5 {
        fs::write(&spec, format!("// v{i}"))?;
        sleep(Duration::from_millis(20)).await;
    }

    let info = with_timeout(rx.recv()).await.expect("one change");
    assert!(info.is_spec_file);
    assert_eq!(
        info.file_path.map(|p| p.canonicalize().unwrap_or(p)),
        Some(spec.clone())
    );

    // Nothing else once the window closed.
    let extra = timeout(DEBOUNCE * 3, rx.recv()).await;
    assert!(extra.is_err(), "expected a single emission, got {extra:?}");

    watcher.stop();
    Ok(())
}

#[tokio::test]
async fn two_specs_in_one_window_escalate() -> TestResult {
    init_tracing();
    let (_dir, root) = canonical_tempdir()?;
    let a = root.join("a.spec.csx");
    let b = root.join("b.spec.csx");
    fs::write(&a, "")?;
    fs::write(&b, "")?;

    let (_watcher, mut rx) = FileWatcher::spawn(&root, options())?;
    settle().await;

    fs::write(&a, "// a")?;
    fs::write(&b, "// b")?;

    let info = with_timeout(rx.recv()).await.expect("one change");
    assert_eq!(info, FileChangeInfo::escalation());
    Ok(())
}

#[tokio::test]
async fn source_change_escalates() -> TestResult {
    init_tracing();
    let (_dir, root) = canonical_tempdir()?;
    fs::create_dir_all(root.join("src"))?;

    let (_watcher, mut rx) = FileWatcher::spawn(&root, options())?;
    settle().await;

    fs::write(root.join("src/Calculator.cs"), "class Calculator {}")?;

    let info = with_timeout(rx.recv()).await.expect("one change");
    assert_eq!(info.file_path, None);
    assert!(!info.is_spec_file);
    Ok(())
}

#[tokio::test]
async fn editor_artifacts_never_emit() -> TestResult {
    init_tracing();
    let (_dir, root) = canonical_tempdir()?;

    let (_watcher, mut rx) = FileWatcher::spawn(&root, options())?;
    settle().await;

    fs::write(root.join(".calc.spec.csx.swp"), "x")?;
    fs::write(root.join("calc.spec.csx~"), "x")?;
    fs::write(root.join("notes.txt"), "x")?;

    let got = timeout(DEBOUNCE * 4, rx.recv()).await;
    assert!(got.is_err(), "expected no emission, got {got:?}");
    Ok(())
}

#[tokio::test]
async fn watching_a_file_only_reports_that_file() -> TestResult {
    init_tracing();
    let (_dir, root) = canonical_tempdir()?;
    let target = root.join("calc.spec.csx");
    let sibling = root.join("other.spec.csx");
    fs::write(&target, "")?;
    fs::write(&sibling, "")?;

    let (_watcher, mut rx) = FileWatcher::spawn(&target, options())?;
    settle().await;

    fs::write(&sibling, "// changed")?;
    let got = timeout(DEBOUNCE * 3, rx.recv()).await;
    assert!(got.is_err(), "sibling must be ignored, got {got:?}");

    fs::write(&target, "// changed")?;
    let info = with_timeout(rx.recv()).await.expect("one change");
    assert!(info.is_spec_file);
    Ok(())
}

#[tokio::test]
async fn stopping_mid_window_ends_the_stream_without_emitting() -> TestResult {
    init_tracing();
    let (_dir, root) = canonical_tempdir()?;
    let spec = root.join("calc.spec.csx");
    fs::write(&spec, "")?;

    let (watcher, mut rx) = FileWatcher::spawn(&root, options())?;
    settle().await;

    fs::write(&spec, "// pending change")?;
    sleep(Duration::from_millis(30)).await;
    watcher.stop();

    // The stream terminates; no change slips out after stop.
    let next = with_timeout(rx.recv()).await;
    assert_eq!(next, None);
    Ok(())
}

#[tokio::test]
async fn missing_target_is_rejected() -> TestResult {
    let (_dir, root) = canonical_tempdir()?;
    let missing = root.join("nope");
    assert!(FileWatcher::spawn(&missing, options()).is_err());
    Ok(())
}
