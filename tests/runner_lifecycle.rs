// tests/runner_lifecycle.rs

mod common;
use crate::common::builders::{failed, passed, pending, root_counts, root_with, skipped};
use crate::common::{
    CountingRegistry, FakeOutcome, Harness, at, init_tracing, project_path, shared_registry,
    with_timeout,
};

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use specwatch::errors::SpecwatchError;
use specwatch::exec::{CompileDiagnostic, InProcessSpecRunner, SpecRegistry, SpecStatus};
use specwatch::filter::{FilterOptions, RunFilters};

type TestResult = Result<(), Box<dyn Error>>;

fn runner_with_shared(h: &Harness, registry: Arc<CountingRegistry>) -> InProcessSpecRunner {
    InProcessSpecRunner::new(
        h.builder(),
        h.executor.clone(),
        shared_registry(registry),
        RunFilters::none(),
    )
}

#[tokio::test]
async fn successful_run_builds_resets_twice_and_reports() -> TestResult {
    init_tracing();
    let h = Harness::new();
    let calc = h.add_spec("calc.spec.csx", "");
    h.executor.set(
        &calc,
        FakeOutcome::Context(root_with("Calculator", vec![passed("adds"), pending("divides")])),
    );
    let registry = Arc::new(CountingRegistry::new());
    let runner = runner_with_shared(&h, registry.clone());

    let result = runner.run_file(&calc, &CancellationToken::new()).await?;

    assert!(result.success());
    assert!(result.error.is_none());
    assert_eq!(result.report.summary.total, 2);
    assert_eq!(result.report.summary.passed, 1);
    assert_eq!(result.report.summary.pending, 1);
    assert_eq!(result.report.results[0].context_path, vec!["Calculator".to_string()]);
    assert_eq!(result.report.results[0].status, SpecStatus::Passed);

    assert_eq!(registry.resets(), 2);
    assert!(registry.declared().is_empty(), "declarations must not leak");
    assert_eq!(h.tool.build_count(), 1);

    let calls = h.executor.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].registry_was_clean);
    assert_eq!(calls[0].output_dir, PathBuf::from(common::PROJECT));
    Ok(())
}

#[tokio::test]
async fn registry_is_reset_twice_even_when_executor_fails() -> TestResult {
    init_tracing();
    let h = Harness::new();
    let calc = h.add_spec("calc.spec.csx", "");
    let registry = Arc::new(CountingRegistry::new());
    let runner = runner_with_shared(&h, registry.clone());

    h.executor.set(&calc, FakeOutcome::Fail("boom".to_string()));
    let result = runner.run_file(&calc, &CancellationToken::new()).await?;
    assert!(!result.success());
    assert!(matches!(result.error, Some(SpecwatchError::Execution(_))));
    assert_eq!(result.report.summary.failed, 1);
    assert_eq!(registry.resets(), 2);

    h.executor.set(&calc, FakeOutcome::Compilation(CompileDiagnostic::new("CS1002")));
    runner.run_file(&calc, &CancellationToken::new()).await?;
    assert_eq!(registry.resets(), 4);
    Ok(())
}

#[tokio::test]
async fn compilation_failure_carries_source_context() -> TestResult {
    init_tracing();
    let h = Harness::new();
    let calc = h.add_spec(
        "calc.spec.csx",
        "describe(\"Calculator\", () => {\n  it(\"adds\", () => {\n    var x = ;\n  });\n});\n",
    );
    h.executor.set(
        &calc,
        FakeOutcome::Compilation(CompileDiagnostic::new("CS1525: Invalid expression term ';'").at(3, 13)),
    );
    let runner = h.runner();

    let result = runner.run_file(&calc, &CancellationToken::new()).await?;

    assert!(result.is_compilation_failure());
    assert_eq!(result.report.summary.failed, 1);
    let Some(SpecwatchError::Compilation(failure)) = &result.error else {
        panic!("expected a compilation error, got {:?}", result.error);
    };
    let rendered = failure.to_string();
    assert!(rendered.starts_with("error: CS1525: Invalid expression term ';'"), "{rendered}");
    assert!(rendered.contains("calc.spec.csx:3:13"), "{rendered}");
    assert!(rendered.contains("3 |     var x = ;"), "{rendered}");
    assert!(rendered.contains("1 | describe"), "{rendered}");
    assert!(rendered.contains("5 | });"), "{rendered}");
    assert!(rendered.contains("|             ^"), "{rendered}");
    Ok(())
}

#[tokio::test]
async fn failed_build_skips_execution() -> TestResult {
    init_tracing();
    let h = Harness::new();
    let calc = h.add_spec("calc.spec.csx", "");
    h.tool.set_exit_code(1);
    let runner = h.runner();

    let result = runner.run_file(&calc, &CancellationToken::new()).await?;

    assert!(!result.success());
    assert!(matches!(result.error, Some(SpecwatchError::Build { .. })));
    assert!(h.executor.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn empty_file_is_a_successful_empty_report() -> TestResult {
    let h = Harness::new();
    let calc = h.add_spec("calc.spec.csx", "");
    h.executor.set(&calc, FakeOutcome::Empty);

    let result = h.runner().run_file(&calc, &CancellationToken::new()).await?;

    assert!(result.success());
    assert_eq!(result.report.summary.total, 0);
    Ok(())
}

#[tokio::test]
async fn invalid_paths_are_rejected_before_any_work() -> TestResult {
    let h = Harness::new();
    let runner = h.runner().with_base_dir(common::PROJECT);
    let cancel = CancellationToken::new();

    let escape = runner.run_file(&project_path("../etc/passwd"), &cancel).await;
    assert!(matches!(escape, Err(SpecwatchError::Security(_))), "{escape:?}");

    let missing = runner.run_file(&project_path("missing.spec.csx"), &cancel).await;
    assert!(matches!(missing, Err(SpecwatchError::FileNotFound(_))), "{missing:?}");

    let empty = runner.run_file(&PathBuf::new(), &cancel).await;
    assert!(matches!(empty, Err(SpecwatchError::InvalidArgument(_))), "{empty:?}");

    assert_eq!(h.tool.build_count(), 0);
    assert!(h.executor.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn executor_cancellation_propagates() -> TestResult {
    let h = Harness::new();
    let calc = h.add_spec("calc.spec.csx", "");
    h.executor.set(&calc, FakeOutcome::Cancelled);

    let outcome = h.runner().run_file(&calc, &CancellationToken::new()).await;

    assert!(matches!(outcome, Err(SpecwatchError::Cancelled)));
    Ok(())
}

#[tokio::test]
async fn sequential_run_all_preserves_order_and_builds_each_dir_once() -> TestResult {
    init_tracing();
    let h = Harness::new();
    let a = h.add_spec("specs/a.spec.csx", "");
    let b = h.add_spec("specs/b.spec.csx", "");
    let c = h.add_spec("more/c.spec.csx", "");
    h.executor.set(&a, FakeOutcome::Context(root_counts(2, 0)));
    h.executor.set(&b, FakeOutcome::Context(root_counts(1, 1)));
    h.executor.set(&c, FakeOutcome::Fail("crashed".to_string()));
    let runner = h.runner();

    let files = vec![a.clone(), b.clone(), c.clone()];
    let summary = runner.run_all(&files, false, &CancellationToken::new()).await?;

    let order: Vec<PathBuf> = summary.results.iter().map(|r| r.spec_file.clone()).collect();
    assert_eq!(order, files);
    assert_eq!(h.executor.executed_files(), files);

    // One project above both directories: one real build, then cache hits.
    assert_eq!(h.tool.build_count(), 1);

    assert_eq!(summary.total_specs(), 2 + 2 + 1);
    assert_eq!(summary.passed(), 3);
    assert_eq!(summary.failed(), 2);
    assert!(!summary.success());
    assert_eq!(
        summary.total_duration,
        summary.results.iter().map(|r| r.duration).sum::<Duration>()
    );
    Ok(())
}

#[tokio::test]
async fn failed_build_is_invoked_once_per_run_all() -> TestResult {
    init_tracing();
    let h = Harness::new();
    let files: Vec<PathBuf> = ["a", "b", "c"]
        .iter()
        .map(|name| h.add_spec(&format!("specs/{name}.spec.csx"), ""))
        .collect();
    h.tool.set_exit_code(1);
    let runner = h.runner();

    for (parallel, builds) in [(false, 1), (true, 2)] {
        let summary = runner.run_all(&files, parallel, &CancellationToken::new()).await?;

        assert_eq!(summary.results.len(), 3);
        assert!(
            summary
                .results
                .iter()
                .all(|r| matches!(r.error, Some(SpecwatchError::Build { .. }))),
            "{:?}",
            summary.results
        );
        assert_eq!(h.tool.build_count(), builds);
    }
    assert!(h.executor.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn source_edit_between_runs_rebuilds() -> TestResult {
    let h = Harness::new();
    let calc = h.add_spec("calc.spec.csx", "");
    let runner = h.runner();
    let cancel = CancellationToken::new();

    runner.run_all(&[calc.clone()], false, &cancel).await?;
    runner.run_file(&calc, &cancel).await?;
    assert_eq!(h.tool.build_count(), 1);

    h.fs.touch(project_path("src/Calculator.cs"), at(100));
    runner.run_file(&calc, &cancel).await?;
    assert_eq!(h.tool.build_count(), 2);

    h.fs.touch(project_path("src/Calculator.cs"), at(200));
    runner.run_all(&[calc], false, &cancel).await?;
    assert_eq!(h.tool.build_count(), 3);
    Ok(())
}

#[tokio::test]
async fn parallel_run_all_returns_one_result_per_file_with_isolated_registries() -> TestResult {
    init_tracing();
    let h = Harness::new();
    let files: Vec<PathBuf> = (0..6)
        .map(|i| h.add_spec(&format!("specs/s{i}.spec.csx"), ""))
        .collect();
    h.executor.set_delay(Duration::from_millis(20));
    let runner = h.runner();

    let summary = with_timeout(runner.run_all(&files, true, &CancellationToken::new())).await?;

    assert_eq!(summary.results.len(), files.len());
    let mut got: Vec<PathBuf> = summary.results.iter().map(|r| r.spec_file.clone()).collect();
    got.sort();
    let mut want = files.clone();
    want.sort();
    assert_eq!(got, want);
    assert!(summary.success());

    let created = h.registries.created();
    assert_eq!(created.len(), files.len(), "one registry per execution");
    assert!(created.iter().all(|r| r.resets() == 2));
    assert!(h.executor.calls().iter().all(|c| c.registry_was_clean));
    Ok(())
}

#[tokio::test]
async fn parallel_panic_becomes_a_failed_result() -> TestResult {
    let h = Harness::new();
    let ok = h.add_spec("ok.spec.csx", "");
    let bad = h.add_spec("bad.spec.csx", "");
    h.executor.set(&bad, FakeOutcome::Panic);

    let summary = h
        .runner()
        .run_all(&[ok.clone(), bad.clone()], true, &CancellationToken::new())
        .await?;

    assert_eq!(summary.results.len(), 2);
    let failed: Vec<&PathBuf> = summary
        .results
        .iter()
        .filter(|r| !r.success())
        .map(|r| &r.spec_file)
        .collect();
    assert_eq!(failed, vec![&bad]);
    Ok(())
}

#[tokio::test]
async fn run_all_rejected_file_does_not_abort_the_others() -> TestResult {
    let h = Harness::new();
    let ok = h.add_spec("ok.spec.csx", "");
    let missing = project_path("missing.spec.csx");

    let summary = h
        .runner()
        .run_all(&[missing.clone(), ok.clone()], false, &CancellationToken::new())
        .await?;

    assert_eq!(summary.results.len(), 2);
    assert!(matches!(summary.results[0].error, Some(SpecwatchError::FileNotFound(_))));
    assert!(summary.results[1].success());
    Ok(())
}

#[tokio::test]
async fn cancelled_before_start_does_nothing() -> TestResult {
    let h = Harness::new();
    let a = h.add_spec("a.spec.csx", "");
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = h.runner().run_all(&[a], false, &cancel).await;

    assert!(matches!(outcome, Err(SpecwatchError::Cancelled)));
    assert_eq!(h.tool.build_count(), 0);
    assert!(h.executor.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn cancellation_mid_parallel_run_aborts_promptly() -> TestResult {
    init_tracing();
    let h = Harness::new();
    let files: Vec<PathBuf> = (0..4)
        .map(|i| h.add_spec(&format!("s{i}.spec.csx"), ""))
        .collect();
    h.executor.set_delay(Duration::from_secs(30));
    let runner = h.runner();
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let outcome = with_timeout(runner.run_all(&files, true, &cancel)).await;
    assert!(matches!(outcome, Err(SpecwatchError::Cancelled)));
    Ok(())
}

#[tokio::test]
async fn filters_are_handed_to_the_executor() -> TestResult {
    let h = Harness::new();
    let calc = h.add_spec("calc.spec.csx", "");
    h.executor.set(
        &calc,
        FakeOutcome::Context(root_with(
            "Calculator",
            vec![passed("adds"), failed("divides"), skipped("subtracts")],
        )),
    );
    let filters = RunFilters::from_options(&FilterOptions {
        names: vec!["^adds$".to_string()],
        ..FilterOptions::default()
    });
    let runner = h.runner().with_filters(filters);

    let result = runner.run_file(&calc, &CancellationToken::new()).await?;

    assert_eq!(result.report.summary.total, 1);
    assert_eq!(result.report.results[0].description, "adds");
    assert!(result.success());
    assert_eq!(h.executor.calls()[0].name_patterns, vec!["^adds$".to_string()]);
    Ok(())
}

#[tokio::test]
async fn clear_build_cache_delegates_to_builder() -> TestResult {
    let h = Harness::new();
    let calc = h.add_spec("calc.spec.csx", "");
    let runner = h.runner();
    let cancel = CancellationToken::new();

    runner.run_file(&calc, &cancel).await?;
    runner.run_file(&calc, &cancel).await?;
    assert_eq!(h.tool.build_count(), 1);

    runner.clear_build_cache();
    runner.run_file(&calc, &cancel).await?;
    assert_eq!(h.tool.build_count(), 2);
    Ok(())
}
