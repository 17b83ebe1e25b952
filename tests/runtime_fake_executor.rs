// tests/runtime_fake_executor.rs

mod common;
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use sitewright::dag::Scheduler;
use sitewright::engine::{CoreRuntime, RunReport, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason};
use sitewright::types::FailurePolicy;
use sitewright_test_utils::builders::{dag_from_edges, GraphBuilder};
use sitewright_test_utils::fake_executor::FakeExecutor;
use sitewright_test_utils::recording::Recorder;

type TestResult = Result<(), Box<dyn Error>>;

async fn run_once(
    dag: sitewright::dag::DagGraph,
    policy: FailurePolicy,
    roots: &[&str],
    failing: &[&str],
) -> Result<(RunReport, Vec<String>), Box<dyn Error>> {
    let (tx, rx) = mpsc::channel::<RuntimeEvent>(256);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&executed)).failing(failing);

    for root in roots {
        tx.send(RuntimeEvent::TaskTriggered {
            task: root.to_string(),
            reason: TriggerReason::Manual,
        })
        .await?;
    }

    let core = CoreRuntime::new(
        Scheduler::new(dag, policy),
        1,
        RuntimeOptions {
            exit_when_idle: true,
        },
    );
    let report = with_timeout(Runtime::new(core, rx, executor).run()).await?;
    let executed = executed.lock().unwrap().clone();
    Ok((report, executed))
}

#[tokio::test]
async fn runs_a_chain_in_order() -> TestResult {
    init_tracing();

    let dag = dag_from_edges(&[("A", &[]), ("B", &["A"]), ("C", &["B"])]);
    let (report, executed) = run_once(dag, FailurePolicy::Continue, &["C"], &[]).await?;

    assert_eq!(executed, vec!["A", "B", "C"]);
    assert!(report.is_success());
    assert_eq!(report.succeeded.len(), 3);
    Ok(())
}

#[tokio::test]
async fn continue_policy_runs_dependents_of_failures() -> TestResult {
    init_tracing();

    let dag = dag_from_edges(&[("A", &[]), ("B", &["A"])]);
    let (report, executed) = run_once(dag, FailurePolicy::Continue, &["B"], &["A"]).await?;

    assert_eq!(executed, vec!["A", "B"]);
    assert_eq!(report.failed, vec!["A"]);
    assert_eq!(report.succeeded, vec!["B"]);
    assert!(report.skipped.is_empty());
    Ok(())
}

#[tokio::test]
async fn fail_fast_skips_dependents() -> TestResult {
    init_tracing();

    let dag = dag_from_edges(&[("A", &[]), ("B", &["A"]), ("C", &["B"]), ("D", &[])]);
    let (report, executed) = run_once(dag, FailurePolicy::FailFast, &["C", "D"], &["A"]).await?;

    assert!(!executed.contains(&"B".to_string()));
    assert!(!executed.contains(&"C".to_string()));
    assert!(executed.contains(&"D".to_string()));
    assert_eq!(report.failed, vec!["A"]);

    let mut skipped = report.skipped.clone();
    skipped.sort();
    assert_eq!(skipped, vec!["B", "C"]);
    assert!(!report.is_success());
    Ok(())
}

#[tokio::test]
async fn pipeline_stages_gate_each_other() -> TestResult {
    init_tracing();

    let recorder = Recorder::new();
    let graph = GraphBuilder::new(&recorder)
        .task("clean:a", &[])
        .task("clean:b", &[])
        .task("clean", &["clean:a", "clean:b"])
        .task("build:a", &[])
        .task("build:b", &[])
        .task("site", &[])
        .pipeline("build", &[&["clean"], &["build:a", "build:b"], &["site"]])
        .build();
    graph.validate()?;

    let roots = vec!["build".to_string()];
    let (_, executed) = run_once(graph.plan(&roots)?, FailurePolicy::Continue, &["build"], &[]).await?;

    let pos = |t: &str| executed.iter().position(|e| e == t).unwrap();
    assert!(pos("clean") < pos("build:a"));
    assert!(pos("clean") < pos("build:b"));
    assert!(pos("build:a") < pos("site"));
    assert!(pos("build:b") < pos("site"));
    assert_eq!(executed.last().map(String::as_str), Some("build"));

    // Outside the pipeline the stages are independent.
    let (_, executed) = run_once(graph.plan(&["build:a".to_string()])?, FailurePolicy::Continue, &["build:a"], &[]).await?;
    assert_eq!(executed, vec!["build:a"]);
    Ok(())
}
