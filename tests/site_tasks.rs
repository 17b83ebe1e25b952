// tests/site_tasks.rs
#![cfg(unix)]

mod common;
use crate::common::{init_tracing, with_timeout, TestProject};

use std::error::Error;
use std::sync::Arc;

use tokio::sync::mpsc;

use sitewright::assets::SiteContext;
use sitewright::dag::Scheduler;
use sitewright::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason};
use sitewright::exec::{RealExecutorBackend, Variables};
use sitewright::fs::RealFileSystem;
use sitewright::pipeline::{self, build_graph};
use sitewright::task::TaskGraph;
use sitewright::types::{Environment, FailurePolicy};

type TestResult = Result<(), Box<dyn Error>>;

const CONFIG: &str = r#"
[tools]
scripts = "cp ${input} ${output} && printf '{}' > ${map}"
vendor_scripts = "cp ${input} ${output}"
generator = "true"
generator_local = "true"
browsers = []
"#;

fn graph_for(project: &TestProject) -> TaskGraph {
    let cfg = project.config();
    let ctx = SiteContext::new(project.root(), Arc::new(RealFileSystem))
        .with_env(Environment::default())
        .with_variables(Variables::new(&cfg.variables));
    let graph = build_graph(&cfg, &ctx);
    graph.validate().expect("valid graph");
    graph
}

async fn execute(graph: &TaskGraph, task: &str) -> TestResult {
    let unit = graph.unit(task).ok_or("unknown task")?;
    unit.action.execute().await?;
    Ok(())
}

#[tokio::test]
async fn scripts_bundle_lands_in_both_destinations() -> TestResult {
    init_tracing();

    let project = TestProject::new(CONFIG);
    project.write("_assets/js/app.js", "console.log('hi');");
    let graph = graph_for(&project);

    execute(&graph, pipeline::BUILD_SCRIPTS).await?;

    for dest in ["assets/js", "_site/assets/js"] {
        assert_eq!(project.list(dest), vec!["main.js", "main.js.map"], "in {dest}");
    }
    let bundle = std::fs::read_to_string(project.path("_site/assets/js/main.js"))?;
    assert!(bundle.contains("console.log('hi');"));
    Ok(())
}

#[tokio::test]
async fn scripts_build_in_a_root_with_spaces() -> TestResult {
    init_tracing();

    let project = TestProject::in_subdir("my site (draft)", CONFIG);
    project.write("_assets/js/app.js", "console.log('spaced');");
    let graph = graph_for(&project);

    execute(&graph, pipeline::BUILD_SCRIPTS).await?;

    for dest in ["assets/js", "_site/assets/js"] {
        assert_eq!(project.list(dest), vec!["main.js", "main.js.map"], "in {dest}");
    }
    Ok(())
}

#[tokio::test]
async fn clean_styles_is_idempotent() -> TestResult {
    init_tracing();

    let project = TestProject::new(CONFIG);
    for dest in ["assets/css", "_site/assets/css"] {
        project.write(&format!("{dest}/main.css"), "a{}");
        project.write(&format!("{dest}/main.css.map"), "{}");
    }
    project.write("assets/css/keep.txt", "x");
    let graph = graph_for(&project);

    execute(&graph, pipeline::CLEAN_STYLES).await?;
    assert_eq!(project.list("assets/css"), vec!["keep.txt"]);
    assert!(project.list("_site/assets/css").is_empty());

    // Nothing left to delete; still a success.
    execute(&graph, pipeline::CLEAN_STYLES).await?;
    assert_eq!(project.list("assets/css"), vec!["keep.txt"]);
    Ok(())
}

#[tokio::test]
async fn build_pipeline_leaves_only_current_artifacts() -> TestResult {
    init_tracing();

    let project = TestProject::new(CONFIG);
    project.write("_assets/styles/main.scss", "$c: red;\n.post { a { color: $c; } }\n");
    project.write("_assets/styles/_partial.scss", ".unused { color: blue; }\n");
    project.write("assets/css/stale.css", "old");
    project.write("_site/assets/css/old.css", "old");
    project.write("_site/index.html", "<html></html>");
    project.write("assets/js/old.js", "old");
    project.write("assets/img/gone.png", "not really a png");

    let graph = graph_for(&project);
    let roots = vec![pipeline::BUILD.to_string()];
    let dag = graph.plan(&roots)?;

    let (tx, rx) = mpsc::channel::<RuntimeEvent>(64);
    let executor = RealExecutorBackend::new(Arc::new(graph), tx.clone());
    tx.send(RuntimeEvent::TaskTriggered {
        task: pipeline::BUILD.to_string(),
        reason: TriggerReason::Manual,
    })
    .await?;
    let core = CoreRuntime::new(
        Scheduler::new(dag, FailurePolicy::Continue),
        1,
        RuntimeOptions {
            exit_when_idle: true,
        },
    );
    let report = with_timeout(Runtime::new(core, rx, executor).run()).await?;

    assert!(report.is_success(), "failed: {:?}", report.failed);
    for dest in ["assets/css", "_site/assets/css"] {
        assert_eq!(project.list(dest), vec!["main.css", "main.css.map"], "in {dest}");
    }
    assert!(project.list("assets/js").is_empty());
    assert!(project.list("assets/img").is_empty());
    assert!(!project.path("_site/index.html").exists());

    let css = std::fs::read_to_string(project.path("assets/css/main.css"))?;
    assert_eq!(css, ".post a{color:red}\n/*# sourceMappingURL=main.css.map */\n");
    let map = std::fs::read_to_string(project.path("_site/assets/css/main.css.map"))?;
    let map: serde_json::Value = serde_json::from_str(&map)?;
    assert_eq!(map["sources"][0], "_assets/styles/main.scss");
    Ok(())
}
