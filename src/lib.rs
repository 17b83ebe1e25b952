// src/lib.rs

pub mod assets;
pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod server;
pub mod task;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{mpsc, watch as flag};
use tracing::{debug, info, warn};

use crate::assets::SiteContext;
use crate::cli::CliArgs;
use crate::config::{load_for_cli, ConfigFile};
use crate::dag::{DagGraph, Scheduler};
use crate::engine::{
    CoreRuntime, RunReport, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason,
};
use crate::exec::{RealExecutorBackend, Variables};
use crate::fs::RealFileSystem;
use crate::server::{DevServer, LiveReload};
use crate::task::TaskGraph;
use crate::types::{Environment, FailurePolicy};

/// Command that builds the site and then serves it with live reload.
pub const SERVE: &str = "serve";

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and CLI overrides
/// - the task graph and its validation
/// - scheduler / queue / runtime
/// - executor
/// - (for `serve`) dev server, file watcher and Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<ExitCode> {
    let mut cfg = load_for_cli(args.config.as_deref())?;
    if args.fail_fast {
        cfg.config.failure_policy = FailurePolicy::FailFast;
    }
    if let Some(port) = args.port {
        cfg.serve.port = port;
    }
    if args.drafts {
        cfg.serve.drafts = true;
    }

    let root = project_root(args.config.as_deref());
    let ctx = SiteContext::new(root, Arc::new(RealFileSystem))
        .with_env(Environment::from_env())
        .with_variables(Variables::new(&cfg.variables));
    debug!(root = %ctx.root.display(), env = ?ctx.env, "project context");

    let graph = pipeline::build_graph(&cfg, &ctx);
    graph.validate()?;

    if args.list {
        print_task_list(&graph);
        return Ok(ExitCode::SUCCESS);
    }

    let task = args.task.clone().unwrap_or_else(|| cfg.config.default.clone());

    if task == SERVE {
        if args.dry_run {
            let roots = vec![pipeline::BUILD.to_string()];
            print_plan(&graph.plan(&roots)?, &roots);
            return Ok(ExitCode::SUCCESS);
        }
        return serve(cfg, ctx, graph).await;
    }

    let roots = vec![task];
    let plan = graph.plan(&roots)?;

    if args.dry_run {
        print_plan(&plan, &roots);
        return Ok(ExitCode::SUCCESS);
    }

    let shutdown = spawn_ctrl_c();
    let report = run_graph(Arc::new(graph), plan, &roots, &cfg, true, shutdown).await?;
    if fails_process(&report, cfg.config.failure_policy) {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Directory relative config paths resolve against.
///
/// - If the config path has a non-empty parent (e.g. "site/Sitewright.toml"),
///   we use that directory.
/// - Otherwise we use the current working directory.
fn project_root(config_path: Option<&Path>) -> PathBuf {
    let root = match config_path.and_then(Path::parent) {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };
    root.canonicalize().unwrap_or(root)
}

/// Ctrl-C flips the returned flag to `true`.
fn spawn_ctrl_c() -> flag::Receiver<bool> {
    let (tx, rx) = flag::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C: {e}");
            return;
        }
        info!("Ctrl+C received; shutting down");
        let _ = tx.send(true);
    });
    rx
}

/// Run `roots` over `dag` until the runtime exits and return its report.
async fn run_graph(
    graph: Arc<TaskGraph>,
    dag: DagGraph,
    roots: &[String],
    cfg: &ConfigFile,
    exit_when_idle: bool,
    mut shutdown: flag::Receiver<bool>,
) -> Result<RunReport> {
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let executor = RealExecutorBackend::new(graph, rt_tx.clone());

    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            let stopped = shutdown.wait_for(|stop| *stop).await.is_ok();
            if stopped {
                let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
            }
        });
    }

    info!(?roots, "running");
    for task in roots {
        rt_tx
            .send(RuntimeEvent::TaskTriggered {
                task: task.clone(),
                reason: TriggerReason::Manual,
            })
            .await?;
    }

    let scheduler = Scheduler::new(dag, cfg.config.failure_policy);
    let options = RuntimeOptions { exit_when_idle };
    let core = CoreRuntime::new(scheduler, cfg.config.queue_length, options);

    let report = Runtime::new(core, rt_rx, executor).run().await?;
    log_report(&report);
    Ok(report)
}

/// `serve`: build once, then serve the site and rebuild on changes until
/// Ctrl-C.
async fn serve(cfg: ConfigFile, ctx: SiteContext, graph: TaskGraph) -> Result<ExitCode> {
    let shutdown = spawn_ctrl_c();

    let roots = vec![pipeline::BUILD.to_string()];
    let plan = graph.plan(&roots)?;
    run_graph(Arc::new(graph), plan, &roots, &cfg, true, shutdown.clone()).await?;
    if *shutdown.borrow() {
        return Ok(ExitCode::SUCCESS);
    }

    let hub = LiveReload::new();
    let binding_configs = pipeline::watch_bindings(&cfg, cfg.serve.drafts);

    let mut watch_graph = pipeline::build_graph(&cfg, &ctx);
    pipeline::register_reload_nodes(&mut watch_graph, &binding_configs, &hub);
    watch_graph.validate()?;
    let dag = watch_graph.dag();
    let watch_graph = Arc::new(watch_graph);

    let bindings = watch::compile_bindings(ctx.fs.as_ref(), &ctx.root, &binding_configs)?;

    let site_dir = ctx.resolve(&cfg.paths.site_dir);
    let server = DevServer::bind(&cfg.serve.host, cfg.serve.port, site_dir, hub).await?;
    let server_task = {
        let mut stop = shutdown.clone();
        tokio::spawn(server.serve(async move {
            let _ = stop.wait_for(|stop| *stop).await;
        }))
    };

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let executor = RealExecutorBackend::new(watch_graph, rt_tx.clone());
    let _watcher = watch::spawn_watcher(&ctx.root, bindings, rt_tx.clone())?;

    {
        let tx = rt_tx.clone();
        let mut stop = shutdown.clone();
        tokio::spawn(async move {
            let stopped = stop.wait_for(|stop| *stop).await.is_ok();
            if stopped {
                let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
            }
        });
    }

    let scheduler = Scheduler::new(dag, cfg.config.failure_policy);
    let options = RuntimeOptions {
        exit_when_idle: false,
    };
    let core = CoreRuntime::new(scheduler, cfg.config.queue_length, options);
    // Each settled rebuild is logged by the runtime as it finishes.
    Runtime::new(core, rt_rx, executor).run().await?;

    server_task.await??;
    Ok(ExitCode::SUCCESS)
}

fn log_report(report: &RunReport) {
    if report.is_success() {
        info!(tasks = report.succeeded.len(), "all tasks succeeded");
    } else {
        warn!(
            failed = ?report.failed,
            skipped = ?report.skipped,
            "some tasks failed"
        );
    }
}

/// Failures only change the exit status under fail-fast.
fn fails_process(report: &RunReport, policy: FailurePolicy) -> bool {
    policy == FailurePolicy::FailFast && !report.is_success()
}

/// `--list`: every task and pipeline with its dependencies.
fn print_task_list(graph: &TaskGraph) {
    println!("tasks:");
    for unit in graph.units() {
        if unit.name.starts_with("watch:") {
            continue;
        }
        println!("  {:<22} {}", unit.name, unit.description);
        if !unit.deps.is_empty() {
            println!("  {:<22}   after: {}", "", unit.deps.join(", "));
        }
    }

    println!();
    println!("pipelines:");
    for pipeline in graph.pipelines() {
        println!("  {:<22} {}", pipeline.name, pipeline.description);
        for (i, stage) in pipeline.stages.iter().enumerate() {
            println!("  {:<22}   {}. {}", "", i + 1, stage.join(", "));
        }
    }
    println!("  {:<22} Build, then serve with live reload", SERVE);
}

/// `--dry-run`: the levels the requested roots would run in.
fn print_plan(dag: &DagGraph, roots: &[String]) {
    println!("sitewright dry-run: {}", roots.join(", "));
    for (i, level) in dag.levels(roots).iter().enumerate() {
        println!("  {}. {}", i + 1, level.join(", "));
    }
    debug!("dry-run complete (no execution)");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(failed: &[&str]) -> RunReport {
        RunReport {
            succeeded: vec!["clean".into()],
            failed: failed.iter().map(|s| s.to_string()).collect(),
            skipped: vec![],
        }
    }

    #[test]
    fn failures_only_fail_the_process_under_fail_fast() {
        let failed = report(&["build:styles"]);
        assert!(!fails_process(&failed, FailurePolicy::Continue));
        assert!(fails_process(&failed, FailurePolicy::FailFast));
        assert!(!fails_process(&report(&[]), FailurePolicy::FailFast));
    }

    #[test]
    fn explicit_config_dir_is_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = dir.path().join("Sitewright.toml");
        assert_eq!(
            project_root(Some(&cfg)),
            dir.path().canonicalize().unwrap()
        );
    }
}
