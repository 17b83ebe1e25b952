// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::dag::ScheduledTask;
use crate::errors::Result;
use crate::exec::ExecutorBackend;

use super::core::CoreRuntime;
use super::{CoreCommand, RunReport, RuntimeEvent};

/// Drives the DAG scheduler in response to `RuntimeEvent`s,
/// and delegates actual task execution to an `ExecutorBackend`.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// runtime semantics. This struct handles async IO: reading events from
/// channels and dispatching tasks to the executor.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
        }
    }

    /// Main event loop.
    ///
    /// Consumes `RuntimeEvent`s, feeds them into the core runtime and
    /// executes the commands it returns. Returns the accumulated
    /// [`RunReport`] once the core asks to stop or the channel closes.
    pub async fn run(mut self) -> Result<RunReport> {
        debug!("runtime started");

        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    debug!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");

            let step = self.core.step(event);

            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                debug!("core requested exit; stopping runtime");
                break;
            }
        }

        let report = self.core.into_report();
        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "runtime exiting"
        );
        Ok(report)
    }

    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::DispatchTasks(tasks) => self.spawn_ready(tasks).await,
            // keep_running is already false alongside this command.
            CoreCommand::RequestExit => Ok(()),
        }
    }

    async fn spawn_ready(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let names: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
        debug!(?names, run_id = tasks[0].run_id, "dispatching ready tasks");

        self.executor.spawn_ready_tasks(tasks).await
    }
}
