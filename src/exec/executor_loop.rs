// src/exec/executor_loop.rs

//! Main executor loop.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error};

use crate::dag::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::exec::task_runner::run_task;
use crate::task::TaskGraph;

/// Spawn the background executor loop.
///
/// The returned `mpsc::Sender<ScheduledTask>` is what `RealExecutorBackend`
/// sends to. Each scheduled task runs in its own Tokio task, so independent
/// tasks run in parallel, but **per task name there is never more than one
/// instance running at the same time**: a second request for a task that is
/// still running waits for the first instance to finish. Nothing is ever
/// cancelled.
pub fn spawn_executor(
    graph: Arc<TaskGraph>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> mpsc::Sender<ScheduledTask> {
    let (tx, mut rx) = mpsc::channel::<ScheduledTask>(64);

    tokio::spawn(async move {
        debug!("executor loop started");

        let mut slots: HashMap<String, Arc<Mutex<()>>> = HashMap::new();

        while let Some(task) = rx.recv().await {
            let Some(action) = graph.action_of(&task.name) else {
                error!(task = %task.name, "scheduled task has no registered action");
                let _ = runtime_tx
                    .send(RuntimeEvent::TaskCompleted {
                        task: task.name,
                        outcome: TaskOutcome::Failed,
                    })
                    .await;
                continue;
            };

            let slot = slots.entry(task.name.clone()).or_default().clone();
            let rt_tx = runtime_tx.clone();

            tokio::spawn(async move {
                let _guard = slot.lock().await;
                run_task(task, action, rt_tx).await;
            });
        }

        debug!("executor loop finished (channel closed)");
    });

    tx
}
