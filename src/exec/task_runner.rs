// src/exec/task_runner.rs

//! Individual task runner.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::dag::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::task::TaskAction;

/// Run a single task action and emit a `TaskCompleted` event.
///
/// Errors from the action are logged with the task name and turned into a
/// failed outcome; they never propagate further.
pub async fn run_task(
    task: ScheduledTask,
    action: Arc<dyn TaskAction>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) {
    debug!(task = %task.name, run_id = task.run_id, "starting task");
    let started = Instant::now();

    let outcome = match action.execute().await {
        Ok(artifacts) => {
            info!(
                task = %task.name,
                run_id = task.run_id,
                artifacts = artifacts.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "task finished"
            );
            TaskOutcome::Success
        }
        Err(err) => {
            error!(
                task = %task.name,
                run_id = task.run_id,
                error = %err,
                "task failed"
            );
            TaskOutcome::Failed
        }
    };

    if runtime_tx
        .send(RuntimeEvent::TaskCompleted {
            task: task.name.clone(),
            outcome,
        })
        .await
        .is_err()
    {
        debug!(task = %task.name, "runtime gone before completion was delivered");
    }
}
