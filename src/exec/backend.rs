// src/exec/backend.rs

//! Where the runtime sends ready units.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::dag::ScheduledTask;
use crate::engine::RuntimeEvent;
use crate::errors::{Result, SiteError};
use crate::task::TaskGraph;

use super::executor_loop::spawn_executor;

/// Receives every batch of ready units from the runtime.
///
/// A backend must eventually answer each unit with a
/// `RuntimeEvent::TaskCompleted`, or the run never settles.
pub trait ExecutorBackend: Send {
    /// Dispatch the given tasks for execution.
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Runs the graph's [`TaskAction`](crate::task::TaskAction)s through the
/// executor loop from [`spawn_executor`].
pub struct RealExecutorBackend {
    tx: mpsc::Sender<ScheduledTask>,
}

impl RealExecutorBackend {
    /// Spawns the executor loop right away.
    pub fn new(graph: Arc<TaskGraph>, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        let tx = spawn_executor(graph, runtime_tx);
        Self { tx }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.tx.clone();
        Box::pin(async move {
            for task in tasks {
                tx.send(task)
                    .await
                    .map_err(|e| SiteError::Other(anyhow::anyhow!("executor channel closed: {e}")))?;
            }
            Ok(())
        })
    }
}
