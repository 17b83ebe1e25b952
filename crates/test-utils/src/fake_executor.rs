use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use sitewright::dag::ScheduledTask;
use sitewright::engine::{RuntimeEvent, TaskOutcome};
use sitewright::errors::Result;
use sitewright::exec::ExecutorBackend;
use tokio::sync::mpsc;

/// A fake executor that:
/// - records which tasks were "run"
/// - immediately reports `TaskCompleted` for each scheduled task, failing
///   the ones listed in `failing`.
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<String>>>,
    failing: HashSet<String>,
}

impl FakeExecutor {
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        executed: Arc<Mutex<Vec<String>>>,
    ) -> Self {
        Self {
            runtime_tx,
            executed,
            failing: HashSet::new(),
        }
    }

    pub fn failing(mut self, tasks: &[&str]) -> Self {
        self.failing.extend(tasks.iter().map(|t| t.to_string()));
        self
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);
        let failing = self.failing.clone();

        Box::pin(async move {
            for t in tasks {
                executed.lock().unwrap().push(t.name.clone());

                let outcome = if failing.contains(&t.name) {
                    TaskOutcome::Failed
                } else {
                    TaskOutcome::Success
                };
                tx.send(RuntimeEvent::TaskCompleted {
                    task: t.name.clone(),
                    outcome,
                })
                .await
                .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}
