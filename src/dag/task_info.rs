// src/dag/task_info.rs

//! Scheduler-side view of a task unit.

use crate::engine::TaskName;

/// Where a unit stands within the active run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Task was triggered for this run but is waiting on prerequisites.
    Pending,
    /// Task has been dispatched to the executor and is currently running.
    Running,
    /// Task finished successfully in this run.
    DoneSuccess,
    /// Task failed in this run (or, under fail-fast, was blocked by a failed
    /// prerequisite).
    DoneFailed,
}

/// [`RunState`] plus "not in this run", as reported by
/// `Scheduler::run_state_of`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    /// The task is not currently participating in this run.
    NotInRun,
    Pending,
    Running,
    DoneSuccess,
    DoneFailed,
}

impl From<Option<RunState>> for TaskRunState {
    fn from(state: Option<RunState>) -> Self {
        match state {
            None => TaskRunState::NotInRun,
            Some(RunState::Pending) => TaskRunState::Pending,
            Some(RunState::Running) => TaskRunState::Running,
            Some(RunState::DoneSuccess) => TaskRunState::DoneSuccess,
            Some(RunState::DoneFailed) => TaskRunState::DoneFailed,
        }
    }
}

/// A graph node as the scheduler sees it.
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub name: TaskName,
    pub deps: Vec<TaskName>,
    /// `None` while the unit is outside the current run.
    pub run_state: Option<RunState>,
    /// Run in which the unit last settled, whatever the outcome.
    pub last_settled_run: Option<u64>,
}

impl TaskInfo {
    pub fn new(name: TaskName, deps: Vec<TaskName>) -> Self {
        Self {
            name,
            deps,
            run_state: None,
            last_settled_run: None,
        }
    }

    /// Settled in some earlier run of this process.
    pub fn has_settled_before(&self) -> bool {
        self.last_settled_run.is_some()
    }

    pub fn settle(&mut self, run_id: u64, success: bool) {
        self.run_state = Some(if success {
            RunState::DoneSuccess
        } else {
            RunState::DoneFailed
        });
        self.last_settled_run = Some(run_id);
    }
}

/// A unit handed to the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub name: TaskName,
    pub run_id: u64,
}

impl ScheduledTask {
    pub fn from_task_info(info: &TaskInfo, run_id: u64) -> Self {
        Self {
            name: info.name.clone(),
            run_id,
        }
    }
}
