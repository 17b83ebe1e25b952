// src/dag/scheduler_step.rs

use crate::dag::task_info::ScheduledTask;
use crate::engine::TaskName;

/// What changed in the scheduler after one trigger or completion.
///
/// The runtime folds `failed` and `skipped` into its [`RunReport`], and
/// dispatches `ready`.
///
/// [`RunReport`]: crate::engine::RunReport
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Tasks whose prerequisites have all settled.
    pub ready: Vec<ScheduledTask>,
    /// The completed task, when it failed.
    pub failed: Option<TaskName>,
    /// Dependents marked failed without running (fail-fast only).
    pub skipped: Vec<TaskName>,
    /// The run settled with this step.
    pub run_finished: bool,
}
