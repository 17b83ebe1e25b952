// src/dag/state_manager.rs

//! Per-run state management for tasks in the scheduler.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo};
use crate::dag::DagGraph;
use crate::engine::TaskName;
use crate::types::FailurePolicy;

/// Manages per-run state transitions for tasks.
pub struct StateManager<'a> {
    graph: &'a DagGraph,
    tasks: &'a mut HashMap<TaskName, TaskInfo>,
    current_run_id: Option<u64>,
    policy: FailurePolicy,
}

impl<'a> StateManager<'a> {
    pub fn new(
        graph: &'a DagGraph,
        tasks: &'a mut HashMap<TaskName, TaskInfo>,
        current_run_id: Option<u64>,
        policy: FailurePolicy,
    ) -> Self {
        Self {
            graph,
            tasks,
            current_run_id,
            policy,
        }
    }

    /// Include a triggered task and all its transitive prerequisites in this
    /// run.
    ///
    /// - Tasks that were not yet part of the run (`run_state == None`) are
    ///   marked `Pending`.
    /// - Tasks already participating in this run keep their current state.
    pub fn mark_task_and_prerequisites_pending(&mut self, root: &str) {
        let mut stack: Vec<TaskName> = vec![root.to_string()];
        let mut visited: HashSet<TaskName> = HashSet::new();

        while let Some(name) = stack.pop() {
            if !visited.insert(name.clone()) {
                continue;
            }

            if let Some(info) = self.tasks.get_mut(&name) {
                if info.run_state.is_none() {
                    info.run_state = Some(RunState::Pending);
                    debug!(task = %info.name, "marked Pending for this run");
                }

                stack.extend(self.graph.dependencies_of(&name).iter().cloned());
            } else {
                warn!(task = %name, "node in DAG not present in tasks map");
            }
        }
    }

    /// Determine whether all prerequisites of the given task have settled for
    /// the *current run*.
    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        let ro = ReadOnlyStateManager::new(self.tasks, self.policy);
        ro.deps_satisfied_for_info(info)
    }

    /// Mark all pending dependents (transitively) of a failed task as
    /// `DoneFailed` for this run.
    ///
    /// Only used under [`FailurePolicy::FailFast`]. Returns the tasks that were
    /// newly marked as failed, excluding the root.
    pub fn mark_dependents_failed(&mut self, failed_task: &str) -> Vec<TaskName> {
        let mut stack: Vec<TaskName> = self
            .graph
            .dependents_of(failed_task)
            .iter()
            .cloned()
            .collect();

        let mut skipped = Vec::new();

        while let Some(name) = stack.pop() {
            if let Some(info) = self.tasks.get_mut(&name) {
                // A dependent cannot be Running while its prerequisite was
                // still running, so Pending is the only state to handle.
                if info.run_state == Some(RunState::Pending) {
                    info.run_state = Some(RunState::DoneFailed);
                    debug!(
                        task = %info.name,
                        "marking dependent as DoneFailed due to upstream failure"
                    );
                    skipped.push(info.name.clone());
                    stack.extend(self.graph.dependents_of(&name).iter().cloned());
                }
            }
        }

        skipped
    }

    /// Collect tasks that are `Pending` and whose prerequisites have settled,
    /// mark them as `Running`, and return them as `ScheduledTask`s.
    pub fn collect_new_ready_tasks(&mut self) -> Vec<ScheduledTask> {
        let mut ready = Vec::new();

        // Decide first, then mutate to avoid borrowing issues.
        let mut candidates: Vec<TaskName> = self
            .tasks
            .values()
            .filter_map(|info| {
                if matches!(info.run_state, Some(RunState::Pending))
                    && self.deps_satisfied_for_info(info)
                {
                    Some(info.name.clone())
                } else {
                    None
                }
            })
            .collect();
        candidates.sort();

        for name in candidates {
            if let Some(info) = self.tasks.get_mut(&name) {
                if info.has_settled_before() {
                    info!(
                        task = %info.name,
                        run_id = self.current_run_id,
                        "scheduling task for re-run"
                    );
                } else {
                    debug!(
                        task = %info.name,
                        run_id = self.current_run_id,
                        "prerequisites settled; scheduling task"
                    );
                }

                info.run_state = Some(RunState::Running);
                ready.push(ScheduledTask::from_task_info(
                    info,
                    self.current_run_id.unwrap_or(0),
                ));
            }
        }

        ready
    }

    /// Check if all tasks are in a terminal state.
    pub fn all_tasks_terminal(&self) -> bool {
        !self.tasks.values().any(|info| {
            matches!(
                info.run_state,
                Some(RunState::Pending) | Some(RunState::Running)
            )
        })
    }
}

/// A read-only view of the state manager for checking dependency satisfaction.
///
/// This is used when we only have shared access to the tasks map (e.g. in
/// `Scheduler::deps_satisfied`).
pub struct ReadOnlyStateManager<'a> {
    tasks: &'a HashMap<TaskName, TaskInfo>,
    policy: FailurePolicy,
}

impl<'a> ReadOnlyStateManager<'a> {
    pub fn new(tasks: &'a HashMap<TaskName, TaskInfo>, policy: FailurePolicy) -> Self {
        Self { tasks, policy }
    }

    /// A prerequisite is settled once it finished in this run. Under
    /// `continue` a failed prerequisite counts as settled; under `fail-fast`
    /// it never does.
    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        for dep_name in &info.deps {
            let dep = match self.tasks.get(dep_name) {
                Some(d) => d,
                None => {
                    warn!(
                        task = %info.name,
                        dep = %dep_name,
                        "dependency missing from tasks map"
                    );
                    return false;
                }
            };

            match dep.run_state {
                Some(RunState::DoneSuccess) => {}
                Some(RunState::DoneFailed) => {
                    if self.policy == FailurePolicy::FailFast {
                        return false;
                    }
                }
                Some(RunState::Pending) | Some(RunState::Running) => return false,
                None => {
                    // Not part of this run; rely on history.
                    if !dep.has_settled_before() {
                        return false;
                    }
                }
            }
        }

        true
    }
}
