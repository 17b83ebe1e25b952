// src/dag/scheduler.rs

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::dag::graph::DagGraph;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::{ReadOnlyStateManager, StateManager};
use crate::dag::task_info::{ScheduledTask, TaskInfo, TaskRunState};
use crate::engine::{TaskName, TaskOutcome};
use crate::types::FailurePolicy;

/// Scheduler holds the immutable DAG plus mutable per-run state.
///
/// It is responsible for:
/// - remembering which tasks are part of the current run
/// - deciding when a triggered task is "ready" to run (prerequisites settled)
/// - marking tasks as succeeded/failed
/// - failing dependents when a task fails under `fail-fast`
#[derive(Debug)]
pub struct Scheduler {
    graph: DagGraph,
    tasks: HashMap<TaskName, TaskInfo>,
    policy: FailurePolicy,
    /// Monotonically increasing run ID.
    run_counter: u64,
    /// Currently active run ID, or `None` if there is no active run.
    current_run_id: Option<u64>,
}

impl Scheduler {
    pub fn new(graph: DagGraph, policy: FailurePolicy) -> Self {
        let tasks = graph
            .tasks()
            .map(|name| {
                let deps = graph.dependencies_of(name).to_vec();
                (name.to_string(), TaskInfo::new(name.to_string(), deps))
            })
            .collect();

        Self {
            graph,
            tasks,
            policy,
            run_counter: 0,
            current_run_id: None,
        }
    }

    /// Returns `true` if there is currently no active run.
    pub fn is_idle(&self) -> bool {
        self.current_run_id.is_none()
    }

    /// Current run ID, if any.
    pub fn current_run_id(&self) -> Option<u64> {
        self.current_run_id
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn graph(&self) -> &DagGraph {
        &self.graph
    }

    /// Read-only view of the given task's run state.
    pub fn run_state_of(&self, task: &str) -> Option<TaskRunState> {
        let info = self.tasks.get(task)?;
        Some(info.run_state.into())
    }

    /// Names of tasks that are currently participating in the *active* run.
    ///
    /// If there is no active run this returns an empty vector, even though
    /// tasks may still have a terminal `run_state` from the previous run.
    pub fn tasks_in_current_run(&self) -> Vec<TaskName> {
        if self.current_run_id.is_none() {
            return Vec::new();
        }

        self.tasks
            .values()
            .filter(|info| info.run_state.is_some())
            .map(|info| info.name.clone())
            .collect()
    }

    /// Whether triggering `task` would touch the active run: the task itself
    /// or any of its transitive prerequisites already participates in it.
    ///
    /// Returns `None` if the task is unknown.
    pub fn overlaps_current_run(&self, task: &str) -> Option<bool> {
        if !self.tasks.contains_key(task) {
            return None;
        }
        if self.current_run_id.is_none() {
            return Some(false);
        }
        Some(
            self.graph
                .prerequisite_closure(task)
                .iter()
                .filter_map(|name| self.tasks.get(name))
                .any(|info| info.run_state.is_some()),
        )
    }

    /// Whether the prerequisites of `task` have settled for the *current run*.
    ///
    /// Returns `None` if the task is unknown.
    pub fn deps_satisfied(&self, task: &str) -> Option<bool> {
        let info = self.tasks.get(task)?;
        let mgr = ReadOnlyStateManager::new(&self.tasks, self.policy);
        Some(mgr.deps_satisfied_for_info(info))
    }

    /// Start a new run, resetting per-run state but keeping history.
    pub fn start_new_run(&mut self) {
        self.run_counter += 1;
        self.current_run_id = Some(self.run_counter);

        for info in self.tasks.values_mut() {
            info.run_state = None;
        }

        debug!(run_id = self.run_counter, "scheduler: starting new run");
    }

    /// Handle a trigger for a task name (production API).
    pub fn handle_trigger(&mut self, task: &str) -> Vec<ScheduledTask> {
        self.trigger_step_internal(task).ready
    }

    /// Handle completion of a task with a concrete outcome (production API).
    pub fn handle_completion(&mut self, task: &str, outcome: TaskOutcome) -> Vec<ScheduledTask> {
        self.completion_step_internal(task, outcome).ready
    }

    /// Manual-step variant of `handle_trigger` that returns a rich [`SchedulerStep`].
    pub fn step_trigger(&mut self, task: &str) -> SchedulerStep {
        self.trigger_step_internal(task)
    }

    /// Manual-step variant of `handle_completion` that returns a rich [`SchedulerStep`].
    pub fn step_completion(&mut self, task: &str, outcome: TaskOutcome) -> SchedulerStep {
        self.completion_step_internal(task, outcome)
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.graph.tasks()
    }

    /// Clear `current_run_id` once every task is terminal.
    ///
    /// Returns `true` if this call transitioned the scheduler from running
    /// to idle.
    fn maybe_finish_run(&mut self) -> bool {
        if self.current_run_id.is_none() {
            return false;
        }

        let manager = self.manager();

        if manager.all_tasks_terminal() {
            info!(
                run_id = self.current_run_id,
                "scheduler: all tasks settled; run finished"
            );
            self.current_run_id = None;
            true
        } else {
            false
        }
    }

    fn manager(&mut self) -> StateManager<'_> {
        StateManager::new(&self.graph, &mut self.tasks, self.current_run_id, self.policy)
    }

    fn trigger_step_internal(&mut self, task: &str) -> SchedulerStep {
        if self.current_run_id.is_none() {
            debug!(
                task = %task,
                "trigger with no active run; implicitly starting a new run"
            );
            self.start_new_run();
        }

        if self.tasks.contains_key(task) {
            self.manager().mark_task_and_prerequisites_pending(task);
        } else {
            warn!(task = %task, "trigger for unknown task; ignoring");
        }

        SchedulerStep {
            ready: self.manager().collect_new_ready_tasks(),
            run_finished: self.maybe_finish_run(),
            ..SchedulerStep::default()
        }
    }

    fn completion_step_internal(&mut self, task: &str, outcome: TaskOutcome) -> SchedulerStep {
        let run_id = match self.current_run_id {
            Some(id) => id,
            None => {
                warn!(
                    task = %task,
                    "completion with no active run; ignoring"
                );
                return SchedulerStep::default();
            }
        };

        let mut step = SchedulerStep::default();

        match self.tasks.get_mut(task) {
            Some(info) => match outcome {
                TaskOutcome::Success => {
                    info.settle(run_id, true);
                    debug!(task = %info.name, run_id, "task completed successfully");
                }
                TaskOutcome::Failed => {
                    info.settle(run_id, false);
                    step.failed = Some(info.name.clone());
                    if self.policy == FailurePolicy::FailFast {
                        warn!(task = %task, run_id, "task failed; failing dependents in this run");
                        step.skipped = self.manager().mark_dependents_failed(task);
                    } else {
                        debug!(task = %task, run_id, "task failed; dependents still run");
                    }
                }
            },
            None => {
                warn!(task = %task, "completion for unknown task; ignoring");
            }
        }

        step.ready = self.manager().collect_new_ready_tasks();
        step.run_finished = self.maybe_finish_run();
        step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet};

    fn scheduler(edges: &[(&str, &[&str])], policy: FailurePolicy) -> Scheduler {
        let deps: BTreeMap<String, BTreeSet<String>> = edges
            .iter()
            .map(|(t, d)| (t.to_string(), d.iter().map(|s| s.to_string()).collect()))
            .collect();
        Scheduler::new(DagGraph::from_deps(deps), policy)
    }

    fn names(tasks: &[ScheduledTask]) -> Vec<&str> {
        tasks.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn trigger_pulls_in_prerequisites_not_dependents() {
        let mut s = scheduler(
            &[("clean", &[]), ("styles", &["clean"]), ("site", &["styles"])],
            FailurePolicy::Continue,
        );

        let step = s.step_trigger("styles");
        assert_eq!(names(&step.ready), vec!["clean"]);
        assert_eq!(s.run_state_of("site"), Some(TaskRunState::NotInRun));

        let step = s.step_completion("clean", TaskOutcome::Success);
        assert_eq!(names(&step.ready), vec!["styles"]);

        let step = s.step_completion("styles", TaskOutcome::Success);
        assert!(step.run_finished);
        assert!(s.is_idle());
    }

    #[test]
    fn continue_policy_runs_dependents_of_failed_tasks() {
        let mut s = scheduler(&[("a", &[]), ("b", &["a"])], FailurePolicy::Continue);
        s.handle_trigger("b");

        let step = s.step_completion("a", TaskOutcome::Failed);
        assert_eq!(step.failed.as_deref(), Some("a"));
        assert!(step.skipped.is_empty());
        assert_eq!(names(&step.ready), vec!["b"]);
    }

    #[test]
    fn fail_fast_policy_blocks_dependents() {
        let mut s = scheduler(
            &[("a", &[]), ("b", &["a"]), ("c", &["b"])],
            FailurePolicy::FailFast,
        );
        s.handle_trigger("c");

        let step = s.step_completion("a", TaskOutcome::Failed);
        assert!(step.ready.is_empty());
        assert_eq!(step.failed.as_deref(), Some("a"));
        let mut skipped = step.skipped.clone();
        skipped.sort();
        assert_eq!(skipped, vec!["b", "c"]);
        assert!(step.run_finished);
    }

    #[test]
    fn overlap_checks_prerequisites() {
        let mut s = scheduler(
            &[("a", &[]), ("b", &["a"]), ("x", &[])],
            FailurePolicy::Continue,
        );
        assert_eq!(s.overlaps_current_run("b"), Some(false));

        s.handle_trigger("a");
        assert_eq!(s.overlaps_current_run("b"), Some(true));
        assert_eq!(s.overlaps_current_run("x"), Some(false));
        assert_eq!(s.overlaps_current_run("missing"), None);
    }
}
