// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - sending `ScheduledTask`s to the executor
//! - handling Ctrl+C / shutdown
//!
//! The core is unit tested without any Tokio, channels, filesystem, or
//! processes.

use crate::dag::Scheduler;
use crate::engine::event_handlers::{handle_task_completion, handle_task_trigger, CoreStep};
use crate::engine::queue::TriggerQueue;
use crate::engine::{RunReport, RuntimeEvent, RuntimeOptions};

/// Pure core runtime state.
///
/// This owns:
/// - the DAG scheduler
/// - the trigger queue
/// - runtime options (e.g. `exit_when_idle`)
/// - the accumulated [`RunReport`]
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    queue: TriggerQueue,
    options: RuntimeOptions,
    report: RunReport,
}

impl CoreRuntime {
    pub fn new(scheduler: Scheduler, queue_length: usize, options: RuntimeOptions) -> Self {
        Self {
            scheduler,
            queue: TriggerQueue::new(queue_length),
            options,
            report: RunReport::default(),
        }
    }

    /// Expose whether the scheduler is idle (for tests).
    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    /// Expose queue emptiness (for tests).
    pub fn queue_is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn report(&self) -> &RunReport {
        &self.report
    }

    pub fn into_report(self) -> RunReport {
        self.report
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::TaskTriggered { task, reason } => {
                handle_task_trigger(&mut self.scheduler, &mut self.queue, task, reason)
            }
            RuntimeEvent::TaskCompleted { task, outcome } => handle_task_completion(
                &mut self.scheduler,
                &mut self.queue,
                &self.options,
                &mut self.report,
                task,
                outcome,
            ),
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::DagGraph;
    use crate::engine::{CoreCommand, TaskOutcome, TriggerReason};
    use crate::types::FailurePolicy;
    use std::collections::{BTreeMap, BTreeSet};

    fn core(edges: &[(&str, &[&str])], exit_when_idle: bool) -> CoreRuntime {
        core_with_queue(edges, exit_when_idle, 1)
    }

    fn core_with_queue(
        edges: &[(&str, &[&str])],
        exit_when_idle: bool,
        queue_length: usize,
    ) -> CoreRuntime {
        let deps: BTreeMap<String, BTreeSet<String>> = edges
            .iter()
            .map(|(t, d)| (t.to_string(), d.iter().map(|s| s.to_string()).collect()))
            .collect();
        CoreRuntime::new(
            Scheduler::new(DagGraph::from_deps(deps), FailurePolicy::Continue),
            queue_length,
            RuntimeOptions { exit_when_idle },
        )
    }

    fn trigger(task: &str) -> RuntimeEvent {
        RuntimeEvent::TaskTriggered {
            task: task.to_string(),
            reason: TriggerReason::FileWatch,
        }
    }

    fn done(task: &str, outcome: TaskOutcome) -> RuntimeEvent {
        RuntimeEvent::TaskCompleted {
            task: task.to_string(),
            outcome,
        }
    }

    fn dispatched(step: &CoreStep) -> Vec<String> {
        step.commands
            .iter()
            .filter_map(|c| match c {
                CoreCommand::DispatchTasks(tasks) => Some(tasks.iter().map(|t| t.name.clone())),
                _ => None,
            })
            .flatten()
            .collect()
    }

    #[test]
    fn retrigger_during_run_is_queued_once() {
        let mut core = core(&[("styles", &[]), ("watch:styles", &["styles"])], false);

        let step = core.step(trigger("watch:styles"));
        assert_eq!(dispatched(&step), vec!["styles"]);

        // Two more changes while styles is still compiling.
        assert!(dispatched(&core.step(trigger("watch:styles"))).is_empty());
        assert!(dispatched(&core.step(trigger("watch:styles"))).is_empty());
        assert!(!core.queue_is_empty());

        let step = core.step(done("styles", TaskOutcome::Success));
        assert_eq!(dispatched(&step), vec!["watch:styles"]);

        // The run settles and exactly one queued run starts.
        let step = core.step(done("watch:styles", TaskOutcome::Success));
        assert_eq!(dispatched(&step), vec!["styles"]);
        assert!(core.queue_is_empty());
    }

    #[test]
    fn longer_queue_keeps_separate_follow_up_runs() {
        let mut core = core_with_queue(&[("styles", &[]), ("watch:styles", &["styles"])], false, 2);

        core.step(trigger("watch:styles"));
        core.step(trigger("watch:styles"));
        core.step(trigger("watch:styles"));
        core.step(trigger("watch:styles"));

        let mut styles_runs = 1;
        let mut pending = vec!["styles".to_string()];
        while let Some(task) = pending.pop() {
            let step = core.step(done(&task, TaskOutcome::Success));
            let next = dispatched(&step);
            styles_runs += next.iter().filter(|t| *t == "styles").count();
            pending.extend(next);
        }

        assert_eq!(styles_runs, 3);
        assert!(core.queue_is_empty());
        assert!(core.scheduler().is_idle());
    }

    #[test]
    fn watch_mode_report_only_holds_the_current_run() {
        let mut core = core(&[("styles", &[]), ("watch:styles", &["styles"])], false);

        for _ in 0..3 {
            core.step(trigger("watch:styles"));
            core.step(done("styles", TaskOutcome::Success));
            core.step(done("watch:styles", TaskOutcome::Success));
            assert_eq!(core.report(), &RunReport::default());
        }

        core.step(trigger("watch:styles"));
        core.step(done("styles", TaskOutcome::Failed));
        assert_eq!(core.report().failed, vec!["styles".to_string()]);
    }

    #[test]
    fn disjoint_trigger_merges_into_active_run() {
        let mut core = core(&[("styles", &[]), ("site", &[])], false);
        core.step(trigger("styles"));

        let step = core.step(trigger("site"));
        assert_eq!(dispatched(&step), vec!["site"]);
        assert!(core.queue_is_empty());
    }

    #[test]
    fn report_collects_outcomes_and_exits_when_idle() {
        let mut core = core(&[("a", &[]), ("b", &["a"])], true);
        core.step(trigger("b"));
        core.step(done("a", TaskOutcome::Failed));
        let step = core.step(done("b", TaskOutcome::Success));

        assert!(!step.keep_running);
        assert_eq!(core.report().failed, vec!["a".to_string()]);
        assert_eq!(core.report().succeeded, vec!["b".to_string()]);
    }
}
