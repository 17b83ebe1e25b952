// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use tracing::{debug, info, warn};

use crate::dag::{ScheduledTask, Scheduler};
use crate::engine::queue::TriggerQueue;
use crate::engine::{RunReport, RuntimeOptions, TaskName, TaskOutcome, TriggerReason};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Send these tasks to the executor.
    DispatchTasks(Vec<ScheduledTask>),
    /// Request that the runtime exits (one-shot runs, once idle).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

/// Handle a task trigger event.
///
/// - If the scheduler is idle, we start a new run from the oldest queued
///   batch, which this trigger joins.
/// - If a run is active:
///   - If `task` or one of its prerequisites already participates in this
///     run, the trigger is queued for a *future* run (single-flight).
///   - Otherwise we MERGE it into the current run, so unrelated roots share
///     the same run_id and run in parallel.
pub fn handle_task_trigger(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    task: TaskName,
    reason: TriggerReason,
) -> CoreStep {
    let mut commands = Vec::new();

    if scheduler.is_idle() {
        // Queued batches keep their order; this trigger joins the newest.
        queue.record_trigger(&task);
        commands.append(&mut maybe_start_queued_run(scheduler, queue));

        return CoreStep {
            commands,
            keep_running: true,
        };
    }

    match scheduler.overlaps_current_run(&task) {
        None => {
            debug!(task = %task, ?reason, "trigger for unknown task; ignoring");
        }
        Some(false) => {
            debug!(task = %task, ?reason, "merging trigger into active run");
            let newly_ready = scheduler.handle_trigger(&task);
            if !newly_ready.is_empty() {
                commands.push(CoreCommand::DispatchTasks(newly_ready));
            }
        }
        Some(true) => {
            debug!(task = %task, ?reason, "task already in active run; queueing trigger");
            queue.record_trigger(&task);
        }
    }

    CoreStep {
        commands,
        keep_running: true,
    }
}

/// Handle a task completion event.
pub fn handle_task_completion(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    options: &RuntimeOptions,
    report: &mut RunReport,
    task: TaskName,
    outcome: TaskOutcome,
) -> CoreStep {
    let mut commands = Vec::new();

    let step = scheduler.step_completion(&task, outcome);
    if outcome == TaskOutcome::Success {
        report.succeeded.push(task.clone());
    }
    report.failed.extend(step.failed);
    report.skipped.extend(step.skipped);
    if !step.ready.is_empty() {
        commands.push(CoreCommand::DispatchTasks(step.ready));
    }

    // A long-lived runtime reports per run instead of growing forever.
    if step.run_finished && !options.exit_when_idle {
        log_settled_run(&std::mem::take(report));
    }

    commands.append(&mut maybe_start_queued_run(scheduler, queue));

    let mut keep_running = true;
    if options.exit_when_idle && scheduler.is_idle() && queue.is_empty() {
        keep_running = false;
        commands.push(CoreCommand::RequestExit);
    }

    CoreStep {
        commands,
        keep_running,
    }
}

fn log_settled_run(report: &RunReport) {
    if report.is_success() {
        info!(tasks = report.succeeded.len(), "rebuild finished");
    } else {
        warn!(
            failed = ?report.failed,
            skipped = ?report.skipped,
            "rebuild finished with failures"
        );
    }
}

/// Seed a new run from initial root triggers.
pub fn start_new_run_from_triggers(scheduler: &mut Scheduler, triggers: Vec<TaskName>) -> CoreStep {
    let mut commands = Vec::new();

    if triggers.is_empty() {
        return CoreStep {
            commands,
            keep_running: true,
        };
    }

    scheduler.start_new_run();

    let mut all_ready = Vec::new();
    for task in triggers {
        all_ready.extend(scheduler.handle_trigger(&task));
    }

    if !all_ready.is_empty() {
        commands.push(CoreCommand::DispatchTasks(all_ready));
    }

    CoreStep {
        commands,
        keep_running: true,
    }
}

/// If the scheduler is idle and there are queued triggers, start a new run.
fn maybe_start_queued_run(scheduler: &mut Scheduler, queue: &mut TriggerQueue) -> Vec<CoreCommand> {
    if !scheduler.is_idle() {
        return Vec::new();
    }

    let mut commands = Vec::new();
    // A batch of unknown names settles at once; move on to the next one.
    while scheduler.is_idle() {
        let Some(triggers) = queue.pop_next() else {
            break;
        };
        commands.append(&mut start_new_run_from_triggers(scheduler, triggers).commands);
    }
    commands
}
