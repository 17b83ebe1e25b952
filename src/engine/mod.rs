// src/engine/mod.rs

//! Run orchestration.
//!
//! [`CoreRuntime`] is a synchronous state machine over [`RuntimeEvent`]s:
//! it owns the [`Scheduler`](crate::dag::Scheduler), queues reload triggers
//! that overlap the active run, and keeps the [`RunReport`]. [`Runtime`]
//! is the async shell that feeds it events and forwards its
//! [`CoreCommand`]s to an executor backend.

pub type TaskName = String;

/// Outcome of a task invocation for the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failed,
}

/// Why a task was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Requested on the command line (or the initial build of `serve`).
    Manual,
    /// Triggered due to a filesystem event matching a watch binding.
    FileWatch,
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// If true, exit the runtime once the DAG is idle and there are no
    /// queued triggers (used for one-shot CLI runs).
    pub exit_when_idle: bool,
}

/// Events flowing into the runtime from the CLI, watcher and executor.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A task should be (logically) triggered.
    TaskTriggered {
        task: TaskName,
        reason: TriggerReason,
    },
    /// A task invocation finished.
    TaskCompleted {
        task: TaskName,
        outcome: TaskOutcome,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

/// Which tasks succeeded and failed.
///
/// A runtime that exits when idle reports every invocation over its
/// lifetime. A long-lived one (`serve`) logs and clears the report each
/// time a run settles, so it only holds the run in progress.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub succeeded: Vec<TaskName>,
    pub failed: Vec<TaskName>,
    /// Tasks that never ran because a prerequisite failed (fail-fast only).
    pub skipped: Vec<TaskName>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::TriggerQueue;
pub use runtime::Runtime;
