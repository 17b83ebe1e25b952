// src/engine/queue.rs

use std::collections::{HashSet, VecDeque};

use tracing::{debug, warn};

use super::TaskName;

/// Queue of triggers that arrive while a run is already executing.
///
/// Semantics:
/// - Each queued entry is a *batch*: the reload nodes one follow-up run
///   starts with. Batches start one at a time, oldest first.
/// - A trigger joins the last batch unless that batch already holds it.
///   A repeat trigger means files changed again after the batch was
///   formed, so it seals the batch and opens a new one.
/// - `max_runs` (`[config].queue_length`, default 1) bounds the number of
///   batches. Once full, triggers coalesce into the last batch, so a burst
///   of changes while a task runs never queues more than `max_runs`
///   follow-up runs.
#[derive(Debug)]
pub struct TriggerQueue {
    max_runs: usize,
    runs: VecDeque<HashSet<TaskName>>,
}

impl TriggerQueue {
    /// `max_runs` is clamped to at least 1, as a zero-length queue would make
    /// queuing semantics meaningless.
    pub fn new(max_runs: usize) -> Self {
        Self {
            max_runs: max_runs.max(1),
            runs: VecDeque::new(),
        }
    }

    /// Returns true if there are no queued triggers.
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Number of queued follow-up runs.
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Record that a task was triggered while a run is in progress.
    pub fn record_trigger(&mut self, task: &str) {
        let sealed = self
            .runs
            .back()
            .is_none_or(|last| last.contains(task));

        if sealed && self.runs.len() < self.max_runs {
            self.runs.push_back(HashSet::from([task.to_string()]));
            debug!(task = %task, batches = self.runs.len(), "opened queued batch");
            return;
        }

        if let Some(last) = self.runs.back_mut() {
            let inserted = last.insert(task.to_string());
            if sealed {
                warn!(
                    task = %task,
                    max_runs = self.max_runs,
                    "queue_length reached; coalescing into the last queued run"
                );
            } else {
                debug!(task = %task, inserted, "merged trigger into last queued batch");
            }
        }
    }

    /// Take the oldest batch, sorted, or `None` when nothing is queued.
    pub fn pop_next(&mut self) -> Option<Vec<TaskName>> {
        let batch = self.runs.pop_front()?;
        let mut tasks: Vec<TaskName> = batch.into_iter().collect();
        tasks.sort();
        debug!(tasks = ?tasks, remaining = self.runs.len(), "starting queued run");
        Some(tasks)
    }
}
