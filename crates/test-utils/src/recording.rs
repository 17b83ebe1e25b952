//! Task actions that record when they start and finish.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use sitewright::task::{ArtifactSet, TaskAction, TaskError, TaskFuture};

/// One entry in a [`Recorder`] log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Started(String),
    Finished(String),
}

/// Shared, ordered log of task starts and finishes.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    log: Arc<Mutex<Vec<Record>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, record: Record) {
        self.log.lock().unwrap().push(record);
    }

    pub fn records(&self) -> Vec<Record> {
        self.log.lock().unwrap().clone()
    }

    /// Task names in the order they started.
    pub fn started(&self) -> Vec<String> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                Record::Started(name) => Some(name),
                Record::Finished(_) => None,
            })
            .collect()
    }

    pub fn start_count(&self, task: &str) -> usize {
        self.started().iter().filter(|t| *t == task).count()
    }

    /// Position of the first `Started(task)` entry.
    pub fn start_index(&self, task: &str) -> Option<usize> {
        self.records()
            .iter()
            .position(|r| *r == Record::Started(task.to_string()))
    }

    /// Position of the last `Finished(task)` entry.
    pub fn finish_index(&self, task: &str) -> Option<usize> {
        self.records()
            .iter()
            .rposition(|r| *r == Record::Finished(task.to_string()))
    }

    /// Largest number of simultaneously running instances of `task`.
    pub fn max_concurrency(&self, task: &str) -> usize {
        let mut running = 0usize;
        let mut max = 0usize;
        for record in self.records() {
            match record {
                Record::Started(name) if name == task => {
                    running += 1;
                    max = max.max(running);
                }
                Record::Finished(name) if name == task => running -= 1,
                _ => {}
            }
        }
        max
    }
}

/// Action that logs its start and end, optionally sleeping in between and
/// optionally failing.
#[derive(Debug, Clone)]
pub struct RecordingAction {
    name: String,
    recorder: Recorder,
    delay: Duration,
    fail: bool,
}

impl RecordingAction {
    pub fn new(name: impl Into<String>, recorder: &Recorder) -> Self {
        Self {
            name: name.into(),
            recorder: recorder.clone(),
            delay: Duration::ZERO,
            fail: false,
        }
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

impl TaskAction for RecordingAction {
    fn execute(&self) -> TaskFuture<'_> {
        Box::pin(async move {
            self.recorder.push(Record::Started(self.name.clone()));
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.recorder.push(Record::Finished(self.name.clone()));

            if self.fail {
                Err(TaskError::Other(anyhow::anyhow!("{} failed on purpose", self.name)))
            } else {
                Ok(ArtifactSet::new())
            }
        })
    }
}
