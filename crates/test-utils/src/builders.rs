#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use sitewright::dag::DagGraph;
use sitewright::task::{TaskGraph, TaskUnit};

use crate::recording::{Recorder, RecordingAction};

/// Builder for a `TaskGraph` whose units are all [`RecordingAction`]s.
pub struct GraphBuilder {
    recorder: Recorder,
    graph: TaskGraph,
}

impl GraphBuilder {
    pub fn new(recorder: &Recorder) -> Self {
        Self {
            recorder: recorder.clone(),
            graph: TaskGraph::new(),
        }
    }

    pub fn task(self, name: &str, deps: &[&str]) -> Self {
        let action = RecordingAction::new(name, &self.recorder);
        self.with_action(name, deps, action)
    }

    pub fn slow_task(self, name: &str, deps: &[&str], delay: Duration) -> Self {
        let action = RecordingAction::new(name, &self.recorder).delay(delay);
        self.with_action(name, deps, action)
    }

    pub fn failing_task(self, name: &str, deps: &[&str]) -> Self {
        let action = RecordingAction::new(name, &self.recorder).failing();
        self.with_action(name, deps, action)
    }

    pub fn pipeline(mut self, name: &str, stages: &[&[&str]]) -> Self {
        let stages: Vec<Vec<&str>> = stages.iter().map(|s| s.to_vec()).collect();
        self.graph.register_pipeline(name, "", stages);
        self
    }

    pub fn build(self) -> TaskGraph {
        self.graph
    }

    fn with_action(mut self, name: &str, deps: &[&str], action: RecordingAction) -> Self {
        self.graph
            .add(TaskUnit::new(name, action).depends_on(deps.iter().copied()));
        self
    }
}

/// `DagGraph` from `(task, prerequisites)` pairs.
pub fn dag_from_edges(edges: &[(&str, &[&str])]) -> DagGraph {
    let deps: BTreeMap<String, BTreeSet<String>> = edges
        .iter()
        .map(|(task, prereqs)| {
            (
                task.to_string(),
                prereqs.iter().map(|p| p.to_string()).collect(),
            )
        })
        .collect();
    DagGraph::from_deps(deps)
}
