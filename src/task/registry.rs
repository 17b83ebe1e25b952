// src/task/registry.rs

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::dag::DagGraph;
use crate::errors::{Result, SiteError};
use crate::task::action::{Noop, TaskAction};

/// A named unit of work plus its declared prerequisites.
#[derive(Clone)]
pub struct TaskUnit {
    pub name: String,
    pub description: String,
    pub deps: Vec<String>,
    pub action: Arc<dyn TaskAction>,
}

impl TaskUnit {
    pub fn new(name: impl Into<String>, action: impl TaskAction + 'static) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            deps: Vec::new(),
            action: Arc::new(action),
        }
    }

    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deps.extend(deps.into_iter().map(Into::into));
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl fmt::Debug for TaskUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskUnit")
            .field("name", &self.name)
            .field("deps", &self.deps)
            .field("action", &self.action)
            .finish()
    }
}

/// Ordered stages of parallel groups.
///
/// While the pipeline runs, every member of stage `i` depends on every member
/// of stage `i - 1`, and the pipeline node itself depends on the last stage.
/// Those edges do not exist outside the pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub name: String,
    pub description: String,
    pub stages: Vec<Vec<String>>,
}

impl Pipeline {
    /// `(task, prerequisite)` edges induced by the stage ordering.
    fn induced_edges(&self) -> Vec<(String, String)> {
        let mut edges = Vec::new();
        for pair in self.stages.windows(2) {
            for task in &pair[1] {
                for prereq in &pair[0] {
                    edges.push((task.clone(), prereq.clone()));
                }
            }
        }
        if let Some(last) = self.stages.last() {
            for prereq in last {
                edges.push((self.name.clone(), prereq.clone()));
            }
        }
        edges
    }
}

/// Registry of every task unit and pipeline known to the process.
///
/// Built once at startup, validated, then shared behind an `Arc` by the
/// executor and the dev server.
#[derive(Debug, Default)]
pub struct TaskGraph {
    units: BTreeMap<String, TaskUnit>,
    pipelines: BTreeMap<String, Pipeline>,
    duplicates: Vec<String>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task unit with its prerequisites.
    pub fn register<I, S>(
        &mut self,
        name: impl Into<String>,
        action: impl TaskAction + 'static,
        depends_on: I,
    ) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add(TaskUnit::new(name, action).depends_on(depends_on))
    }

    /// Register a fully built [`TaskUnit`].
    ///
    /// A name that is already taken is remembered and reported by
    /// [`TaskGraph::validate`]; the first registration wins.
    pub fn add(&mut self, unit: TaskUnit) -> &mut Self {
        if self.contains(&unit.name) {
            self.duplicates.push(unit.name.clone());
        } else {
            debug!(task = %unit.name, deps = ?unit.deps, "registered task");
            self.units.insert(unit.name.clone(), unit);
        }
        self
    }

    /// Register a named pipeline made of ordered parallel stages.
    pub fn register_pipeline<S>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        stages: Vec<Vec<S>>,
    ) -> &mut Self
    where
        S: Into<String>,
    {
        let name = name.into();
        if self.contains(&name) {
            self.duplicates.push(name);
            return self;
        }
        let stages = stages
            .into_iter()
            .map(|stage| stage.into_iter().map(Into::into).collect())
            .collect();
        self.pipelines.insert(
            name.clone(),
            Pipeline {
                name,
                description: description.into(),
                stages,
            },
        );
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.units.contains_key(name) || self.pipelines.contains_key(name)
    }

    pub fn unit(&self, name: &str) -> Option<&TaskUnit> {
        self.units.get(name)
    }

    pub fn pipeline(&self, name: &str) -> Option<&Pipeline> {
        self.pipelines.get(name)
    }

    pub fn units(&self) -> impl Iterator<Item = &TaskUnit> {
        self.units.values()
    }

    pub fn pipelines(&self) -> impl Iterator<Item = &Pipeline> {
        self.pipelines.values()
    }

    /// The action to run for `name`. Pipelines resolve to [`Noop`].
    pub fn action_of(&self, name: &str) -> Option<Arc<dyn TaskAction>> {
        if let Some(unit) = self.units.get(name) {
            return Some(unit.action.clone());
        }
        self.pipelines
            .get(name)
            .map(|_| Arc::new(Noop) as Arc<dyn TaskAction>)
    }

    /// Check the registry before anything runs.
    ///
    /// Reports, in this order: duplicate names, unknown prerequisites or
    /// pipeline members, units depending on a pipeline, and dependency
    /// cycles (also those only formed by a pipeline's stage ordering).
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = self.duplicates.first() {
            return Err(SiteError::ConfigError(format!(
                "task '{}' is registered more than once",
                name
            )));
        }

        for unit in self.units.values() {
            for dep in &unit.deps {
                if !self.contains(dep) {
                    return Err(SiteError::UnknownTask {
                        task: unit.name.clone(),
                        dependency: dep.clone(),
                    });
                }
                // Stage edges only exist when a pipeline is a root, so as a
                // prerequisite it would run nothing.
                if self.pipelines.contains_key(dep) {
                    return Err(SiteError::ConfigError(format!(
                        "task '{}' depends on pipeline '{}'; only task units can be prerequisites",
                        unit.name, dep
                    )));
                }
            }
        }

        for pipeline in self.pipelines.values() {
            for member in pipeline.stages.iter().flatten() {
                if !self.contains(member) {
                    return Err(SiteError::UnknownTask {
                        task: pipeline.name.clone(),
                        dependency: member.clone(),
                    });
                }
            }
        }

        find_cycle(&self.edges(&[]))?;
        for pipeline in self.pipelines.values() {
            find_cycle(&self.edges(&[pipeline]))?;
        }

        Ok(())
    }

    /// Graph of declared dependencies, without any pipeline edges.
    pub fn dag(&self) -> DagGraph {
        DagGraph::from_deps(self.edges(&[]))
    }

    /// Graph used to run the given roots: declared dependencies plus the
    /// induced edges of every pipeline among `roots`.
    pub fn plan(&self, roots: &[String]) -> Result<DagGraph> {
        let mut pipelines = Vec::new();
        for root in roots {
            if let Some(p) = self.pipelines.get(root) {
                pipelines.push(p);
            } else if !self.units.contains_key(root) {
                return Err(SiteError::TaskNotFound(root.clone()));
            }
        }
        Ok(DagGraph::from_deps(self.edges(&pipelines)))
    }

    /// Adjacency (task -> prerequisites) for units and pipeline nodes, with
    /// the induced edges of `active` pipelines added.
    fn edges(&self, active: &[&Pipeline]) -> BTreeMap<String, BTreeSet<String>> {
        let mut edges: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for unit in self.units.values() {
            edges
                .entry(unit.name.clone())
                .or_default()
                .extend(unit.deps.iter().cloned());
        }
        for name in self.pipelines.keys() {
            edges.entry(name.clone()).or_default();
        }
        for pipeline in active {
            for (task, prereq) in pipeline.induced_edges() {
                edges.entry(task).or_default().insert(prereq);
            }
        }

        edges
    }
}

/// Return `DagCycle` naming the first cycle found, e.g. `a -> b -> a`.
fn find_cycle(edges: &BTreeMap<String, BTreeSet<String>>) -> Result<()> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for (task, deps) in edges {
        graph.add_node(task.as_str());
        for dep in deps {
            graph.add_edge(task.as_str(), dep.as_str(), ());
        }
    }

    let mut components = tarjan_scc(&graph);
    components.iter_mut().for_each(|c| c.sort());
    components.sort();

    for component in components {
        let Some(&start) = component.first() else {
            continue;
        };
        if component.len() == 1 && !graph.contains_edge(start, start) {
            continue;
        }
        let path = cycle_path(&graph, &component, start);
        return Err(SiteError::DagCycle(path.join(" -> ")));
    }

    Ok(())
}

/// Shortest path from `start` back to itself, staying inside `component`.
fn cycle_path<'a>(
    graph: &DiGraphMap<&'a str, ()>,
    component: &[&'a str],
    start: &'a str,
) -> Vec<&'a str> {
    let mut parent: HashMap<&str, &str> = HashMap::new();
    let mut queue = VecDeque::from([start]);

    while let Some(node) = queue.pop_front() {
        for next in graph.neighbors(node) {
            if next == start {
                let mut path = vec![node];
                let mut cur = node;
                while let Some(&p) = parent.get(cur) {
                    path.push(p);
                    cur = p;
                }
                path.reverse();
                path.push(start);
                return path;
            }
            if component.contains(&next) && !parent.contains_key(next) {
                parent.insert(next, node);
                queue.push_back(next);
            }
        }
    }

    vec![start, start]
}
