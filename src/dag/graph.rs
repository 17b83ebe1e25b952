// src/dag/graph.rs

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone)]
struct DagNode {
    /// Direct prerequisites: tasks that must settle before this one can run.
    deps: Vec<String>,
    /// Direct dependents: tasks that list this one as a prerequisite.
    dependents: Vec<String>,
}

/// Simple in-memory DAG representation keyed by task name.
///
/// Acyclicity is checked by `TaskGraph::validate` before a `DagGraph` is
/// built, so here we just keep adjacency information for scheduling and
/// diagnostics.
#[derive(Debug, Clone, Default)]
pub struct DagGraph {
    nodes: HashMap<String, DagNode>,
}

impl DagGraph {
    /// Build a DAG from a `task -> prerequisites` map.
    ///
    /// Prerequisites that are not themselves keys are ignored.
    pub fn from_deps(deps: BTreeMap<String, BTreeSet<String>>) -> Self {
        let mut nodes: HashMap<String, DagNode> = deps
            .iter()
            .map(|(name, d)| {
                (
                    name.clone(),
                    DagNode {
                        deps: d.iter().filter(|p| deps.contains_key(*p)).cloned().collect(),
                        dependents: Vec::new(),
                    },
                )
            })
            .collect();

        for (name, prereqs) in deps.iter() {
            for dep in prereqs {
                if let Some(dep_node) = nodes.get_mut(dep) {
                    dep_node.dependents.push(name.clone());
                }
            }
        }

        Self { nodes }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Return all task names.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|s| s.as_str())
    }

    /// Immediate prerequisites of a task.
    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// `name` plus every task it transitively depends on.
    pub fn prerequisite_closure(&self, name: &str) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut stack = vec![name.to_string()];
        while let Some(current) = stack.pop() {
            if !self.nodes.contains_key(&current) || !seen.insert(current.clone()) {
                continue;
            }
            stack.extend(self.dependencies_of(&current).iter().cloned());
        }
        seen
    }

    /// Execution levels for `roots`: every task in level `n` only depends on
    /// tasks in earlier levels. Names within a level are sorted.
    ///
    /// Used for `--dry-run` output; the runtime itself dispatches greedily.
    pub fn levels(&self, roots: &[String]) -> Vec<Vec<String>> {
        let members: HashSet<String> = roots
            .iter()
            .flat_map(|r| self.prerequisite_closure(r))
            .collect();

        let mut remaining: BTreeSet<String> = members.iter().cloned().collect();
        let mut done: HashSet<String> = HashSet::new();
        let mut levels = Vec::new();

        while !remaining.is_empty() {
            let level: Vec<String> = remaining
                .iter()
                .filter(|t| self.dependencies_of(t).iter().all(|d| done.contains(d)))
                .cloned()
                .collect();
            if level.is_empty() {
                // Only reachable with a cycle, which validation rejects.
                break;
            }
            for t in &level {
                remaining.remove(t);
                done.insert(t.clone());
            }
            levels.push(level);
        }

        levels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &[&str])]) -> DagGraph {
        DagGraph::from_deps(
            edges
                .iter()
                .map(|(t, d)| (t.to_string(), d.iter().map(|s| s.to_string()).collect()))
                .collect(),
        )
    }

    #[test]
    fn closure_follows_prerequisites_only() {
        let g = graph(&[("a", &[]), ("b", &["a"]), ("c", &["b"]), ("d", &["a"])]);
        let closure = g.prerequisite_closure("c");
        let mut names: Vec<_> = closure.into_iter().collect();
        names.sort();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn levels_group_independent_tasks() {
        let g = graph(&[
            ("clean", &[]),
            ("styles", &["clean"]),
            ("scripts", &["clean"]),
            ("site", &["styles", "scripts"]),
        ]);
        assert_eq!(
            g.levels(&["site".to_string()]),
            vec![
                vec!["clean".to_string()],
                vec!["scripts".to_string(), "styles".to_string()],
                vec!["site".to_string()],
            ]
        );
    }
}
