// tests/scheduler_topological.rs

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use proptest::prelude::*;
use sitewright::dag::{ScheduledTask, Scheduler};
use sitewright::engine::{
    CoreCommand, CoreRuntime, CoreStep, RuntimeEvent, RuntimeOptions, TaskOutcome, TriggerReason,
};
use sitewright::types::FailurePolicy;
use sitewright_test_utils::builders::dag_from_edges;

/// Random DAG: task `i` may only depend on tasks `0..i`, so it is acyclic.
fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = BTreeMap<String, BTreeSet<String>>> {
    (1..=max_tasks).prop_flat_map(|n| {
        proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..4), n).prop_map(
            |raw| {
                raw.into_iter()
                    .enumerate()
                    .map(|(i, picks)| {
                        let deps = if i == 0 {
                            BTreeSet::new()
                        } else {
                            picks.into_iter().map(|p| format!("task_{}", p % i)).collect()
                        };
                        (format!("task_{i}"), deps)
                    })
                    .collect()
            },
        )
    })
}

fn dispatched(step: CoreStep) -> Vec<ScheduledTask> {
    step.commands
        .into_iter()
        .filter_map(|c| match c {
            CoreCommand::DispatchTasks(tasks) => Some(tasks),
            CoreCommand::RequestExit => None,
        })
        .flatten()
        .collect()
}

proptest! {
    #[test]
    fn tasks_start_only_after_prerequisites_settle(
        edges in dag_strategy(12),
        triggers in proptest::collection::vec(0..12usize, 1..5),
        failing in proptest::collection::hash_set(0..12usize, 0..4),
        order in proptest::collection::vec(any::<usize>(), 64),
        fail_fast in any::<bool>(),
    ) {
        let names: Vec<String> = edges.keys().cloned().collect();
        let pairs: Vec<(&str, Vec<&str>)> = edges
            .iter()
            .map(|(t, d)| (t.as_str(), d.iter().map(String::as_str).collect()))
            .collect();
        let slices: Vec<(&str, &[&str])> = pairs.iter().map(|(t, d)| (*t, d.as_slice())).collect();

        let policy = if fail_fast { FailurePolicy::FailFast } else { FailurePolicy::Continue };
        let mut core = CoreRuntime::new(
            Scheduler::new(dag_from_edges(&slices), policy),
            1,
            RuntimeOptions::default(),
        );

        let failing: HashSet<String> = failing
            .into_iter()
            .filter(|i| *i < names.len())
            .map(|i| names[i].clone())
            .collect();

        let mut settled: HashMap<u64, HashSet<String>> = HashMap::new();
        let mut started: HashMap<u64, HashSet<String>> = HashMap::new();
        let mut executing: Vec<ScheduledTask> = Vec::new();

        let mut accept = |tasks: Vec<ScheduledTask>,
                          executing: &mut Vec<ScheduledTask>,
                          settled: &HashMap<u64, HashSet<String>>|
         -> Result<(), TestCaseError> {
            for task in tasks {
                let done = settled.get(&task.run_id).cloned().unwrap_or_default();
                for dep in &edges[&task.name] {
                    prop_assert!(
                        done.contains(dep),
                        "{} dispatched in run {} before {} settled",
                        task.name,
                        task.run_id,
                        dep
                    );
                }
                prop_assert!(
                    started.entry(task.run_id).or_default().insert(task.name.clone()),
                    "{} dispatched twice in run {}",
                    task.name,
                    task.run_id
                );
                executing.push(task);
            }
            Ok(())
        };

        for i in &triggers {
            let Some(name) = names.get(*i) else { continue };
            let step = core.step(RuntimeEvent::TaskTriggered {
                task: name.clone(),
                reason: TriggerReason::Manual,
            });
            accept(dispatched(step), &mut executing, &settled)?;
        }

        let mut k = 0;
        while !executing.is_empty() {
            let task = executing.remove(order[k % order.len()] % executing.len());
            k += 1;

            let outcome = if failing.contains(&task.name) {
                TaskOutcome::Failed
            } else {
                TaskOutcome::Success
            };
            settled.entry(task.run_id).or_default().insert(task.name.clone());

            let step = core.step(RuntimeEvent::TaskCompleted { task: task.name, outcome });
            accept(dispatched(step), &mut executing, &settled)?;
            prop_assert!(k < 10_000, "simulation did not terminate");
        }

        prop_assert!(core.is_idle(), "run left unfinished tasks");
        prop_assert!(core.queue_is_empty(), "queued triggers were never started");
    }
}
