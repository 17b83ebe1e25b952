// src/dag/mod.rs

//! Dependency graph and per-run scheduling.
//!
//! A [`DagGraph`] is the planned set of edges for one invocation: the
//! registered `depends_on` lists plus, for `build`, the stage edges of the
//! pipeline. The [`Scheduler`] walks it one run at a time, tracking which
//! units are pending, running or settled, and hands ready units to the
//! runtime.

pub mod graph;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;
pub mod task_info;

pub use graph::DagGraph;
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use task_info::{ScheduledTask, TaskRunState};
