// src/task/mod.rs

//! Task units and the task graph registry.
//!
//! - [`action`] defines the [`TaskAction`] trait every unit of work
//!   implements, plus small helpers for closures and no-op group nodes.
//! - [`registry`] holds [`TaskGraph`], the startup-time registry of task
//!   units, their declared dependencies and named pipelines.

pub mod action;
pub mod registry;

pub use action::{from_fn, ArtifactSet, FnAction, Noop, TaskAction, TaskError, TaskFuture};
pub use registry::{Pipeline, TaskGraph, TaskUnit};
