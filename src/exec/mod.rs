// src/exec/mod.rs

//! Execution layer.
//!
//! This module runs the [`TaskAction`](crate::task::TaskAction)s the
//! scheduler dispatches and reports back to the orchestration runtime via
//! `RuntimeEvent`s.
//!
//! - [`executor_loop`] owns the main executor loop, which guarantees at most
//!   one running instance per task name.
//! - [`task_runner`] runs a single action and emits its completion.
//! - [`command`] runs external tools (`sh -c`) and streams their output into
//!   the log.
//! - [`template`] expands `${VAR}` placeholders in tool commands.
//! - [`backend`] provides the `ExecutorBackend` trait and a concrete
//!   `RealExecutorBackend` that the runtime uses in production, and which
//!   tests can replace with a fake implementation.

pub mod backend;
pub mod command;
pub mod executor_loop;
pub mod task_runner;
pub mod template;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use command::ToolCommand;
pub use executor_loop::spawn_executor;
pub use template::Variables;
