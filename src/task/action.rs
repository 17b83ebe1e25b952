// src/task/action.rs

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use thiserror::Error;

/// Files written by a single task invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactSet(Vec<PathBuf>);

impl ArtifactSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: impl Into<PathBuf>) {
        self.0.push(path.into());
    }

    pub fn extend(&mut self, other: ArtifactSet) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.0
    }
}

impl From<Vec<PathBuf>> for ArtifactSet {
    fn from(paths: Vec<PathBuf>) -> Self {
        Self(paths)
    }
}

impl FromIterator<PathBuf> for ArtifactSet {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Failure of a single task invocation.
///
/// These never abort the process; the executor logs them with the task name
/// and reports a failed outcome to the scheduler.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{tool} exited with status {status}: {stderr}")]
    Tool {
        tool: String,
        status: i32,
        stderr: String,
    },

    #[error("stylesheet error: {0}")]
    Style(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("invalid glob: {0}")]
    Glob(#[from] globset::Error),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Boxed future returned by [`TaskAction::execute`].
pub type TaskFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ArtifactSet, TaskError>> + Send + 'a>>;

/// A unit of work the executor can run.
///
/// Implementations close over everything they need (paths, commands, a
/// file-system handle); `execute` takes no arguments and may be called any
/// number of times.
pub trait TaskAction: Send + Sync + fmt::Debug {
    fn execute(&self) -> TaskFuture<'_>;
}

/// Action that does nothing. Used for group nodes such as `clean` and for
/// pipeline nodes, which only exist to hang dependencies on.
#[derive(Debug, Clone, Copy, Default)]
pub struct Noop;

impl TaskAction for Noop {
    fn execute(&self) -> TaskFuture<'_> {
        Box::pin(async { Ok(ArtifactSet::new()) })
    }
}

/// Adapter turning a closure that returns a future into a [`TaskAction`].
pub struct FnAction<F> {
    label: &'static str,
    f: F,
}

impl<F> fmt::Debug for FnAction<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnAction").field("label", &self.label).finish()
    }
}

impl<F, Fut> TaskAction for FnAction<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<ArtifactSet, TaskError>> + Send + 'static,
{
    fn execute(&self) -> TaskFuture<'_> {
        Box::pin((self.f)())
    }
}

/// Build an action from a closure.
///
/// ```
/// use sitewright::task::{from_fn, ArtifactSet, TaskAction};
///
/// let action = from_fn("hello", || async { Ok(ArtifactSet::new()) });
/// # let _ = action.execute();
/// ```
pub fn from_fn<F, Fut>(label: &'static str, f: F) -> FnAction<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<ArtifactSet, TaskError>> + Send + 'static,
{
    FnAction { label, f }
}
