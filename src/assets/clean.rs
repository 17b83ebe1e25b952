// src/assets/clean.rs

use std::path::PathBuf;

use tracing::debug;

use crate::assets::SiteContext;
use crate::task::{ArtifactSet, TaskAction, TaskError, TaskFuture};

/// What a clean task removes.
#[derive(Debug, Clone)]
enum Target {
    /// Files directly inside the directories whose names end with one of
    /// the suffixes.
    Files(Vec<&'static str>),
    /// The directories themselves.
    Dirs,
}

/// Deletes previously generated artifacts. Missing paths are not errors, so
/// cleaning twice is fine.
#[derive(Debug, Clone)]
pub struct Clean {
    task: String,
    ctx: SiteContext,
    dirs: Vec<PathBuf>,
    target: Target,
}

impl Clean {
    /// Delete files with the given suffixes from each directory.
    pub fn files(
        task: impl Into<String>,
        ctx: SiteContext,
        dirs: Vec<PathBuf>,
        suffixes: Vec<&'static str>,
    ) -> Self {
        Self {
            task: task.into(),
            ctx,
            dirs,
            target: Target::Files(suffixes),
        }
    }

    /// Delete whole directories.
    pub fn dirs(task: impl Into<String>, ctx: SiteContext, dirs: Vec<PathBuf>) -> Self {
        Self {
            task: task.into(),
            ctx,
            dirs,
            target: Target::Dirs,
        }
    }

    async fn run(&self) -> Result<ArtifactSet, TaskError> {
        let fs = self.ctx.fs.as_ref();

        for dir in &self.dirs {
            let dir = self.ctx.resolve(dir);
            match &self.target {
                Target::Dirs => {
                    debug!(task = %self.task, path = %dir.display(), "removing directory");
                    fs.remove_dir_all(&dir)?;
                }
                Target::Files(suffixes) => {
                    // clean:jekyll may be deleting a parent of `dir` right now.
                    for entry in fs.read_dir(&dir)? {
                        let name = entry
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_default();
                        if fs.is_file(&entry) && suffixes.iter().any(|s| name.ends_with(s)) {
                            debug!(task = %self.task, path = %entry.display(), "removing file");
                            fs.remove_file(&entry)?;
                        }
                    }
                }
            }
        }

        Ok(ArtifactSet::new())
    }
}

impl TaskAction for Clean {
    fn execute(&self) -> TaskFuture<'_> {
        Box::pin(self.run())
    }
}
