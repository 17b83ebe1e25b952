// src/exec/command.rs

//! External tool invocation.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::task::TaskError;

/// How many trailing stderr lines are kept for the error message.
const STDERR_TAIL: usize = 20;

/// A shell command line run on behalf of a task.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    /// Task name used to tag log lines.
    pub task: String,
    pub command: String,
    pub env: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
}

impl ToolCommand {
    pub fn new(task: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            command: command.into(),
            env: Vec::new(),
            cwd: None,
        }
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Program name for error messages: the first word of the command line.
    pub fn tool_name(&self) -> &str {
        self.command.split_whitespace().next().unwrap_or("sh")
    }

    /// Run the command to completion.
    ///
    /// stdout lines are logged at `info`, stderr lines at `warn`, both tagged
    /// with the task name. A non-zero exit becomes [`TaskError::Tool`] carrying
    /// the last stderr lines.
    pub async fn run(&self) -> Result<(), TaskError> {
        info!(task = %self.task, cmd = %self.command, "running tool");

        // Build a shell command appropriate for the platform.
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.command);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.command);
            c
        };

        cmd.envs(self.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn()?;

        let stdout_task = child.stdout.take().map(|stdout| {
            let task = self.task.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    info!(task = %task, "{}", line);
                }
            })
        });

        let stderr_task = child.stderr.take().map(|stderr| {
            let task = self.task.clone();
            tokio::spawn(async move {
                let mut tail = VecDeque::with_capacity(STDERR_TAIL);
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    warn!(task = %task, "{}", line);
                    if tail.len() == STDERR_TAIL {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
                tail.into_iter().collect::<Vec<_>>().join("\n")
            })
        });

        let status = child.wait().await?;

        if let Some(handle) = stdout_task {
            handle.await?;
        }
        let stderr = match stderr_task {
            Some(handle) => handle.await?,
            None => String::new(),
        };

        debug!(task = %self.task, code = ?status.code(), "tool exited");

        if status.success() {
            Ok(())
        } else {
            Err(TaskError::Tool {
                tool: self.tool_name().to_string(),
                status: status.code().unwrap_or(-1),
                stderr,
            })
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failing_command_reports_status_and_stderr() {
        let cmd = ToolCommand::new("test", "echo broken >&2; exit 3");
        match cmd.run().await {
            Err(TaskError::Tool { tool, status, stderr }) => {
                assert_eq!(tool, "echo");
                assert_eq!(status, 3);
                assert_eq!(stderr, "broken");
            }
            other => panic!("expected tool error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn environment_and_cwd_are_applied() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = ToolCommand::new("test", "printf '%s' \"$JEKYLL_ENV\" > env.txt")
            .env("JEKYLL_ENV", "production")
            .current_dir(dir.path());

        cmd.run().await.unwrap();
        let written = std::fs::read_to_string(dir.path().join("env.txt")).unwrap();
        assert_eq!(written, "production");
    }
}
