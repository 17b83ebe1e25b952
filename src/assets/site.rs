// src/assets/site.rs

//! Site generator and HTML validator invocations.

use tracing::info;

use crate::assets::SiteContext;
use crate::exec::ToolCommand;
use crate::task::{ArtifactSet, TaskAction, TaskError, TaskFuture};

/// Runs the static-site generator.
#[derive(Debug, Clone)]
pub struct Generate {
    task: String,
    ctx: SiteContext,
    command: String,
    /// Forward `CONTEXT` as `JEKYLL_ENV`.
    pass_context: bool,
}

impl Generate {
    /// `build:jekyll`: production build, environment taken from `CONTEXT`.
    pub fn build(ctx: SiteContext, command: impl Into<String>) -> Self {
        Self {
            task: "build:jekyll".to_string(),
            ctx,
            command: command.into(),
            pass_context: true,
        }
    }

    /// `build:jekyll:local`: local build used by the dev server.
    pub fn local(ctx: SiteContext, command: impl Into<String>) -> Self {
        Self {
            task: "build:jekyll:local".to_string(),
            ctx,
            command: command.into(),
            pass_context: false,
        }
    }

    fn tool_command(&self) -> ToolCommand {
        let command = self.ctx.variables.expand(&self.command, &[]);
        let mut tool = ToolCommand::new(self.task.clone(), command).current_dir(self.ctx.root.clone());
        if self.pass_context {
            if let Some(context) = &self.ctx.env.context {
                tool = tool.env("JEKYLL_ENV", context.clone());
            }
        }
        tool
    }

    async fn run(&self) -> Result<ArtifactSet, TaskError> {
        self.tool_command().run().await?;
        Ok(ArtifactSet::new())
    }
}

impl TaskAction for Generate {
    fn execute(&self) -> TaskFuture<'_> {
        Box::pin(self.run())
    }
}

/// Runs the HTML validator over the generated site, or logs that
/// validation is disabled.
#[derive(Debug, Clone)]
pub struct Validate {
    ctx: SiteContext,
    enabled: bool,
    validator: String,
    validator_ci: String,
}

impl Validate {
    pub fn new(
        ctx: SiteContext,
        enabled: bool,
        validator: impl Into<String>,
        validator_ci: impl Into<String>,
    ) -> Self {
        Self {
            ctx,
            enabled,
            validator: validator.into(),
            validator_ci: validator_ci.into(),
        }
    }

    /// The vendored binary is used on CI, where `COMMIT_REF` is set.
    pub fn command(&self) -> &str {
        if self.ctx.env.commit_ref.is_some() {
            &self.validator_ci
        } else {
            &self.validator
        }
    }

    async fn run(&self) -> Result<ArtifactSet, TaskError> {
        if !self.enabled {
            info!(task = "test:htmltest", validator = %self.command(), "validation disabled; skipping");
            return Ok(ArtifactSet::new());
        }

        let command = self.ctx.variables.expand(self.command(), &[]);
        ToolCommand::new("test:htmltest", command)
            .current_dir(self.ctx.root.clone())
            .run()
            .await?;
        Ok(ArtifactSet::new())
    }
}

impl TaskAction for Validate {
    fn execute(&self) -> TaskFuture<'_> {
        Box::pin(self.run())
    }
}
