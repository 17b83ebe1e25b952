// src/assets/scripts.rs

use std::io::Write;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::assets::{SiteContext, SourceGlob};
use crate::config::AssetPaths;
use crate::exec::ToolCommand;
use crate::task::{ArtifactSet, TaskAction, TaskError, TaskFuture};

/// Concatenates script sources and runs the transpile+minify command on the
/// bundle.
///
/// The command template sees `${input}` (the concatenated bundle),
/// `${output}` (the bundle in the first destination) and `${map}` (its
/// source map). Results are then copied to the second destination.
#[derive(Debug, Clone)]
pub struct ScriptBundle {
    task: String,
    ctx: SiteContext,
    paths: AssetPaths,
    command: String,
    file_name: &'static str,
    source_map: bool,
}

impl ScriptBundle {
    /// `build:scripts`: `main.js` plus `main.js.map`.
    pub fn main(ctx: SiteContext, paths: AssetPaths, command: impl Into<String>) -> Self {
        Self {
            task: "build:scripts".to_string(),
            ctx,
            paths,
            command: command.into(),
            file_name: "main.js",
            source_map: true,
        }
    }

    /// `build:vendor:scripts`: `vendor.js`, no source map.
    pub fn vendor(ctx: SiteContext, paths: AssetPaths, command: impl Into<String>) -> Self {
        Self {
            task: "build:vendor:scripts".to_string(),
            ctx,
            paths,
            command: command.into(),
            file_name: "vendor.js",
            source_map: false,
        }
    }

    async fn run(&self) -> Result<ArtifactSet, TaskError> {
        let fs = self.ctx.fs.as_ref();
        let sources = SourceGlob::new(&self.paths.src)?.expand(fs, &self.ctx.root)?;
        if sources.is_empty() {
            warn!(task = %self.task, pattern = %self.paths.src, "no script sources matched");
            return Ok(ArtifactSet::new());
        }
        debug!(task = %self.task, count = sources.len(), "bundling scripts");

        let mut bundle = tempfile::Builder::new()
            .prefix("sitewright-")
            .suffix(".js")
            .tempfile()?;
        for source in &sources {
            bundle.write_all(&fs.read(&source.path)?)?;
            bundle.write_all(b"\n")?;
        }
        bundle.flush()?;

        let Some((first, rest)) = self.paths.dest.split_first() else {
            return Ok(ArtifactSet::new());
        };
        let first = self.ctx.resolve(first);
        fs.create_dir_all(&first)?;

        let output = first.join(self.file_name);
        let map = first.join(format!("{}.map", self.file_name));
        let input = bundle.path().to_string_lossy().into_owned();
        let output_str = output.to_string_lossy().into_owned();
        let map_str = map.to_string_lossy().into_owned();

        let command = self.ctx.variables.expand(
            &self.command,
            &[
                ("input", input.as_str()),
                ("output", output_str.as_str()),
                ("map", map_str.as_str()),
            ],
        );
        ToolCommand::new(self.task.clone(), command)
            .current_dir(self.ctx.root.clone())
            .run()
            .await?;

        let mut produced: Vec<PathBuf> = vec![output];
        if self.source_map && fs.is_file(&map) {
            produced.push(map);
        }

        let mut artifacts: ArtifactSet = produced.iter().cloned().collect();
        for dest in rest {
            let dest = self.ctx.resolve(dest);
            for file in &produced {
                if let Some(name) = file.file_name() {
                    let target = dest.join(name);
                    fs.copy(file, &target)?;
                    artifacts.push(target);
                }
            }
        }

        Ok(artifacts)
    }
}

impl TaskAction for ScriptBundle {
    fn execute(&self) -> TaskFuture<'_> {
        Box::pin(self.run())
    }
}
