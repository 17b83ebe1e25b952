// src/assets/fonts.rs

use crate::assets::{SiteContext, SourceGlob};
use crate::config::AssetPaths;
use crate::task::{ArtifactSet, TaskAction, TaskError, TaskFuture};

/// Copies font files into every destination, preserving their layout.
#[derive(Debug, Clone)]
pub struct FontCopy {
    ctx: SiteContext,
    paths: AssetPaths,
}

impl FontCopy {
    pub fn new(ctx: SiteContext, paths: AssetPaths) -> Self {
        Self { ctx, paths }
    }

    async fn run(&self) -> Result<ArtifactSet, TaskError> {
        let fs = self.ctx.fs.as_ref();
        let mut artifacts = ArtifactSet::new();

        for source in SourceGlob::new(&self.paths.src)?.expand(fs, &self.ctx.root)? {
            for dest in &self.paths.dest {
                let target = self.ctx.resolve(dest).join(&source.relative);
                fs.copy(&source.path, &target)?;
                artifacts.push(target);
            }
        }

        Ok(artifacts)
    }
}

impl TaskAction for FontCopy {
    fn execute(&self) -> TaskFuture<'_> {
        Box::pin(self.run())
    }
}
