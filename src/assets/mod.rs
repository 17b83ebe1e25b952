// src/assets/mod.rs

//! Built-in task actions for the site build.
//!
//! - [`scripts`] bundles script sources and hands them to the transpiler.
//! - [`styles`] compiles Sass and minifies the result.
//! - [`images`] recompresses PNGs and copies everything else.
//! - [`fonts`] copies font files.
//! - [`clean`] deletes generated artifacts.
//! - [`site`] runs the site generator and the HTML validator.
//! - [`source`] expands source globs through the [`FileSystem`] seam.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::exec::Variables;
use crate::fs::FileSystem;
use crate::types::Environment;

pub mod clean;
pub mod fonts;
pub mod images;
pub mod scripts;
pub mod site;
pub mod source;
pub mod styles;

pub use source::{SourceFile, SourceGlob};

/// Everything a built-in action needs besides its own paths.
#[derive(Debug, Clone)]
pub struct SiteContext {
    /// Project root; relative config paths resolve against it.
    pub root: PathBuf,
    pub fs: Arc<dyn FileSystem>,
    pub env: Environment,
    pub variables: Variables,
}

impl SiteContext {
    pub fn new(root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            root: root.into(),
            fs,
            env: Environment::default(),
            variables: Variables::default(),
        }
    }

    pub fn with_env(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    pub fn with_variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }

    /// Resolve a config path against the project root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}
