// src/watch/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use thiserror::Error;
use tracing::warn;

use crate::config::WatchConfig;
use crate::engine::TaskName;
use crate::fs::FileSystem;
use crate::types::ReloadKind;
use crate::watch::path_utils::relative_str;

/// Directories never walked when looking for watched files.
const SKIP_DIRS: &[&str] = &[".git", "node_modules"];

/// Why a watch binding was left inert.
#[derive(Error, Debug)]
pub enum WatchBindingError {
    #[error("watch binding '{binding}': invalid glob '{pattern}': {source}")]
    InvalidGlob {
        binding: String,
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("watch binding '{binding}' matches no files")]
    NoMatches { binding: String },
}

/// Name of the graph node that re-runs a binding's tasks and reloads
/// browsers.
pub fn reload_node(binding: &str) -> TaskName {
    format!("watch:{binding}")
}

/// Compiled watch/exclude globs for one binding.
///
/// Patterns are relative to the project root; the watcher passes relative
/// paths (e.g. `"_assets/styles/main.scss"`) into `matches`.
#[derive(Clone)]
pub struct WatchBinding {
    name: String,
    node: TaskName,
    tasks: Vec<TaskName>,
    reload: ReloadKind,
    watch_set: GlobSet,
    exclude_set: Option<GlobSet>,
}

impl fmt::Debug for WatchBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchBinding")
            .field("name", &self.name)
            .field("tasks", &self.tasks)
            .field("reload", &self.reload)
            .finish_non_exhaustive()
    }
}

impl WatchBinding {
    /// Compile a binding's globs. Does not look at the file system.
    pub fn compile(cfg: &WatchConfig) -> Result<Self, WatchBindingError> {
        let watch_set = build_globset(&cfg.name, &cfg.patterns)?;
        let exclude_set = if cfg.exclude.is_empty() {
            None
        } else {
            Some(build_globset(&cfg.name, &cfg.exclude)?)
        };

        Ok(Self {
            name: cfg.name.clone(),
            node: reload_node(&cfg.name),
            tasks: cfg.tasks.clone(),
            reload: cfg.reload,
            watch_set,
            exclude_set,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The reload node triggered when this binding matches.
    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn tasks(&self) -> &[TaskName] {
        &self.tasks
    }

    pub fn reload(&self) -> ReloadKind {
        self.reload
    }

    /// True if `rel_path` matches a watch pattern and no exclude pattern.
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.watch_set.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

fn build_globset(binding: &str, patterns: &[String]) -> Result<GlobSet, WatchBindingError> {
    let invalid = |pattern: &str, source| WatchBindingError::InvalidGlob {
        binding: binding.to_string(),
        pattern: pattern.to_string(),
        source,
    };

    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .map_err(|e| invalid(pat, e))?;
        builder.add(glob);
    }
    builder.build().map_err(|e| invalid(&patterns.join(", "), e))
}

/// Compile every binding and check it against the files under `root`.
///
/// Bindings with an invalid glob or without a single matching file are
/// logged and left out; the rest are returned in configuration order.
pub fn compile_bindings(
    fs: &dyn FileSystem,
    root: &Path,
    configs: &[WatchConfig],
) -> Result<Vec<WatchBinding>> {
    let files = collect_files(fs, root)?;
    let relative: Vec<String> = files.iter().filter_map(|p| relative_str(root, p)).collect();

    let mut bindings = Vec::with_capacity(configs.len());
    for cfg in configs {
        let checked = WatchBinding::compile(cfg).and_then(|binding| {
            if relative.iter().any(|rel| binding.matches(rel)) {
                Ok(binding)
            } else {
                Err(WatchBindingError::NoMatches {
                    binding: cfg.name.clone(),
                })
            }
        });

        match checked {
            Ok(binding) => bindings.push(binding),
            Err(err) => warn!(binding = %cfg.name, error = %err, "watch binding is inert"),
        }
    }

    Ok(bindings)
}

/// Every file under `root`, skipping VCS and package directories.
pub fn collect_files(fs: &dyn FileSystem, root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                let skipped = path
                    .file_name()
                    .is_some_and(|n| SKIP_DIRS.iter().any(|s| n == *s));
                if !skipped {
                    stack.push(path);
                }
            } else if fs.is_file(&path) {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn binding(name: &str, patterns: &[&str], exclude: &[&str]) -> WatchConfig {
        WatchConfig {
            name: name.to_string(),
            patterns: patterns.iter().map(|s| s.to_string()).collect(),
            exclude: exclude.iter().map(|s| s.to_string()).collect(),
            tasks: vec!["build:jekyll:local".to_string()],
            reload: ReloadKind::Full,
        }
    }

    #[test]
    fn excludes_win_over_patterns() {
        let b = WatchBinding::compile(&binding(
            "pages",
            &["**/*.{html,md}"],
            &["_site/**", "node_modules/**"],
        ))
        .unwrap();

        assert!(b.matches("index.html"));
        assert!(b.matches("about/index.md"));
        assert!(!b.matches("_site/index.html"));
        assert!(!b.matches("node_modules/pkg/README.md"));
        assert!(!b.matches("feed.xml"));
        assert_eq!(b.node(), "watch:pages");
    }

    #[test]
    fn star_does_not_cross_directories() {
        let b = WatchBinding::compile(&binding("drafts", &["_drafts/*.md"], &[])).unwrap();
        assert!(b.matches("_drafts/idea.md"));
        assert!(!b.matches("_drafts/old/idea.md"));
    }

    #[test]
    fn invalid_glob_is_reported() {
        let err = WatchBinding::compile(&binding("bad", &["_posts/[*.md"], &[])).unwrap_err();
        assert!(matches!(err, WatchBindingError::InvalidGlob { .. }));
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn bindings_without_matches_are_inert() {
        let fs = MockFileSystem::new();
        fs.add_file("/site/_config.yml", "title: x");
        fs.add_file("/site/node_modules/x/_config.yml", "");

        let bindings = compile_bindings(
            &fs,
            Path::new("/site"),
            &[
                binding("config", &["_config.yml"], &[]),
                binding("favicon", &["favicon.png"], &[]),
                binding("bad", &["[oops"], &[]),
            ],
        )
        .unwrap();

        let names: Vec<_> = bindings.iter().map(|b| b.name()).collect();
        assert_eq!(names, vec!["config"]);
    }
}
