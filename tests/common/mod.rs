#![allow(dead_code)]

use std::path::{Path, PathBuf};

use sitewright::config::{load_and_validate, ConfigFile};
use tempfile::TempDir;

pub use sitewright_test_utils::{init_tracing, with_timeout};

/// A throwaway project directory with a `Sitewright.toml`.
pub struct TestProject {
    dir: TempDir,
    /// Project root relative to the temp dir.
    subdir: PathBuf,
}

impl TestProject {
    pub fn new(config: &str) -> Self {
        Self::in_subdir("", config)
    }

    /// Project rooted at `subdir` inside the temp dir, e.g. a path with
    /// spaces.
    pub fn in_subdir(subdir: &str, config: &str) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let root = if subdir.is_empty() {
            dir.path().to_path_buf()
        } else {
            dir.path().join(subdir)
        };
        std::fs::create_dir_all(&root).expect("create project root");
        std::fs::write(root.join("Sitewright.toml"), config).expect("write config");
        Self {
            dir,
            subdir: PathBuf::from(subdir),
        }
    }

    pub fn root(&self) -> PathBuf {
        let base = self.dir.path().canonicalize().expect("canonicalize temp dir");
        if self.subdir.as_os_str().is_empty() {
            base
        } else {
            base.join(&self.subdir)
        }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root().join(rel)
    }

    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(&path, contents).expect("write file");
        path
    }

    pub fn config(&self) -> ConfigFile {
        load_and_validate(self.path("Sitewright.toml")).expect("valid config")
    }

    /// File names directly inside `rel`, sorted. Empty if it does not exist.
    pub fn list(&self, rel: &str) -> Vec<String> {
        list_dir(&self.path(rel))
    }
}

fn list_dir(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
