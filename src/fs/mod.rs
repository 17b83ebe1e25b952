// src/fs/mod.rs

//! File-system seam used by asset tasks, clean tasks and glob expansion.
//!
//! Tasks hold an `Arc<dyn FileSystem>` so tests can run them against
//! [`mock::MockFileSystem`] instead of a temporary directory.

use std::fmt::Debug;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub mod mock;

/// Abstract filesystem interface.
pub trait FileSystem: Send + Sync + Debug {
    fn read(&self, path: &Path) -> Result<Vec<u8>>;
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Write `contents`, creating parent directories as needed.
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;
    fn exists(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    fn canonicalize(&self, path: &Path) -> Result<PathBuf>;

    /// Full paths of the entries in a directory. A directory that does not
    /// exist (or vanished while being listed) has no entries.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;
    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Remove a file. A missing file is not an error.
    fn remove_file(&self, path: &Path) -> Result<()>;

    /// Remove a directory tree. A missing directory is not an error.
    fn remove_dir_all(&self, path: &Path) -> Result<()>;

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        let data = self.read(from)?;
        self.write(to, &data)
    }
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).with_context(|| format!("reading file {:?}", path))
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("reading file {:?}", path))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
        }
        fs::write(path, contents).with_context(|| format!("writing to file {:?}", path))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        fs::canonicalize(path).with_context(|| format!("canonicalizing {:?}", path))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let iter = match fs::read_dir(path) {
            Ok(iter) => iter,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).with_context(|| format!("reading dir {:?}", path)),
        };

        let mut entries = Vec::new();
        for entry in iter {
            match entry {
                Ok(entry) => entries.push(entry.path()),
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
                Err(e) => return Err(e).with_context(|| format!("reading dir {:?}", path)),
            }
        }
        Ok(entries)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).with_context(|| format!("creating dir {:?}", path))
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Err(e) if e.kind() != ErrorKind::NotFound => {
                Err(e).with_context(|| format!("removing file {:?}", path))
            }
            _ => Ok(()),
        }
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        match fs::remove_dir_all(path) {
            Err(e) if e.kind() != ErrorKind::NotFound => {
                Err(e).with_context(|| format!("removing dir {:?}", path))
            }
            _ => Ok(()),
        }
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
        }
        fs::copy(from, to).with_context(|| format!("copying {:?} to {:?}", from, to))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_directory_lists_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("_site/assets/js");

        assert!(RealFileSystem.read_dir(&gone).unwrap().is_empty());

        fs::write(dir.path().join("plain.txt"), "x").unwrap();
        assert!(RealFileSystem.read_dir(&dir.path().join("plain.txt")).is_err());
    }
}
