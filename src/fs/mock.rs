// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir,
}

/// In-memory file system keyed by path.
///
/// Parent directories are created implicitly when files are added; directory
/// listings are derived from the keys, so removals never leave dangling
/// children behind.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<BTreeMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(PathBuf::from("."), MockEntry::Dir);

        Self {
            entries: Arc::new(Mutex::new(entries)),
        }
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        let mut entries = self.lock();
        if let Some(parent) = path.parent() {
            insert_dirs(&mut entries, parent);
        }
        entries.insert(path, MockEntry::File(content.into()));
    }

    /// All file paths currently stored, sorted.
    pub fn files(&self) -> Vec<PathBuf> {
        self.lock()
            .iter()
            .filter(|(_, e)| matches!(e, MockEntry::File(_)))
            .map(|(p, _)| p.clone())
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<PathBuf, MockEntry>> {
        // A poisoned lock only happens after a panicking test thread.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn insert_dirs(entries: &mut BTreeMap<PathBuf, MockEntry>, dir: &Path) {
    let mut current = PathBuf::new();
    for component in dir.components() {
        current.push(component);
        entries.entry(current.clone()).or_insert(MockEntry::Dir);
    }
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        match self.lock().get(path) {
            Some(MockEntry::File(content)) => Ok(content.clone()),
            Some(MockEntry::Dir) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock().contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.lock().get(path), Some(MockEntry::File(_)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.lock().get(path), Some(MockEntry::Dir))
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        // In mock, we just return the path as is, assuming tests use consistent paths.
        Ok(path.to_path_buf())
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let entries = self.lock();
        match entries.get(path) {
            Some(MockEntry::Dir) => Ok(entries
                .keys()
                .filter(|p| p.parent() == Some(path))
                .cloned()
                .collect()),
            Some(MockEntry::File(_)) => Err(anyhow!("Not a directory: {:?}", path)),
            None => Ok(Vec::new()),
        }
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        insert_dirs(&mut self.lock(), path);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        let mut entries = self.lock();
        match entries.get(path) {
            Some(MockEntry::Dir) => Err(anyhow!("Is a directory: {:?}", path)),
            Some(MockEntry::File(_)) => {
                entries.remove(path);
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        self.lock().retain(|p, _| !p.starts_with(path));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_children_and_removes_trees() {
        let fs = MockFileSystem::new();
        fs.add_file("site/css/main.css", "a");
        fs.add_file("site/js/main.js", "b");

        let mut children = fs.read_dir(Path::new("site")).unwrap();
        children.sort();
        assert_eq!(
            children,
            vec![PathBuf::from("site/css"), PathBuf::from("site/js")]
        );

        fs.remove_dir_all(Path::new("site/css")).unwrap();
        assert!(!fs.exists(Path::new("site/css/main.css")));
        assert!(fs.exists(Path::new("site/js/main.js")));

        // Removing something that is not there is fine.
        fs.remove_dir_all(Path::new("site/css")).unwrap();
        fs.remove_file(Path::new("site/css/main.css")).unwrap();
    }
}
