// src/assets/source.rs

use std::path::{Component, Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};

use crate::fs::FileSystem;
use crate::task::TaskError;
use crate::watch::path_utils::relative_str;

/// A source glob such as `_assets/img/**/*`, split into the static directory
/// it starts from and a matcher for the whole pattern.
#[derive(Debug, Clone)]
pub struct SourceGlob {
    pattern: String,
    base: PathBuf,
    matcher: GlobMatcher,
}

/// A file matched by a [`SourceGlob`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourceFile {
    /// Absolute (root-joined) path.
    pub path: PathBuf,
    /// Path below the glob's static base; used to mirror the layout into
    /// destinations.
    pub relative: PathBuf,
}

impl SourceGlob {
    pub fn new(pattern: &str) -> Result<Self, TaskError> {
        let matcher = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()?
            .compile_matcher();
        Ok(Self {
            pattern: pattern.to_string(),
            base: static_base(pattern),
            matcher,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Leading components of the pattern without glob metacharacters.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// All files under `root` matching the pattern, sorted by path.
    ///
    /// A missing base directory yields an empty list.
    pub fn expand(&self, fs: &dyn FileSystem, root: &Path) -> Result<Vec<SourceFile>, TaskError> {
        let base = root.join(&self.base);
        let mut files = Vec::new();

        if fs.is_file(&base) {
            if self.matches(root, &base) {
                let name = base.file_name().map(PathBuf::from).unwrap_or_default();
                files.push(SourceFile {
                    path: base,
                    relative: name,
                });
            }
            return Ok(files);
        }

        let mut stack = vec![base.clone()];
        while let Some(dir) = stack.pop() {
            if !fs.is_dir(&dir) {
                continue;
            }
            for entry in fs.read_dir(&dir)? {
                if fs.is_dir(&entry) {
                    stack.push(entry);
                } else if self.matches(root, &entry) {
                    let relative = entry.strip_prefix(&base).unwrap_or(&entry).to_path_buf();
                    files.push(SourceFile {
                        path: entry,
                        relative,
                    });
                }
            }
        }

        files.sort();
        Ok(files)
    }

    fn matches(&self, root: &Path, path: &Path) -> bool {
        relative_str(root, path).is_some_and(|rel| self.matcher.is_match(rel))
    }
}

fn static_base(pattern: &str) -> PathBuf {
    Path::new(pattern)
        .components()
        .take_while(|c| match c {
            Component::Normal(s) => !s
                .to_string_lossy()
                .contains(['*', '?', '[', '{']),
            _ => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn base_stops_at_first_wildcard() {
        let glob = SourceGlob::new("_assets/img/**/*").unwrap();
        assert_eq!(glob.base(), Path::new("_assets/img"));

        let glob = SourceGlob::new("favicon.png").unwrap();
        assert_eq!(glob.base(), Path::new("favicon.png"));
    }

    #[test]
    fn expands_recursively_with_relative_layout() {
        let fs = MockFileSystem::new();
        fs.add_file("/site/_assets/img/logo.png", "a");
        fs.add_file("/site/_assets/img/posts/one.jpg", "b");
        fs.add_file("/site/_assets/js/main.js", "c");

        let glob = SourceGlob::new("_assets/img/**/*").unwrap();
        let files = glob.expand(&fs, Path::new("/site")).unwrap();

        let rel: Vec<_> = files.iter().map(|f| f.relative.clone()).collect();
        assert_eq!(
            rel,
            vec![PathBuf::from("logo.png"), PathBuf::from("posts/one.jpg")]
        );
    }

    #[test]
    fn single_star_does_not_cross_directories() {
        let fs = MockFileSystem::new();
        fs.add_file("/site/_assets/js/app.js", "a");
        fs.add_file("/site/_assets/js/vendor/jquery.js", "b");

        let glob = SourceGlob::new("_assets/js/*.js").unwrap();
        let files = glob.expand(&fs, Path::new("/site")).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].relative, PathBuf::from("app.js"));
    }

    #[test]
    fn missing_base_is_empty() {
        let fs = MockFileSystem::new();
        let glob = SourceGlob::new("_assets/fonts/**/*.*").unwrap();
        assert!(glob.expand(&fs, Path::new("/site")).unwrap().is_empty());
    }
}
