// src/watch/path_utils.rs

//! Relative path helpers shared by the watcher and source globbing.

use std::path::Path;

/// `path` relative to `root`, with forward slashes, as glob patterns expect.
///
/// Falls back to comparing canonicalized paths, since notify may report a
/// different absolute prefix for the same directory (symlinks, macOS
/// `/private/var`). Returns `None` if `path` is not below `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_slash(rel));
    }

    let root_canon = root.canonicalize().ok()?;
    let path_canon = path.canonicalize().ok()?;
    path_canon.strip_prefix(&root_canon).ok().map(to_slash)
}

fn to_slash(rel: &Path) -> String {
    rel.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_root_prefix() {
        assert_eq!(
            relative_str(Path::new("/site"), Path::new("/site/_posts/a.md")).as_deref(),
            Some("_posts/a.md")
        );
    }

    #[test]
    fn unrelated_paths_are_none() {
        assert_eq!(relative_str(Path::new("/site-a"), Path::new("/nowhere/x.md")), None);
    }
}
