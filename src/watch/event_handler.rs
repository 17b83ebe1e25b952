// src/watch/event_handler.rs

//! Turning a batch of changed paths into reload-node triggers.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::{RuntimeEvent, TriggerReason};
use crate::types::ReloadKind;
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::WatchBinding;

/// Bindings to trigger for a set of changed paths (relative to the root).
///
/// When several matching bindings re-run the same tasks with the same
/// reload kind (e.g. a post matching both the posts and the pages globs),
/// only the first one is kept, so one edit produces one rebuild.
pub fn bindings_for_paths<'a>(bindings: &'a [WatchBinding], rel_paths: &[String]) -> Vec<&'a WatchBinding> {
    let mut seen: Vec<(BTreeSet<&str>, ReloadKind)> = Vec::new();
    let mut selected = Vec::new();

    for binding in bindings {
        if !rel_paths.iter().any(|p| binding.matches(p)) {
            continue;
        }
        let key = (
            binding.tasks().iter().map(String::as_str).collect::<BTreeSet<_>>(),
            binding.reload(),
        );
        if seen.contains(&key) {
            debug!(binding = %binding.name(), "same tasks already triggered in this batch");
            continue;
        }
        seen.push(key);
        selected.push(binding);
    }

    selected
}

/// Process one debounced batch of changed paths.
///
/// Returns false once the runtime channel is closed, which ends the
/// watcher loop.
pub async fn process_changes(
    root: &Path,
    paths: &BTreeSet<PathBuf>,
    bindings: &[WatchBinding],
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) -> bool {
    let rel_paths: Vec<String> = paths
        .iter()
        .filter_map(|path| {
            let rel = relative_str(root, path);
            if rel.is_none() {
                warn!(path = %path.display(), root = %root.display(), "could not relativize changed path");
            }
            rel
        })
        .collect();

    for binding in bindings_for_paths(bindings, &rel_paths) {
        info!(
            binding = %binding.name(),
            tasks = ?binding.tasks(),
            changed = rel_paths.len(),
            "change detected; rebuilding"
        );

        let event = RuntimeEvent::TaskTriggered {
            task: binding.node().to_string(),
            reason: TriggerReason::FileWatch,
        };
        if let Err(err) = runtime_tx.send(event).await {
            warn!("failed to send RuntimeEvent::TaskTriggered: {err}");
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WatchConfig;

    fn compile(name: &str, pattern: &str, task: &str, reload: ReloadKind) -> WatchBinding {
        WatchBinding::compile(&WatchConfig {
            name: name.to_string(),
            patterns: vec![pattern.to_string()],
            exclude: vec![],
            tasks: vec![task.to_string()],
            reload,
        })
        .unwrap()
    }

    fn bindings() -> Vec<WatchBinding> {
        vec![
            compile("styles", "_assets/styles/**/*.scss", "build:styles", ReloadKind::Inject),
            compile("scripts", "_assets/js/*.js", "build:scripts", ReloadKind::Full),
            compile("posts", "_posts/**/*.md", "build:jekyll:local", ReloadKind::Full),
            compile("pages", "**/*.md", "build:jekyll:local", ReloadKind::Full),
        ]
    }

    #[test]
    fn style_change_selects_only_styles() {
        let b = bindings();
        let hit = bindings_for_paths(&b, &["_assets/styles/base/_type.scss".to_string()]);
        let names: Vec<_> = hit.iter().map(|b| b.name()).collect();
        assert_eq!(names, vec!["styles"]);
    }

    #[test]
    fn overlapping_content_bindings_trigger_once() {
        let b = bindings();
        let hit = bindings_for_paths(&b, &["_posts/2020-01-01-hello.md".to_string()]);
        let names: Vec<_> = hit.iter().map(|b| b.name()).collect();
        assert_eq!(names, vec!["posts"]);
    }

    #[tokio::test]
    async fn sends_one_trigger_per_selected_binding() {
        let (tx, mut rx) = mpsc::channel(8);
        let root = Path::new("/project");
        let paths: BTreeSet<PathBuf> = [
            "/project/_assets/js/app.js",
            "/project/_assets/styles/main.scss",
            "/project/README.txt",
        ]
        .into_iter()
        .map(PathBuf::from)
        .collect();

        assert!(process_changes(root, &paths, &bindings(), &tx).await);
        drop(tx);

        let mut triggered = Vec::new();
        while let Some(RuntimeEvent::TaskTriggered { task, reason }) = rx.recv().await {
            assert_eq!(reason, TriggerReason::FileWatch);
            triggered.push(task);
        }
        assert_eq!(triggered, vec!["watch:styles", "watch:scripts"]);
    }
}
