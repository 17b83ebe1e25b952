// src/watch/watcher.rs

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use notify::event::EventKind;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::watch::event_handler::process_changes;
use crate::watch::patterns::WatchBinding;

/// Window in which bursts of notify events are merged into one batch.
pub const DEBOUNCE: Duration = Duration::from_millis(50);

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive; dropping the handle stops
/// file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Watch `root` recursively and send `RuntimeEvent::TaskTriggered` for the
/// reload node of every binding a change matches.
///
/// - `root` is the project root all binding globs are relative to.
/// - `bindings` are the compiled, non-inert bindings.
/// - `runtime_tx` is the channel into the main runtime.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    bindings: Vec<WatchBinding>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or(root);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    // Called synchronously by notify on its own thread.
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if event_tx.send(event).is_err() {
                    debug!("watcher loop gone; dropping notify event");
                }
            }
            Err(err) => warn!(error = %err, "file watch error"),
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;

    info!(root = %root.display(), bindings = bindings.len(), "file watcher started");

    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            let mut batch = BTreeSet::new();
            collect_paths(event, &mut batch);

            let deadline = Instant::now() + DEBOUNCE;
            let mut closed = false;
            loop {
                match tokio::time::timeout_at(deadline, event_rx.recv()).await {
                    Ok(Some(event)) => collect_paths(event, &mut batch),
                    Ok(None) => {
                        closed = true;
                        break;
                    }
                    Err(_) => break,
                }
            }

            if !batch.is_empty() {
                debug!(paths = ?batch, "debounced change batch");
                if !process_changes(&root, &batch, &bindings, &runtime_tx).await {
                    break;
                }
            }

            if closed {
                break;
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}

/// Add the paths of a content-relevant event to `batch`.
fn collect_paths(event: Event, batch: &mut BTreeSet<PathBuf>) {
    if matches!(event.kind, EventKind::Access(_)) {
        return;
    }
    batch.extend(event.paths);
}
