// src/bot/watcher.rs - Sample corpora watcher with debounced reloads

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, error, info, warn};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Target of watcher-triggered reloads. [`crate::bot::SpamFilter`] is the
/// production implementation; tests substitute counters.
#[async_trait]
pub trait Reloader: Send + Sync {
    async fn reload(&self) -> Result<()>;
}

/// Spawn the background watcher over the parent directories of `files`.
/// Events for other files in those directories are ignored. A burst of
/// relevant events within `delay` coalesces into a single reload; the
/// timer restarts on every event, so the reload fires `delay` after the
/// burst went quiet.
pub fn spawn(
    reloader: std::sync::Arc<dyn Reloader>,
    files: Vec<PathBuf>,
    delay: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let (tx, mut rx) = mpsc::channel::<Event>(100);

        let mut watcher = match notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    if let Err(err) = tx.blocking_send(event) {
                        error!("failed to forward file watch event: {err}");
                    }
                }
                Err(err) => error!("file watch error: {err}"),
            }
        }) {
            Ok(watcher) => watcher,
            Err(err) => {
                error!("failed to create file watcher: {err}");
                return;
            }
        };

        let names: HashSet<PathBuf> = files
            .iter()
            .filter_map(|f| f.file_name().map(PathBuf::from))
            .collect();

        let mut dirs: HashSet<PathBuf> = HashSet::new();
        for file in &files {
            let dir = match file.parent() {
                Some(dir) if !dir.as_os_str().is_empty() => dir,
                _ => Path::new("."),
            };
            dirs.insert(dir.to_path_buf());
        }
        for dir in &dirs {
            if let Err(err) = watcher.watch(dir, RecursiveMode::NonRecursive) {
                warn!("failed to watch {}: {err}", dir.display());
            }
        }
        info!("sample watcher started for {} file(s), delay {:?}", files.len(), delay);

        let timer = tokio::time::sleep(delay);
        tokio::pin!(timer);
        let mut armed = false;

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    debug!("sample watcher stopped");
                    return;
                }

                maybe_event = rx.recv() => {
                    let Some(event) = maybe_event else {
                        debug!("file watch channel closed");
                        return;
                    };
                    if !is_relevant(&event, &names) {
                        continue;
                    }
                    debug!("file watch event: {:?} {:?}", event.kind, event.paths);
                    timer.as_mut().reset(Instant::now() + delay);
                    armed = true;
                }

                _ = timer.as_mut(), if armed => {
                    armed = false;
                    info!("sample files changed, reloading");
                    if let Err(err) = reloader.reload().await {
                        error!("failed to reload samples: {err}");
                    }
                }
            }
        }
    })
}

fn is_relevant(event: &Event, names: &HashSet<PathBuf>) -> bool {
    if !matches!(
        event.kind,
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
    ) {
        return false;
    }
    event
        .paths
        .iter()
        .filter_map(|p| p.file_name())
        .any(|name| names.contains(Path::new(name)))
}
