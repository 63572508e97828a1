//! Watch loop: re-run the stage whose watch glob matches a changed file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc, Mutex};

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use pipewright_static::{PathTable, Pipeline, Task};
use tokio::sync::mpsc as async_mpsc;

use crate::server::ServerError;

/// Recursive watcher over a source root.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Watch `root` and forward the paths of created, modified and removed
    /// files to the returned channel. No debouncing is applied.
    pub fn new(root: &Path) -> Result<(Self, async_mpsc::Receiver<PathBuf>), ServerError> {
        let (sync_tx, sync_rx) = mpsc::channel();
        let (async_tx, async_rx) = async_mpsc::channel(100);

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    let _ = sync_tx.send(event);
                }
                Err(e) => tracing::warn!("Watch error: {}", e),
            }
        })?;
        watcher.watch(root, RecursiveMode::Recursive)?;

        std::thread::spawn(move || {
            while let Ok(event) = sync_rx.recv() {
                if !is_change(&event.kind) {
                    continue;
                }
                for path in event.paths {
                    if async_tx.blocking_send(path).is_err() {
                        return;
                    }
                }
            }
        });

        Ok((Self { _watcher: watcher }, async_rx))
    }
}

fn is_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

/// Tasks to re-run for a changed path, without duplicates.
pub fn tasks_for_change(table: &PathTable, path: &Path) -> Vec<Task> {
    let mut tasks: Vec<Task> = Vec::new();
    for kind in table.kinds_watching(path) {
        let task = Task::for_change(kind);
        if !tasks.contains(&task) {
            tasks.push(task);
        }
    }
    tasks
}

/// Names of tasks currently running, for the opt-in single-flight guard.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    running: Arc<Mutex<HashSet<&'static str>>>,
}

impl InFlight {
    /// Mark `task` as running. Returns `None` if it already is.
    pub fn try_start(&self, task: Task) -> Option<InFlightGuard> {
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        if running.insert(task.name()) {
            Some(InFlightGuard {
                running: Arc::clone(&self.running),
                name: task.name(),
            })
        } else {
            None
        }
    }
}

/// Clears the in-flight mark when the run ends.
pub struct InFlightGuard {
    running: Arc<Mutex<HashSet<&'static str>>>,
    name: &'static str,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        running.remove(self.name);
    }
}

/// Watch the source root and re-run stages until the watcher goes away.
///
/// Runs for the same task may overlap unless `watch.single_flight` is set.
/// A failing run has already been logged by the pipeline; the loop keeps
/// going.
pub async fn watch(pipeline: Arc<Pipeline>) -> Result<(), ServerError> {
    let root = pipeline.config().dirs.src.clone();
    let (watcher, mut rx) = FileWatcher::new(&root)?;
    let single_flight = pipeline.config().watch.single_flight;
    let in_flight = InFlight::default();

    tracing::info!("Watching {} for changes", root.display());

    while let Some(path) = rx.recv().await {
        for task in tasks_for_change(pipeline.table(), &path) {
            tracing::info!("{} changed, running {}", path.display(), task.name());

            let guard = if single_flight {
                match in_flight.try_start(task) {
                    Some(guard) => Some(guard),
                    None => {
                        tracing::debug!("{} still running, skipping", task.name());
                        continue;
                    }
                }
            } else {
                None
            };

            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move {
                if pipeline.run(task).await.is_err() {
                    tracing::debug!("{} failed, waiting for the next change", task.name());
                }
                drop(guard);
            });
        }
    }

    drop(watcher);
    Ok(())
}
