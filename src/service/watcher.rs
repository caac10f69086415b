use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, select};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::foundation::error::{SyncError, SyncResult};
use crate::service::frame_service::FrameService;

/// Reloads the served scene whenever its source directory changes.
///
/// Events are forwarded from the `notify` callback into a channel and handled on a dedicated
/// thread. A burst of events arriving within the debounce window triggers a single reload.
/// Dropping the watcher stops the thread.
pub struct SceneWatcher {
    dir: PathBuf,
    shutdown: Sender<()>,
    thread: Option<JoinHandle<()>>,
    _watcher: RecommendedWatcher,
}

impl std::fmt::Debug for SceneWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneWatcher")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

impl SceneWatcher {
    /// Watch the directory of `service`'s scene file.
    ///
    /// Returns `Ok(None)` when the scene source has no file behind it.
    pub fn spawn(service: Arc<FrameService>, debounce: Duration) -> SyncResult<Option<Self>> {
        let Some(path) = service.source().watch_path() else {
            return Ok(None);
        };
        let dir = watch_dir(path);

        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    let _ = event_tx.send(event);
                }
                Err(e) => tracing::warn!(error = %e, "watch error"),
            }
        })
        .map_err(|e| SyncError::Other(anyhow::Error::new(e).context("creating file watcher")))?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| {
                SyncError::Other(
                    anyhow::Error::new(e).context(format!("watching {}", dir.display())),
                )
            })?;

        let (shutdown, shutdown_rx) = crossbeam_channel::bounded(1);
        let thread = std::thread::Builder::new()
            .name("framesync-watcher".to_owned())
            .spawn(move || {
                tracing::trace!("watcher thread started");
                watch_loop(&service, &event_rx, &shutdown_rx, debounce);
                tracing::trace!("watcher thread stopped");
            })
            .map_err(|e| {
                SyncError::Other(anyhow::Error::new(e).context("starting watcher thread"))
            })?;

        tracing::info!(dir = %dir.display(), "watching scene sources");
        Ok(Some(Self {
            dir,
            shutdown,
            thread: Some(thread),
            _watcher: watcher,
        }))
    }

    /// Directory being watched.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Drop for SceneWatcher {
    fn drop(&mut self) {
        let _ = self.shutdown.try_send(());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn watch_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        Some(_) => PathBuf::from("."),
        None => path.to_path_buf(),
    }
}

fn is_source_change(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

fn watch_loop(
    service: &FrameService,
    events: &Receiver<Event>,
    shutdown: &Receiver<()>,
    debounce: Duration,
) {
    loop {
        select! {
            recv(events) -> event => {
                let Ok(event) = event else {
                    return;
                };
                if !is_source_change(&event) {
                    continue;
                }
                tracing::debug!(paths = ?event.paths, "scene source changed");

                // Swallow the rest of the burst.
                let deadline = Instant::now() + debounce;
                loop {
                    match events.recv_deadline(deadline) {
                        Ok(_) => continue,
                        Err(RecvTimeoutError::Timeout) => break,
                        Err(RecvTimeoutError::Disconnected) => return,
                    }
                }
                if shutdown.try_recv().is_ok() {
                    return;
                }

                let outcome = service.on_file_changed();
                tracing::info!(?outcome, status = ?service.status(), "scene reloaded");
            }
            recv(shutdown) -> _ => {
                tracing::trace!("watcher shutdown signal received");
                return;
            }
        }
    }
}
