//! Keeps the asset store current while the library changes
//!
//! [`AssetSync`] registers one change listener and re-runs the recent-assets
//! pipeline for every notification, publishing a full replacement each time.
//! Dropping or shutting down the sync removes only its own listener.

use capgate_api::LibraryChange;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::backend::{ListenerId, MediaLibraryBackend};
use crate::features::MediaPicker;

/// A steady stream of changes delays a debounced run by at most this many windows
const MAX_DEBOUNCE_WINDOWS: u32 = 4;

/// Options for an [`AssetSync`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncOptions {
    /// Coalesce notifications arriving within this window (milliseconds);
    /// `None` re-runs the pipeline for every notification
    pub debounce_ms: Option<u64>,
    /// Run the pipeline once right after subscribing
    pub sync_on_start: bool,
}

impl SyncOptions {
    pub fn debounce(&self) -> Option<Duration> {
        self.debounce_ms.map(Duration::from_millis)
    }
}

/// Subscription that republishes recent assets on every library change
pub struct AssetSync {
    library: Arc<dyn MediaLibraryBackend>,
    listener: Option<ListenerId>,
    shutdown_tx: mpsc::Sender<()>,
    task: Option<JoinHandle<()>>,
    completed: watch::Receiver<usize>,
}

impl AssetSync {
    /// Subscribe to `picker`'s library
    pub fn start(picker: MediaPicker, options: SyncOptions) -> Self {
        let library = Arc::clone(picker.library());

        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<LibraryChange>();
        let listener = library.add_listener(Arc::new(move |change: LibraryChange| {
            let _ = event_tx.send(change);
        }));
        tracing::info!(listener = listener.value(), "Asset sync subscribed");

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let (completed_tx, completed) = watch::channel(0usize);
        let debounce = options.debounce();

        let task = tokio::spawn(async move {
            if options.sync_on_start {
                run_pipeline(&picker, &completed_tx).await;
            }

            let mut deadline: Option<tokio::time::Instant> = None;
            let mut burst_start: Option<tokio::time::Instant> = None;
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        tracing::debug!("Asset sync shutting down");
                        break;
                    }

                    change = event_rx.recv() => {
                        let Some(change) = change else {
                            // Listener removed from the library
                            break;
                        };
                        tracing::debug!(
                            incremental = change.has_incremental_changes,
                            inserted = change.inserted.len(),
                            "Library changed"
                        );
                        match debounce {
                            Some(window) => {
                                let now = tokio::time::Instant::now();
                                let cap = *burst_start.get_or_insert(now)
                                    + window * MAX_DEBOUNCE_WINDOWS;
                                deadline = Some((now + window).min(cap));
                            }
                            None => run_pipeline(&picker, &completed_tx).await,
                        }
                    }

                    _ = async {
                        match deadline {
                            Some(at) => tokio::time::sleep_until(at).await,
                            None => std::future::pending::<()>().await,
                        }
                    } => {
                        deadline = None;
                        burst_start = None;
                        run_pipeline(&picker, &completed_tx).await;
                    }
                }
            }
        });

        Self {
            library,
            listener: Some(listener),
            shutdown_tx,
            task: Some(task),
            completed,
        }
    }

    /// Number of pipeline runs finished so far
    pub fn sync_count(&self) -> usize {
        *self.completed.borrow()
    }

    /// Wait until at least `count` pipeline runs have finished
    pub async fn wait_for_syncs(&self, count: usize) {
        let mut completed = self.completed.clone();
        // Only fails once the task is gone, and then no more runs can come
        let _ = completed.wait_for(|done| *done >= count).await;
    }

    pub fn is_subscribed(&self) -> bool {
        self.listener.is_some()
    }

    /// Deregister the listener and stop the sync task
    pub async fn shutdown(mut self) {
        self.unsubscribe();
        let _ = self.shutdown_tx.send(()).await;
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Asset sync task failed");
            }
        }
    }

    fn unsubscribe(&mut self) {
        if let Some(id) = self.listener.take() {
            let removed = self.library.remove_listener(id);
            tracing::info!(listener = id.value(), removed, "Asset sync unsubscribed");
        }
    }
}

impl Drop for AssetSync {
    fn drop(&mut self) {
        // The task ends on its own once the listener (and its sender) is gone
        self.unsubscribe();
    }
}

impl std::fmt::Debug for AssetSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetSync")
            .field("listener", &self.listener)
            .field("syncs", &self.sync_count())
            .finish()
    }
}

async fn run_pipeline(picker: &MediaPicker, completed: &watch::Sender<usize>) {
    match picker.list_recent_assets().await {
        Ok(Some(count)) => tracing::debug!(count, "Asset sync published"),
        Ok(None) => tracing::debug!("Asset sync skipped, library access not granted"),
        // Nobody awaits this pipeline, so the failure ends here
        Err(e) => tracing::warn!(error = %e, "Asset sync failed"),
    }
    completed.send_modify(|done| *done += 1);
}
