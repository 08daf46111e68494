//! Progress reconciler (`spec.md` §4.7).
//!
//! One periodic pass issues a single `ListTorrents` call, batch-loads the
//! matching history rows, maps the client's state strings onto
//! [`DownloadStatus`], and commits every change in one transaction. A
//! `ListTorrents` failure never cascades into marking torrents failed — the
//! pass is simply skipped and retried next period.

use std::collections::HashSet;
use std::time::Duration;

use submikan_data::models::{DownloadStatus, ProgressUpdate};
use submikan_torrent_core::TorrentClient;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::context::AppContext;

/// Handle to a running progress reconciler loop.
pub struct ReconcilerHandle {
    shutdown_tx: watch::Sender<bool>,
    join_handle: Mutex<Option<JoinHandle<()>>>,
}

impl ReconcilerHandle {
    /// Signal the reconciler loop to stop and wait for the pass currently in
    /// flight to finish.
    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.join_handle.lock().await.take() {
            if let Err(err) = handle.await {
                warn!(error = %err, "reconciler task join failed");
            }
        }
    }
}

/// Start the progress reconciler loop as a background task.
pub fn start(ctx: AppContext) -> ReconcilerHandle {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let join_handle = tokio::spawn(run(ctx, shutdown_rx));
    ReconcilerHandle {
        shutdown_tx,
        join_handle: Mutex::new(Some(join_handle)),
    }
}

async fn run(ctx: AppContext, mut shutdown_rx: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(Duration::from_secs(ctx.config.progress_sync_interval_seconds));
    loop {
        tokio::select! {
            _ = ticker.tick() => sync_once(&ctx).await,
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }
}

async fn sync_once(ctx: &AppContext) {
    let snapshots = match ctx.torrent.list_torrents(None).await {
        Ok(snapshots) => snapshots,
        Err(err) => {
            warn!(error = %err, "failed to list torrents from client, skipping this reconciler pass");
            ctx.metrics.inc_reconciler_sync("error");
            return;
        }
    };

    let hashes: Vec<String> = snapshots.iter().map(|snapshot| snapshot.hash.clone()).collect();
    let known: HashSet<String> = match ctx.gateway.download_history.list_by_hashes(&hashes).await {
        Ok(rows) => rows.into_iter().map(|row| row.torrent_hash).collect(),
        Err(err) => {
            error!(error = %err, "failed to batch-load history rows for reconciliation");
            ctx.metrics.inc_reconciler_sync("error");
            return;
        }
    };

    let updates: Vec<ProgressUpdate> = snapshots
        .iter()
        .filter(|snapshot| known.contains(&snapshot.hash))
        .filter_map(|snapshot| {
            let status = map_client_state(&snapshot.state)?;
            let progress = if status == DownloadStatus::Completed {
                100.0
            } else {
                snapshot.progress * 100.0
            };
            let error_message = (status == DownloadStatus::Failed)
                .then(|| format!("torrent client reports state {}", snapshot.state));
            Some(ProgressUpdate {
                torrent_hash: snapshot.hash.clone(),
                status,
                progress,
                download_speed: snapshot.dlspeed,
                eta: snapshot.eta,
                num_seeds: snapshot.num_seeds,
                num_leechers: snapshot.num_leechs,
                error_message,
            })
        })
        .collect();

    for snapshot in snapshots.iter().filter(|snapshot| known.contains(&snapshot.hash)) {
        if map_client_state(&snapshot.state).is_none() {
            debug!(hash = %snapshot.hash, state = %snapshot.state, "unrecognized torrent client state, leaving row untouched");
        }
    }

    if let Err(err) = ctx.gateway.download_history.update_progress_batch(&updates).await {
        error!(error = %err, "failed to commit progress reconciliation batch");
        ctx.metrics.inc_reconciler_sync("error");
        return;
    }

    let active = updates
        .iter()
        .filter(|update| matches!(update.status, DownloadStatus::Pending | DownloadStatus::Downloading))
        .count();
    ctx.metrics.set_active_downloads(i64::try_from(active).unwrap_or(i64::MAX));
    ctx.metrics.inc_reconciler_sync("ok");
}

/// Map a qBittorrent WebUI state string onto this application's lifecycle
/// states (`spec.md` §4.7 step 3). Returns `None` for states this system
/// does not model, leaving the row untouched rather than guessing.
fn map_client_state(state: &str) -> Option<DownloadStatus> {
    match state {
        "downloading" | "forcedDL" | "metaDL" | "allocating" | "checkingDL" | "stalledDL" => {
            Some(DownloadStatus::Downloading)
        }
        "uploading" | "stalledUP" | "queuedUP" | "checkingUP" | "forcedUP" => {
            Some(DownloadStatus::Completed)
        }
        "pausedDL" | "queuedDL" => Some(DownloadStatus::Pending),
        "error" | "missingFiles" => Some(DownloadStatus::Failed),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_active_states_to_downloading() {
        for state in ["downloading", "forcedDL", "metaDL", "allocating", "checkingDL", "stalledDL"] {
            assert_eq!(map_client_state(state), Some(DownloadStatus::Downloading));
        }
    }

    #[test]
    fn maps_seeding_states_to_completed() {
        for state in ["uploading", "stalledUP", "queuedUP", "checkingUP", "forcedUP"] {
            assert_eq!(map_client_state(state), Some(DownloadStatus::Completed));
        }
    }

    #[test]
    fn maps_paused_states_to_pending() {
        assert_eq!(map_client_state("pausedDL"), Some(DownloadStatus::Pending));
        assert_eq!(map_client_state("queuedDL"), Some(DownloadStatus::Pending));
    }

    #[test]
    fn maps_failure_states_to_failed() {
        assert_eq!(map_client_state("error"), Some(DownloadStatus::Failed));
        assert_eq!(map_client_state("missingFiles"), Some(DownloadStatus::Failed));
    }

    #[test]
    fn unrecognized_state_maps_to_none() {
        assert_eq!(map_client_state("some_future_state"), None);
    }
}
