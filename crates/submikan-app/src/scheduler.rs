//! Fair-selection polling scheduler (`spec.md` §4.1).
//!
//! One tick selects up to `max_subscriptions_per_poll` subscriptions ordered
//! by `last_checked_at` ascending (nulls first) so a persistently slow or
//! failing subscription never starves the others, then checks them
//! concurrently under a bounded semaphore. A per-task panic or error is
//! logged and does not abort the rest of the batch.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, Semaphore, broadcast, mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{error, info, warn};

use crate::context::AppContext;
use crate::pipeline::{self, CheckResult};

/// Handle to a running scheduler loop.
pub struct SchedulerHandle {
    kick_tx: mpsc::UnboundedSender<i64>,
    shutdown_tx: watch::Sender<bool>,
    results_tx: broadcast::Sender<CheckResult>,
    join_handle: Mutex<Option<JoinHandle<()>>>,
}

impl SchedulerHandle {
    /// Request an out-of-band check of one subscription, independent of the
    /// regular tick cadence.
    pub fn kick_subscription(&self, subscription_id: i64) {
        if self.kick_tx.send(subscription_id).is_err() {
            warn!(subscription_id, "scheduler loop has already exited, dropping kick request");
        }
    }

    /// Subscribe to per-subscription check results as they complete.
    pub fn subscribe_results(&self) -> broadcast::Receiver<CheckResult> {
        self.results_tx.subscribe()
    }

    /// Signal the scheduler loop to stop and wait for it to finish the
    /// batch currently in flight.
    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.join_handle.lock().await.take() {
            if let Err(err) = handle.await {
                warn!(error = %err, "scheduler task join failed");
            }
        }
    }
}

/// Start the scheduler loop as a background task.
pub fn start(ctx: AppContext) -> SchedulerHandle {
    let (kick_tx, kick_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (results_tx, _) = broadcast::channel(256);
    let results_tx_task = results_tx.clone();

    let join_handle = tokio::spawn(run(ctx, kick_rx, shutdown_rx, results_tx_task));

    SchedulerHandle {
        kick_tx,
        shutdown_tx,
        results_tx,
        join_handle: Mutex::new(Some(join_handle)),
    }
}

async fn run(
    ctx: AppContext,
    mut kick_rx: mpsc::UnboundedReceiver<i64>,
    mut shutdown_rx: watch::Receiver<bool>,
    results_tx: broadcast::Sender<CheckResult>,
) {
    if !ctx.config.enable_polling {
        info!("polling disabled via configuration, scheduler loop exiting");
        return;
    }

    tokio::select! {
        () = tokio::time::sleep(Duration::from_secs(ctx.config.startup_delay_seconds)) => {}
        _ = shutdown_rx.changed() => return,
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(
        u64::from(ctx.config.polling_interval_minutes) * 60,
    ));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => run_tick(&ctx, &results_tx).await,
            Some(subscription_id) = kick_rx.recv() => run_kick(&ctx, subscription_id, &results_tx).await,
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }
    info!("scheduler loop exiting");
}

async fn run_tick(ctx: &AppContext, results_tx: &broadcast::Sender<CheckResult>) {
    let started = Instant::now();
    let limit = i64::from(ctx.config.max_subscriptions_per_poll);
    let subscriptions = match ctx.gateway.subscriptions.list_enabled_for_poll(limit).await {
        Ok(rows) => rows,
        Err(err) => {
            error!(error = %err, "failed to list subscriptions for this tick");
            return;
        }
    };

    let semaphore = Arc::new(Semaphore::new(ctx.config.max_concurrent_fetches));
    let mut tasks = JoinSet::new();
    for subscription in subscriptions {
        let ctx = ctx.clone();
        let semaphore = Arc::clone(&semaphore);
        let results_tx = results_tx.clone();
        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("scheduler semaphore is never closed");
            let result = pipeline::check_subscription(&ctx, &subscription).await;
            let _ = results_tx.send(result);
        });
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(err) = joined {
            error!(error = %err, "subscription check task panicked");
        }
    }

    ctx.metrics.inc_scheduler_tick();
    ctx.metrics.observe_scheduler_tick_duration(started.elapsed());
}

async fn run_kick(ctx: &AppContext, subscription_id: i64, results_tx: &broadcast::Sender<CheckResult>) {
    match ctx.gateway.subscriptions.get_by_id(subscription_id).await {
        Ok(Some(subscription)) => {
            let result = pipeline::check_subscription(ctx, &subscription).await;
            let _ = results_tx.send(result);
        }
        Ok(None) => warn!(subscription_id, "kick requested for an unknown subscription"),
        Err(err) => error!(subscription_id, error = %err, "failed to load subscription for kick"),
    }
}
