//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes the counters/gauges relevant to the subscription polling engine:
//!   scheduler ticks, feed fetches, filter decisions, and torrent submissions.

use std::convert::TryFrom;
use std::time::Duration;

use anyhow::{Context, Result};
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: std::sync::Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    scheduler_ticks_total: IntCounter,
    subscriptions_polled_total: IntCounterVec,
    feed_fetch_total: IntCounterVec,
    filter_decisions_total: IntCounterVec,
    downloads_submitted_total: IntCounterVec,
    reconciler_syncs_total: IntCounterVec,
    active_downloads: IntGauge,
    scheduler_tick_duration_ms: IntGauge,
}

/// Snapshot of selected gauges and counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Number of scheduler ticks executed since process start.
    pub scheduler_ticks_total: u64,
    /// Current count of downloads in a non-terminal state.
    pub active_downloads: i64,
    /// Duration of the most recent scheduler tick, in milliseconds.
    pub scheduler_tick_duration_ms: i64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let scheduler_ticks_total = IntCounter::with_opts(Opts::new(
            "scheduler_ticks_total",
            "Scheduler batches executed",
        ))?;
        let subscriptions_polled_total = IntCounterVec::new(
            Opts::new(
                "subscriptions_polled_total",
                "Subscriptions polled by outcome",
            ),
            &["outcome"],
        )?;
        let feed_fetch_total = IntCounterVec::new(
            Opts::new("feed_fetch_total", "Feed fetch attempts by outcome"),
            &["outcome"],
        )?;
        let filter_decisions_total = IntCounterVec::new(
            Opts::new(
                "filter_decisions_total",
                "Filter pipeline decisions by kind",
            ),
            &["decision"],
        )?;
        let downloads_submitted_total = IntCounterVec::new(
            Opts::new(
                "downloads_submitted_total",
                "Torrents submitted to the download controller by outcome",
            ),
            &["outcome"],
        )?;
        let reconciler_syncs_total = IntCounterVec::new(
            Opts::new(
                "reconciler_syncs_total",
                "Progress reconciliation passes by outcome",
            ),
            &["outcome"],
        )?;
        let active_downloads = IntGauge::with_opts(Opts::new(
            "active_downloads",
            "Downloads currently in a non-terminal state",
        ))?;
        let scheduler_tick_duration_ms = IntGauge::with_opts(Opts::new(
            "scheduler_tick_duration_ms",
            "Duration of the most recent scheduler tick in milliseconds",
        ))?;

        registry.register(Box::new(scheduler_ticks_total.clone()))?;
        registry.register(Box::new(subscriptions_polled_total.clone()))?;
        registry.register(Box::new(feed_fetch_total.clone()))?;
        registry.register(Box::new(filter_decisions_total.clone()))?;
        registry.register(Box::new(downloads_submitted_total.clone()))?;
        registry.register(Box::new(reconciler_syncs_total.clone()))?;
        registry.register(Box::new(active_downloads.clone()))?;
        registry.register(Box::new(scheduler_tick_duration_ms.clone()))?;

        Ok(Self {
            inner: std::sync::Arc::new(MetricsInner {
                registry,
                scheduler_ticks_total,
                subscriptions_polled_total,
                feed_fetch_total,
                filter_decisions_total,
                downloads_submitted_total,
                reconciler_syncs_total,
                active_downloads,
                scheduler_tick_duration_ms,
            }),
        })
    }

    /// Record completion of one scheduler batch.
    pub fn inc_scheduler_tick(&self) {
        self.inner.scheduler_ticks_total.inc();
    }

    /// Record a single subscription poll outcome (`ok`, `error`).
    pub fn inc_subscription_polled(&self, outcome: &str) {
        self.inner
            .subscriptions_polled_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Record a feed fetch attempt outcome (`ok`, `timeout`, `http_error`, `network_error`).
    pub fn inc_feed_fetch(&self, outcome: &str) {
        self.inner
            .feed_fetch_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Record a filter pipeline decision (`accept`, `reject_duplicate`, `reject_subgroup`,
    /// `reject_keyword`, `reject_undownloadable`).
    pub fn inc_filter_decision(&self, decision: &str) {
        self.inner
            .filter_decisions_total
            .with_label_values(&[decision])
            .inc();
    }

    /// Record a torrent submission outcome (`ok`, `rejected`, `unavailable`).
    pub fn inc_download_submitted(&self, outcome: &str) {
        self.inner
            .downloads_submitted_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Record a progress reconciliation pass outcome (`ok`, `error`).
    pub fn inc_reconciler_sync(&self, outcome: &str) {
        self.inner
            .reconciler_syncs_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Set the active-downloads gauge.
    pub fn set_active_downloads(&self, count: i64) {
        self.inner.active_downloads.set(count);
    }

    /// Record the duration of the most recent scheduler tick.
    pub fn observe_scheduler_tick_duration(&self, duration: Duration) {
        self.inner
            .scheduler_tick_duration_ms
            .set(Self::duration_to_ms(duration));
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .context("failed to encode Prometheus metrics")?;
        String::from_utf8(buffer).context("metrics output was not valid UTF-8")
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            scheduler_ticks_total: self.inner.scheduler_ticks_total.get(),
            active_downloads: self.inner.active_downloads.get(),
            scheduler_tick_duration_ms: self.inner.scheduler_tick_duration_ms.get(),
        }
    }

    /// Convert a duration to milliseconds saturating at `i64::MAX`.
    pub(crate) fn duration_to_ms(duration: Duration) -> i64 {
        i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn duration_to_ms_saturates_on_large_values() {
        let duration = Duration::from_secs(u64::MAX / 2);
        assert_eq!(Metrics::duration_to_ms(duration), i64::MAX);
    }

    #[test]
    fn metrics_snapshot_reflects_updates() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_scheduler_tick();
        metrics.inc_subscription_polled("ok");
        metrics.inc_feed_fetch("ok");
        metrics.inc_filter_decision("accept");
        metrics.inc_download_submitted("ok");
        metrics.inc_reconciler_sync("ok");
        metrics.set_active_downloads(3);
        metrics.observe_scheduler_tick_duration(Duration::from_millis(250));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.scheduler_ticks_total, 1);
        assert_eq!(snapshot.active_downloads, 3);
        assert_eq!(snapshot.scheduler_tick_duration_ms, 250);

        let rendered = metrics.render()?;
        assert!(rendered.contains("scheduler_ticks_total"));
        assert!(rendered.contains("downloads_submitted_total"));
        Ok(())
    }
}
