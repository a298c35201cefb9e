//! Metric engine
//!
//! Recomputes the [`MetricsSnapshot`] on a fixed cadence from whatever the
//! channel buffers hold at that moment. Cycles never queue up: a slow cycle
//! simply delays the next one.

use crate::context::{unix_timestamp, BridgeContext};
use crate::features::{MetricDeriver, MetricWindows};
use crate::types::{ConnectionStatus, MetricsSnapshot};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

/// Longest single sleep, so shutdown is noticed promptly
const SHUTDOWN_CHECK_SLICE: Duration = Duration::from_millis(100);

/// Fixed-cadence metric recompute loop
pub struct MetricEngine {
    context: Arc<BridgeContext>,
    interval: Duration,
}

impl MetricEngine {
    pub fn new(context: Arc<BridgeContext>) -> Self {
        let interval = context.config().recompute_interval();
        Self { context, interval }
    }

    /// Recompute and publish the snapshot using the current time
    pub fn recompute(&self) -> MetricsSnapshot {
        self.recompute_at(Instant::now())
    }

    /// Recompute and publish the snapshot as of `now`
    pub fn recompute_at(&self, now: Instant) -> MetricsSnapshot {
        let snapshot = compute_snapshot(&self.context, now);
        *self.context.snapshot().write() = snapshot.clone();
        snapshot
    }

    /// Run until the context's shutdown flag is cleared
    pub fn run(&self) {
        info!(interval_secs = self.interval.as_secs_f64(), "Metric engine started");

        while self.context.is_running() {
            let snapshot = self.recompute();
            debug!(
                heart_rate = ?snapshot.heart_rate,
                hrv_rmssd = ?snapshot.hrv_rmssd,
                eda_tonic = ?snapshot.eda_tonic,
                activity_level = ?snapshot.activity_level,
                temperature = ?snapshot.temperature,
                connection = snapshot.connection_status.as_str(),
                "Metrics recomputed"
            );
            self.sleep_interval();
        }

        info!("Metric engine stopped");
    }

    fn sleep_interval(&self) {
        let deadline = Instant::now() + self.interval;
        while self.context.is_running() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            thread::sleep(remaining.min(SHUTDOWN_CHECK_SLICE));
        }
    }
}

/// Build a fresh snapshot from the shared context without publishing it
pub fn compute_snapshot(context: &BridgeContext, now: Instant) -> MetricsSnapshot {
    let ingest = context.ingest().lock().clone();
    let (windows, raw_sample_count) = {
        let store = context.store().lock();
        (MetricWindows::capture(&store), store.total_len())
    };
    let (connection_status, lost_for) = {
        let tracker = context.connection().lock();
        (tracker.status(), tracker.lost_for(now))
    };

    let stats = ingest.stats;
    let mut snapshot = MetricsSnapshot {
        timestamp: unix_timestamp(),
        packets_received: stats.packets_received,
        successful_parses: stats.successful_parses,
        connection_status,
        raw_sample_count,
        ..MetricsSnapshot::default()
    };

    if stats.packets_received == 0 || stats.successful_parses == 0 {
        snapshot.clear_metrics();
        snapshot.last_update = format!(
            "Received {} packets, {} parsed",
            stats.packets_received, stats.successful_parses
        );
        return snapshot;
    }

    let derived = MetricDeriver::derive(&windows);
    for (metric, reason) in &derived.rejections {
        trace!(metric = *metric, %reason, "Metric unavailable");
    }

    snapshot.heart_rate = derived.heart_rate;
    snapshot.hrv_rmssd = derived.hrv_rmssd;
    snapshot.eda_tonic = derived.eda_tonic;
    snapshot.activity_level = derived.activity_level;
    snapshot.temperature = derived.temperature;

    snapshot.last_update = match (connection_status, lost_for) {
        (ConnectionStatus::Disconnected, Some(silence)) => {
            format!("Lost connection {}s ago", silence.as_secs())
        }
        _ => ingest
            .last_update
            .unwrap_or_else(|| "No sensor data received".to_string()),
    };

    snapshot
}
