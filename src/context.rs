//! Shared bridge context
//!
//! All state shared between the listener, the metric engine and status readers
//! lives in one [`BridgeContext`], handed to each task behind an `Arc`. Every
//! shared structure has its own lock, held only while it is mutated or copied;
//! nothing is updated atomically across structures.
//!
//! | Structure | Writer | Readers |
//! |-----------|--------|---------|
//! | channel store | listener | engine, status |
//! | ingest state | listener | engine, status |
//! | connection tracker | listener | engine |
//! | metrics snapshot | engine | status |

use crate::buffer::ChannelStore;
use crate::config::BridgeConfig;
use crate::connection::ConnectionTracker;
use crate::decoder::DecodeStrategy;
use crate::types::{MetricsSnapshot, ParseStats};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use uuid::Uuid;

/// Counters and the latest decoder outcome, owned by the ingest path
#[derive(Debug, Clone, Default)]
pub struct IngestState {
    pub stats: ParseStats,
    /// Descriptor from the most recent successful decode
    pub last_update: Option<String>,
    pub last_strategy: Option<DecodeStrategy>,
}

/// State shared by every bridge task
#[derive(Debug)]
pub struct BridgeContext {
    config: BridgeConfig,
    started: Instant,
    instance_id: String,
    store: Mutex<ChannelStore>,
    ingest: Mutex<IngestState>,
    connection: Mutex<ConnectionTracker>,
    snapshot: RwLock<MetricsSnapshot>,
    running: AtomicBool,
}

impl BridgeContext {
    /// Create a context sized from `config`; the config is assumed validated
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            store: Mutex::new(ChannelStore::new(config.buffer_capacity)),
            ingest: Mutex::new(IngestState::default()),
            connection: Mutex::new(ConnectionTracker::new(config.stale_timeout())),
            snapshot: RwLock::new(MetricsSnapshot::default()),
            running: AtomicBool::new(true),
            started: Instant::now(),
            instance_id: Uuid::new_v4().to_string(),
            config,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Unique id of this bridge process, reported in status records
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Monotonic seconds since the context was created
    pub fn elapsed_secs(&self, now: Instant) -> f64 {
        now.saturating_duration_since(self.started).as_secs_f64()
    }

    pub fn store(&self) -> &Mutex<ChannelStore> {
        &self.store
    }

    pub fn ingest(&self) -> &Mutex<IngestState> {
        &self.ingest
    }

    pub fn connection(&self) -> &Mutex<ConnectionTracker> {
        &self.connection
    }

    pub fn snapshot(&self) -> &RwLock<MetricsSnapshot> {
        &self.snapshot
    }

    /// Copy of the parse counters
    pub fn parse_stats(&self) -> ParseStats {
        self.ingest.lock().stats
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Ask every task to finish its current step and exit
    pub fn request_shutdown(&self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Wall-clock UNIX time in fractional seconds
pub fn unix_timestamp() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}
