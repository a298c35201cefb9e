//! Connection state tracking
//!
//! The wearable never says goodbye, so link state is inferred from datagram
//! timing alone: any receipt means connected, and a silence longer than the
//! staleness timeout means disconnected. Parse success plays no part.

use crate::types::ConnectionStatus;
use std::time::{Duration, Instant};

/// Receipt-timing based connection tracker
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    stale_after: Duration,
    last_receipt: Option<Instant>,
    status: ConnectionStatus,
}

impl ConnectionTracker {
    /// Start disconnected; go stale after `stale_after` without datagrams
    pub fn new(stale_after: Duration) -> Self {
        Self {
            stale_after,
            last_receipt: None,
            status: ConnectionStatus::Disconnected,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn last_receipt(&self) -> Option<Instant> {
        self.last_receipt
    }

    /// A datagram arrived at `now`
    pub fn record_receipt(&mut self, now: Instant) {
        self.last_receipt = Some(now);
        self.status = ConnectionStatus::Connected;
    }

    /// Mark the link disconnected if the last receipt is older than the timeout.
    ///
    /// Returns the silence duration when this call caused the transition.
    pub fn check_staleness(&mut self, now: Instant) -> Option<Duration> {
        if self.status != ConnectionStatus::Connected {
            return None;
        }
        let silence = now.saturating_duration_since(self.last_receipt?);
        if silence > self.stale_after {
            self.status = ConnectionStatus::Disconnected;
            Some(silence)
        } else {
            None
        }
    }

    /// How long the link has been silent, once it has been declared lost
    pub fn lost_for(&self, now: Instant) -> Option<Duration> {
        match self.status {
            ConnectionStatus::Disconnected => self
                .last_receipt
                .map(|last| now.saturating_duration_since(last)),
            ConnectionStatus::Connected => None,
        }
    }
}
