//! Bridge configuration
//!
//! Every deployment difference (bind address, port, cadence, buffer sizes) is a
//! configuration value rather than a separate build of the bridge.

use crate::buffer::DEFAULT_BUFFER_CAPACITY;
use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

/// Default UDP port the wearable streams to
pub const DEFAULT_PORT: u16 = 3000;

/// Default interval between metric recomputes (seconds)
pub const DEFAULT_RECOMPUTE_INTERVAL_SECS: f64 = 2.0;

/// Default silence after which the wearable is considered disconnected (seconds)
pub const DEFAULT_STALE_TIMEOUT_SECS: f64 = 10.0;

/// Default receive timeout, which doubles as the staleness poll interval (seconds)
pub const DEFAULT_POLL_INTERVAL_SECS: f64 = 2.0;

/// Default largest datagram accepted (bytes)
pub const DEFAULT_MAX_DATAGRAM_BYTES: usize = 8192;

/// Shortest accepted interval or timeout (seconds)
pub const MIN_INTERVAL_SECS: f64 = 0.001;

/// Longest accepted interval or timeout (seconds, one year)
pub const MAX_INTERVAL_SECS: f64 = 365.0 * 24.0 * 3600.0;

/// Runtime configuration for the bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Address the UDP listener binds to
    pub bind_address: IpAddr,
    /// UDP port the listener binds to (0 picks an ephemeral port)
    pub port: u16,
    /// Seconds between metric recomputes
    pub recompute_interval_secs: f64,
    /// Samples retained per channel
    pub buffer_capacity: usize,
    /// Seconds without datagrams before the link is reported disconnected
    pub stale_timeout_secs: f64,
    /// Receive timeout in seconds; staleness is re-checked on every timeout
    pub poll_interval_secs: f64,
    /// Receive buffer size in bytes; longer datagrams are truncated
    pub max_datagram_bytes: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            recompute_interval_secs: DEFAULT_RECOMPUTE_INTERVAL_SECS,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            stale_timeout_secs: DEFAULT_STALE_TIMEOUT_SECS,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            max_datagram_bytes: DEFAULT_MAX_DATAGRAM_BYTES,
        }
    }
}

impl BridgeConfig {
    /// Load configuration from a JSON file; missing fields take defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Parse configuration from JSON; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: BridgeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to pretty JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the bridge cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.buffer_capacity == 0 {
            return Err(BridgeError::InvalidConfig(
                "buffer_capacity must be at least 1".to_string(),
            ));
        }
        if self.max_datagram_bytes == 0 {
            return Err(BridgeError::InvalidConfig(
                "max_datagram_bytes must be at least 1".to_string(),
            ));
        }
        for (name, secs) in [
            ("recompute_interval_secs", self.recompute_interval_secs),
            ("stale_timeout_secs", self.stale_timeout_secs),
            ("poll_interval_secs", self.poll_interval_secs),
        ] {
            if !(MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS).contains(&secs) {
                return Err(BridgeError::InvalidConfig(format!(
                    "{} must be between {} and {} seconds, got {}",
                    name, MIN_INTERVAL_SECS, MAX_INTERVAL_SECS, secs
                )));
            }
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    pub fn recompute_interval(&self) -> Duration {
        bounded_duration(self.recompute_interval_secs)
    }

    pub fn stale_timeout(&self) -> Duration {
        bounded_duration(self.stale_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        bounded_duration(self.poll_interval_secs)
    }
}

/// Clamp to the accepted interval range so unvalidated configs cannot panic
fn bounded_duration(secs: f64) -> Duration {
    if secs.is_nan() {
        return Duration::from_secs_f64(MIN_INTERVAL_SECS);
    }
    Duration::from_secs_f64(secs.clamp(MIN_INTERVAL_SECS, MAX_INTERVAL_SECS))
}
