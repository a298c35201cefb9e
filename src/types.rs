//! Core types for the biosensor bridge
//!
//! This module defines the data structures shared by every stage of the bridge:
//! sensor channels and samples, the metrics snapshot, ingest statistics, and the
//! status record handed to the presentation layer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Named sensor channel reported by the wearable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Channel {
    PpgInfrared,
    PpgRed,
    PpgGreen,
    Eda,
    #[serde(rename = "TEMPERATURE_0")]
    Temperature0,
    AccelerometerX,
    AccelerometerY,
    AccelerometerZ,
    GyroscopeX,
    GyroscopeY,
    GyroscopeZ,
}

impl Channel {
    /// Every known channel, in declaration order
    pub const ALL: [Channel; 11] = [
        Channel::PpgInfrared,
        Channel::PpgRed,
        Channel::PpgGreen,
        Channel::Eda,
        Channel::Temperature0,
        Channel::AccelerometerX,
        Channel::AccelerometerY,
        Channel::AccelerometerZ,
        Channel::GyroscopeX,
        Channel::GyroscopeY,
        Channel::GyroscopeZ,
    ];

    /// Accelerometer axes in X, Y, Z rotation order
    pub const ACCELEROMETER: [Channel; 3] = [
        Channel::AccelerometerX,
        Channel::AccelerometerY,
        Channel::AccelerometerZ,
    ];

    /// Wire name of the channel
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::PpgInfrared => "PPG_INFRARED",
            Channel::PpgRed => "PPG_RED",
            Channel::PpgGreen => "PPG_GREEN",
            Channel::Eda => "EDA",
            Channel::Temperature0 => "TEMPERATURE_0",
            Channel::AccelerometerX => "ACCELEROMETER_X",
            Channel::AccelerometerY => "ACCELEROMETER_Y",
            Channel::AccelerometerZ => "ACCELEROMETER_Z",
            Channel::GyroscopeX => "GYROSCOPE_X",
            Channel::GyroscopeY => "GYROSCOPE_Y",
            Channel::GyroscopeZ => "GYROSCOPE_Z",
        }
    }

    /// Look up a channel by its exact wire name
    pub fn from_name(name: &str) -> Option<Channel> {
        Channel::ALL.iter().copied().find(|c| c.as_str() == name)
    }

    /// Position of the channel inside [`Channel::ALL`]
    pub(crate) fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single timestamped sensor reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Monotonic seconds since the bridge started
    pub timestamp: f64,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: f64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Link state derived purely from datagram receipt timing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connected,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
        }
    }
}

/// Derived physiological metrics, recomputed on a fixed cadence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Heart rate (bpm)
    pub heart_rate: Option<u32>,
    /// Heart rate variability, RMSSD (ms)
    pub hrv_rmssd: Option<u32>,
    /// Skin conductance tonic level
    pub eda_tonic: Option<f64>,
    /// Accelerometer spread over the recent window
    pub activity_level: Option<f64>,
    /// Skin temperature (celsius)
    pub temperature: Option<f64>,
    /// Wall-clock UNIX seconds of the last recompute
    pub timestamp: f64,
    pub packets_received: u64,
    pub successful_parses: u64,
    pub last_update: String,
    pub connection_status: ConnectionStatus,
    /// Samples retained across all channel buffers
    pub raw_sample_count: usize,
}

impl Default for MetricsSnapshot {
    fn default() -> Self {
        Self {
            heart_rate: None,
            hrv_rmssd: None,
            eda_tonic: None,
            activity_level: None,
            temperature: None,
            timestamp: 0.0,
            packets_received: 0,
            successful_parses: 0,
            last_update: "No sensor data received".to_string(),
            connection_status: ConnectionStatus::Disconnected,
            raw_sample_count: 0,
        }
    }
}

impl MetricsSnapshot {
    /// Check if any metric is currently present
    pub fn has_metrics(&self) -> bool {
        self.heart_rate.is_some()
            || self.hrv_rmssd.is_some()
            || self.eda_tonic.is_some()
            || self.activity_level.is_some()
            || self.temperature.is_some()
    }

    /// Drop every metric, keeping bookkeeping fields
    pub fn clear_metrics(&mut self) {
        self.heart_rate = None;
        self.hrv_rmssd = None;
        self.eda_tonic = None;
        self.activity_level = None;
        self.temperature = None;
    }
}

/// Datagram counters maintained by the ingest path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseStats {
    pub packets_received: u64,
    pub successful_parses: u64,
}

impl ParseStats {
    /// Percentage of received datagrams that decoded successfully
    pub fn parse_rate(&self) -> f64 {
        self.successful_parses as f64 / self.packets_received.max(1) as f64 * 100.0
    }
}

/// Parse statistics as exposed in the status record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsingStats {
    pub packets_received: u64,
    pub successful_parses: u64,
    pub parse_rate: f64,
}

impl From<ParseStats> for ParsingStats {
    fn from(stats: ParseStats) -> Self {
        Self {
            packets_received: stats.packets_received,
            successful_parses: stats.successful_parses,
            parse_rate: stats.parse_rate(),
        }
    }
}

/// Bridge producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Point-in-time view handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeStatus {
    /// Record kind, always "sensor_data"
    #[serde(rename = "type")]
    pub kind: String,
    pub data: MetricsSnapshot,
    /// Wall-clock UNIX seconds when the view was assembled
    pub timestamp: f64,
    pub real_data_only: bool,
    pub parsing_stats: ParsingStats,
    /// Retained sample count per channel, keyed by wire name
    pub channel_counts: BTreeMap<String, usize>,
    pub producer: BridgeProducer,
}
