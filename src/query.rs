//! Status query interface
//!
//! Assembles the read-only view handed to the presentation layer. Each shared
//! structure is copied out under its own lock, one at a time, so readers never
//! hold up the listener or the engine for longer than a copy. The fields of a
//! status record are therefore not guaranteed to be from the same instant.

use crate::context::{unix_timestamp, BridgeContext};
use crate::error::Result;
use crate::types::{BridgeProducer, BridgeStatus, ParsingStats};
use crate::{BRIDGE_VERSION, PRODUCER_NAME};

/// Record kind reported in every status record
pub const STATUS_KIND: &str = "sensor_data";

/// Assemble a status record from the shared context
pub fn status(context: &BridgeContext) -> BridgeStatus {
    let data = context.snapshot().read().clone();
    let parsing_stats = ParsingStats::from(context.parse_stats());
    let channel_counts = context.store().lock().counts();

    BridgeStatus {
        kind: STATUS_KIND.to_string(),
        data,
        timestamp: unix_timestamp(),
        real_data_only: true,
        parsing_stats,
        channel_counts,
        producer: BridgeProducer {
            name: PRODUCER_NAME.to_string(),
            version: BRIDGE_VERSION.to_string(),
            instance_id: context.instance_id().to_string(),
        },
    }
}

impl BridgeStatus {
    /// Serialize to compact JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::engine::MetricEngine;
    use crate::types::{Channel, Sample};
    use std::sync::Arc;

    #[test]
    fn test_empty_status() {
        let context = BridgeContext::new(BridgeConfig::default());
        let status = status(&context);

        assert_eq!(status.kind, "sensor_data");
        assert_eq!(status.parsing_stats.parse_rate, 0.0);
        assert_eq!(status.channel_counts.len(), Channel::ALL.len());
        assert!(status.channel_counts.values().all(|c| *c == 0));
        assert_eq!(status.producer.name, PRODUCER_NAME);
    }

    #[test]
    fn test_parse_rate() {
        let context = BridgeContext::new(BridgeConfig::default());
        {
            let mut ingest = context.ingest().lock();
            ingest.stats.packets_received = 50;
            ingest.stats.successful_parses = 20;
        }
        let status = status(&context);
        assert!((status.parsing_stats.parse_rate - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_json_field_contract() {
        let context = Arc::new(BridgeContext::new(BridgeConfig::default()));
        {
            let mut store = context.store().lock();
            for i in 0..8 {
                store.append(Channel::Temperature0, Sample::new(i as f64, 34.0));
            }
        }
        {
            let mut ingest = context.ingest().lock();
            ingest.stats.packets_received = 8;
            ingest.stats.successful_parses = 8;
            ingest.last_update = Some("Structured: TEMPERATURE_0 = 34.000".to_string());
        }
        MetricEngine::new(context.clone()).recompute();

        let json = status(&context).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["type"], "sensor_data");
        assert_eq!(value["real_data_only"], true);
        assert_eq!(value["data"]["temperature"], 34.0);
        assert!(value["data"]["heart_rate"].is_null());
        assert!(value["data"]["hrv_rmssd"].is_null());
        assert!(value["data"]["eda_tonic"].is_null());
        assert!(value["data"]["activity_level"].is_null());
        assert_eq!(value["data"]["packets_received"], 8);
        assert_eq!(value["data"]["successful_parses"], 8);
        assert_eq!(value["data"]["connection_status"], "disconnected");
        assert_eq!(value["data"]["raw_sample_count"], 8);
        assert_eq!(
            value["data"]["last_update"],
            "Structured: TEMPERATURE_0 = 34.000"
        );
        assert_eq!(value["parsing_stats"]["parse_rate"], 100.0);
        assert_eq!(value["channel_counts"]["TEMPERATURE_0"], 8);
        assert!(value["data"]["timestamp"].as_f64().unwrap() > 0.0);
        assert!(value["producer"]["instance_id"].is_string());
    }
}
