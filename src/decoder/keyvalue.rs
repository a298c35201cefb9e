//! Structured key-value decoder
//!
//! Recognizes `NAME: value`, `NAME=value` or `NAME value` anywhere in the
//! payload, case-insensitively. Only the first channel found contributes, and
//! only one value.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{ChannelValue, DecodeStrategy, Decoded, PayloadDecoder};
use crate::types::Channel;

static PATTERNS: Lazy<Vec<(Channel, Regex)>> = Lazy::new(|| {
    Channel::ALL
        .iter()
        .map(|channel| {
            let pattern = format!(
                r"(?i){}[:\s=]+(-?[0-9]+\.?[0-9]*)",
                regex::escape(channel.as_str())
            );
            (
                *channel,
                Regex::new(&pattern).expect("valid key-value pattern"),
            )
        })
        .collect()
});

/// `NAME: value` decoder
pub struct KeyValueDecoder;

impl PayloadDecoder for KeyValueDecoder {
    fn strategy(&self) -> DecodeStrategy {
        DecodeStrategy::KeyValue
    }

    fn decode(&self, payload: &str) -> Option<Decoded> {
        PATTERNS.iter().find_map(|(channel, pattern)| {
            let value = pattern
                .captures(payload)?
                .get(1)?
                .as_str()
                .parse::<f64>()
                .ok()?;

            Some(Decoded {
                strategy: DecodeStrategy::KeyValue,
                writes: vec![ChannelValue::new(*channel, value)],
                summary: format!("Structured: {} = {:.3}", channel, value),
            })
        })
    }
}
