//! Decoder chain
//!
//! The wearable's wire format is not contractually fixed, so each datagram is run
//! through an ordered list of parsing strategies. The first strategy that
//! recognizes the payload wins and the rest are skipped; there is no attempt to
//! pick the "best" interpretation.
//!
//! Default order:
//! 1. [`TaggedDecoder`] - `<type>NAME</type>` marker plus loose numbers
//! 2. [`DelimitedDecoder`] - `timestamp,NAME,v1,v2,...` lines
//! 3. [`HeuristicDecoder`] - unnamed numbers classified by magnitude (lossy)
//! 4. [`KeyValueDecoder`] - `NAME: value` / `NAME=value`
//!
//! Strategies are total: malformed input is simply a non-match.

mod delimited;
mod heuristic;
mod keyvalue;
pub mod scan;
mod tagged;

pub use delimited::DelimitedDecoder;
pub use heuristic::HeuristicDecoder;
pub use keyvalue::KeyValueDecoder;
pub use tagged::TaggedDecoder;

use crate::buffer::ChannelStore;
use crate::types::{Channel, Sample};
use serde::{Deserialize, Serialize};

/// Identifies which strategy recognized a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeStrategy {
    Tagged,
    Delimited,
    Heuristic,
    KeyValue,
}

impl DecodeStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecodeStrategy::Tagged => "tagged",
            DecodeStrategy::Delimited => "delimited",
            DecodeStrategy::Heuristic => "heuristic",
            DecodeStrategy::KeyValue => "key_value",
        }
    }
}

/// A single value destined for a channel buffer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelValue {
    pub channel: Channel,
    pub value: f64,
}

impl ChannelValue {
    pub fn new(channel: Channel, value: f64) -> Self {
        Self { channel, value }
    }
}

/// Result of a successful decode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decoded {
    pub strategy: DecodeStrategy,
    /// Writes in payload order; may be empty for the heuristic strategy
    pub writes: Vec<ChannelValue>,
    /// Human-readable description, surfaced as `last_update`
    pub summary: String,
}

impl Decoded {
    /// Append every write to the store, stamped with the arrival time
    pub fn apply(&self, timestamp: f64, store: &mut ChannelStore) {
        for write in &self.writes {
            store.append(write.channel, Sample::new(timestamp, write.value));
        }
    }
}

/// Trait for payload decoding strategies
pub trait PayloadDecoder: Send + Sync {
    fn strategy(&self) -> DecodeStrategy;

    /// Attempt to decode the payload; `None` means "not my format"
    fn decode(&self, payload: &str) -> Option<Decoded>;
}

/// Ordered, first-match-wins collection of decoders
pub struct DecoderChain {
    decoders: Vec<Box<dyn PayloadDecoder>>,
}

impl Default for DecoderChain {
    fn default() -> Self {
        Self::standard()
    }
}

impl DecoderChain {
    /// The standard tagged → delimited → heuristic → key-value chain
    pub fn standard() -> Self {
        Self::with_decoders(vec![
            Box::new(TaggedDecoder),
            Box::new(DelimitedDecoder),
            Box::new(HeuristicDecoder),
            Box::new(KeyValueDecoder),
        ])
    }

    /// Build a chain from an explicit priority list
    pub fn with_decoders(decoders: Vec<Box<dyn PayloadDecoder>>) -> Self {
        Self { decoders }
    }

    /// Strategies in the order they are tried
    pub fn strategies(&self) -> Vec<DecodeStrategy> {
        self.decoders.iter().map(|d| d.strategy()).collect()
    }

    /// Run the payload through each strategy until one succeeds
    pub fn decode(&self, payload: &str) -> Option<Decoded> {
        self.decoders.iter().find_map(|d| d.decode(payload))
    }

    /// Decode and write the result into `store`
    pub fn ingest(&self, payload: &str, timestamp: f64, store: &mut ChannelStore) -> Option<Decoded> {
        let decoded = self.decode(payload)?;
        decoded.apply(timestamp, store);
        Some(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_order() {
        let chain = DecoderChain::default();
        assert_eq!(
            chain.strategies(),
            vec![
                DecodeStrategy::Tagged,
                DecodeStrategy::Delimited,
                DecodeStrategy::Heuristic,
                DecodeStrategy::KeyValue,
            ]
        );
    }

    #[test]
    fn test_delimited_beats_key_value() {
        // Matches both the CSV pattern (EDA -> 4.5) and the key-value pattern (EDA -> 1.25)
        let payload = "17,EDA,4.5\nEDA: 1.25";
        let chain = DecoderChain::standard();

        let decoded = chain.decode(payload).unwrap();
        assert_eq!(decoded.strategy, DecodeStrategy::Delimited);
        assert_eq!(decoded.writes, vec![ChannelValue::new(Channel::Eda, 4.5)]);

        // On its own, the key-value strategy would have read the other value
        let kv = KeyValueDecoder.decode(payload).unwrap();
        assert_eq!(kv.writes, vec![ChannelValue::new(Channel::Eda, 1.25)]);
    }

    #[test]
    fn test_tagged_short_circuits() {
        let payload = "<type>EDA</type>\n10,PPG_RED,1500";
        let decoded = DecoderChain::standard().decode(payload).unwrap();
        assert_eq!(decoded.strategy, DecodeStrategy::Tagged);
        assert!(decoded.writes.iter().all(|w| w.channel == Channel::Eda));
    }

    #[test]
    fn test_falls_through_to_key_value() {
        let decoded = DecoderChain::standard().decode("temperature_0 = 33.5").unwrap();
        assert_eq!(decoded.strategy, DecodeStrategy::KeyValue);
        assert_eq!(
            decoded.writes,
            vec![ChannelValue::new(Channel::Temperature0, 33.5)]
        );
        assert_eq!(decoded.summary, "Structured: TEMPERATURE_0 = 33.500");
    }

    #[test]
    fn test_no_match() {
        let chain = DecoderChain::standard();
        assert!(chain.decode("").is_none());
        assert!(chain.decode("hello there").is_none());
        assert!(chain.decode("\u{fffd}\u{fffd}<type>").is_none());
    }

    #[test]
    fn test_ingest_writes_into_store() {
        let mut store = ChannelStore::new(10);
        let chain = DecoderChain::standard();

        let decoded = chain.ingest("1,PPG_GREEN,900,901,902", 4.0, &mut store).unwrap();
        assert_eq!(decoded.writes.len(), 3);
        assert_eq!(store.len(Channel::PpgGreen), 3);
        assert_eq!(store.recent(Channel::PpgGreen, 1)[0], Sample::new(4.0, 902.0));

        assert!(chain.ingest("garbage", 5.0, &mut store).is_none());
        assert_eq!(store.total_len(), 3);
    }

    #[test]
    fn test_custom_chain_order() {
        let chain = DecoderChain::with_decoders(vec![
            Box::new(KeyValueDecoder),
            Box::new(DelimitedDecoder),
        ]);
        let decoded = chain.decode("17,EDA,4.5\nEDA: 1.25").unwrap();
        assert_eq!(decoded.strategy, DecodeStrategy::KeyValue);
    }
}
