//! Heuristic numeric decoder
//!
//! Last resort for payloads that carry no channel name at all. Numbers are
//! assigned to channels purely by magnitude, which is a guess: a 30.0 could be a
//! temperature or an accelerometer reading, and this decoder will always call it
//! a temperature. Treat its output as best-effort, never as authoritative.

use super::scan::{self, is_sentinel};
use super::{ChannelValue, DecodeStrategy, Decoded, PayloadDecoder};
use crate::types::Channel;
use std::ops::RangeInclusive;

/// Values considered at all
const PLAUSIBLE: RangeInclusive<f64> = -1000.0..=10000.0;

/// Maximum values classified from a single payload
pub const MAX_HEURISTIC_VALUES: usize = 6;

/// Minimum numbers needed before the payload is treated as a reading
const MIN_VALUES: usize = 2;

const PPG_BAND: RangeInclusive<f64> = 500.0..=5000.0;
const EDA_BAND: RangeInclusive<f64> = 0.0..=10.0;
const TEMPERATURE_BAND: RangeInclusive<f64> = 20.0..=50.0;
const ACCELEROMETER_BAND: RangeInclusive<f64> = -50.0..=50.0;

/// Magnitude-band classifier for unlabeled numbers
pub struct HeuristicDecoder;

impl PayloadDecoder for HeuristicDecoder {
    fn strategy(&self) -> DecodeStrategy {
        DecodeStrategy::Heuristic
    }

    fn decode(&self, payload: &str) -> Option<Decoded> {
        let numbers = scan::multi_digit_numbers(payload);
        if numbers.len() < MIN_VALUES {
            return None;
        }

        let values: Vec<f64> = numbers
            .into_iter()
            .filter(|v| PLAUSIBLE.contains(v) && !is_sentinel(*v))
            .collect();
        if values.len() < MIN_VALUES {
            return None;
        }

        // Values outside every band are dropped without failing the decode
        let writes = values
            .iter()
            .take(MAX_HEURISTIC_VALUES)
            .enumerate()
            .filter_map(|(position, value)| {
                classify(position, *value).map(|channel| ChannelValue::new(channel, *value))
            })
            .collect();

        Some(Decoded {
            strategy: DecodeStrategy::Heuristic,
            writes,
            summary: format!("Numeric: {} values parsed", values.len()),
        })
    }
}

/// Map a value to a channel by magnitude band, checked in priority order
fn classify(position: usize, value: f64) -> Option<Channel> {
    if PPG_BAND.contains(&value) {
        Some(Channel::PpgInfrared)
    } else if EDA_BAND.contains(&value) {
        Some(Channel::Eda)
    } else if TEMPERATURE_BAND.contains(&value) {
        Some(Channel::Temperature0)
    } else if ACCELEROMETER_BAND.contains(&value) {
        Some(Channel::ACCELEROMETER[position % 3])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_band_classification() {
        let decoded = HeuristicDecoder
            .decode("1024.5 2.35 36.6 -12.25 150.0 15.5")
            .unwrap();

        assert_eq!(
            decoded.writes,
            vec![
                ChannelValue::new(Channel::PpgInfrared, 1024.5),
                ChannelValue::new(Channel::Eda, 2.35),
                ChannelValue::new(Channel::Temperature0, 36.6),
                // position 3 -> X
                ChannelValue::new(Channel::AccelerometerX, -12.25),
                // 150.0 falls in no band
                // position 5 -> Z
                ChannelValue::new(Channel::AccelerometerZ, 15.5),
            ]
        );
        assert_eq!(decoded.summary, "Numeric: 6 values parsed");
    }

    #[test]
    fn test_only_first_six_values_classified() {
        let decoded = HeuristicDecoder
            .decode("1.5 2.5 3.5 4.5 5.5 6.5 7.5 8.5")
            .unwrap();
        assert_eq!(decoded.writes.len(), 6);
        assert!(decoded.writes.iter().all(|w| w.channel == Channel::Eda));
        assert_eq!(decoded.summary, "Numeric: 8 values parsed");
    }

    #[test]
    fn test_sentinel_and_out_of_range_excluded() {
        let decoded = HeuristicDecoder
            .decode("3000 -5000 25000 900 11.5")
            .unwrap();
        assert_eq!(
            decoded.writes,
            vec![
                ChannelValue::new(Channel::PpgInfrared, 900.0),
                ChannelValue::new(Channel::AccelerometerY, 11.5),
            ]
        );
    }

    #[test]
    fn test_success_even_when_nothing_classified() {
        let decoded = HeuristicDecoder.decode("150.0 -200.0").unwrap();
        assert!(decoded.writes.is_empty());
    }

    #[test]
    fn test_needs_two_values() {
        assert!(HeuristicDecoder.decode("only 42.0 here").is_none());
        // single digits are not picked up at all
        assert!(HeuristicDecoder.decode("1 2 3 4").is_none());
        assert!(HeuristicDecoder.decode("3000 3000 42").is_none());
    }
}
