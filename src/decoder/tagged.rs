//! Tagged-type decoder
//!
//! Recognizes payloads carrying a `<type>NAME</type>` marker. The channel comes
//! from the marker; the values are every plausible number anywhere in the
//! payload.

use once_cell::sync::Lazy;
use regex::Regex;

use super::scan::{self, is_sentinel, within_sensor_range};
use super::{ChannelValue, DecodeStrategy, Decoded, PayloadDecoder};
use crate::types::Channel;

/// Maximum values taken from a single tagged payload
pub const MAX_TAGGED_VALUES: usize = 5;

static TYPE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<type>(.*?)</type>").expect("valid type tag pattern"));

/// `<type>NAME</type>` payload decoder
pub struct TaggedDecoder;

impl PayloadDecoder for TaggedDecoder {
    fn strategy(&self) -> DecodeStrategy {
        DecodeStrategy::Tagged
    }

    fn decode(&self, payload: &str) -> Option<Decoded> {
        let name = TYPE_TAG.captures(payload)?.get(1)?.as_str().trim();
        let channel = Channel::from_name(name)?;

        let values: Vec<f64> = scan::numbers(payload)
            .into_iter()
            .filter(|v| within_sensor_range(*v) && !is_sentinel(*v))
            .collect();
        let first = *values.first()?;

        Some(Decoded {
            strategy: DecodeStrategy::Tagged,
            writes: values
                .iter()
                .take(MAX_TAGGED_VALUES)
                .map(|v| ChannelValue::new(channel, *v))
                .collect(),
            summary: format!("XML: {} = {:.3} ({} values)", channel, first, values.len()),
        })
    }
}
