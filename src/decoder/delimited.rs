//! Delimited-fields decoder
//!
//! Recognizes comma-separated lines whose second field names a channel, e.g.
//! `12345,PPG_INFRARED,1021.5,1022.0`.

use super::scan::within_sensor_range;
use super::{ChannelValue, DecodeStrategy, Decoded, PayloadDecoder};
use crate::types::Channel;

/// Minimum fields on a qualifying line: leading field, channel name, one value
const MIN_FIELDS: usize = 3;

/// Comma-delimited line decoder
pub struct DelimitedDecoder;

impl PayloadDecoder for DelimitedDecoder {
    fn strategy(&self) -> DecodeStrategy {
        DecodeStrategy::Delimited
    }

    fn decode(&self, payload: &str) -> Option<Decoded> {
        payload.trim().lines().find_map(decode_line)
    }
}

/// First qualifying line with at least one plausible value wins
fn decode_line(line: &str) -> Option<Decoded> {
    if !line.contains(',') {
        return None;
    }
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < MIN_FIELDS {
        return None;
    }
    let channel = Channel::from_name(fields[1].trim())?;

    let values: Vec<f64> = fields[2..]
        .iter()
        .filter_map(|f| f.trim().parse::<f64>().ok())
        .filter(|v| within_sensor_range(*v))
        .collect();
    let first = *values.first()?;

    Some(Decoded {
        strategy: DecodeStrategy::Delimited,
        writes: values
            .into_iter()
            .map(|v| ChannelValue::new(channel, v))
            .collect(),
        summary: format!("CSV: {} = {:.3}", channel, first),
    })
}
