//! Channel buffer store
//!
//! Bounded, per-channel sample history. Each channel is a ring buffer: appends
//! are O(1) and evict the oldest sample once capacity is reached.

use crate::types::{Channel, Sample};
use std::collections::{BTreeMap, VecDeque};

/// Default per-channel capacity
pub const DEFAULT_BUFFER_CAPACITY: usize = 200;

/// Fixed set of channel ring buffers
#[derive(Debug, Clone)]
pub struct ChannelStore {
    channels: Vec<VecDeque<Sample>>,
    capacity: usize,
}

impl Default for ChannelStore {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_CAPACITY)
    }
}

impl ChannelStore {
    /// Create a store holding up to `capacity` samples per channel
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Channel::ALL
                .iter()
                .map(|_| VecDeque::with_capacity(capacity))
                .collect(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a sample, evicting the oldest one on overflow
    pub fn append(&mut self, channel: Channel, sample: Sample) {
        if self.capacity == 0 {
            return;
        }
        let buffer = &mut self.channels[channel.index()];
        if buffer.len() == self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(sample);
    }

    /// Last `min(n, len)` samples in arrival order
    pub fn recent(&self, channel: Channel, n: usize) -> Vec<Sample> {
        let buffer = &self.channels[channel.index()];
        let skip = buffer.len().saturating_sub(n);
        buffer.iter().skip(skip).copied().collect()
    }

    /// Values of the last `min(n, len)` samples in arrival order
    pub fn recent_values(&self, channel: Channel, n: usize) -> Vec<f64> {
        self.recent(channel, n).iter().map(|s| s.value).collect()
    }

    pub fn len(&self, channel: Channel) -> usize {
        self.channels[channel.index()].len()
    }

    pub fn is_empty(&self, channel: Channel) -> bool {
        self.channels[channel.index()].is_empty()
    }

    /// Samples retained across every channel
    pub fn total_len(&self) -> usize {
        self.channels.iter().map(VecDeque::len).sum()
    }

    /// Per-channel sample counts keyed by wire name
    pub fn counts(&self) -> BTreeMap<String, usize> {
        Channel::ALL
            .iter()
            .map(|c| (c.as_str().to_string(), self.len(*c)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_evicts_oldest() {
        let mut store = ChannelStore::new(200);
        let n = 537;
        for i in 1..=n {
            store.append(Channel::Eda, Sample::new(i as f64, i as f64));
        }

        assert_eq!(store.len(Channel::Eda), 200);
        let all = store.recent(Channel::Eda, 200);
        // Oldest retained is the (N-199)th inserted
        assert_eq!(all[0].value, (n - 199) as f64);
        assert_eq!(all[199].value, n as f64);
    }

    #[test]
    fn test_recent_returns_tail_in_order() {
        let mut store = ChannelStore::new(10);
        for i in 0..5 {
            store.append(Channel::PpgRed, Sample::new(i as f64 * 0.1, i as f64));
        }

        assert_eq!(store.recent_values(Channel::PpgRed, 3), vec![2.0, 3.0, 4.0]);
        // Asking for more than available returns everything
        assert_eq!(store.recent(Channel::PpgRed, 50).len(), 5);
        // Reading does not consume
        assert_eq!(store.len(Channel::PpgRed), 5);
    }

    #[test]
    fn test_channels_are_independent() {
        let mut store = ChannelStore::new(4);
        store.append(Channel::AccelerometerX, Sample::new(0.0, 1.0));
        store.append(Channel::AccelerometerX, Sample::new(0.0, 2.0));
        store.append(Channel::GyroscopeZ, Sample::new(0.0, 3.0));

        assert_eq!(store.len(Channel::AccelerometerX), 2);
        assert_eq!(store.len(Channel::GyroscopeZ), 1);
        assert!(store.is_empty(Channel::Eda));
        assert_eq!(store.total_len(), 3);
    }

    #[test]
    fn test_counts_cover_every_channel() {
        let mut store = ChannelStore::default();
        store.append(Channel::Temperature0, Sample::new(0.0, 33.0));

        let counts = store.counts();
        assert_eq!(counts.len(), Channel::ALL.len());
        assert_eq!(counts["TEMPERATURE_0"], 1);
        assert_eq!(counts["PPG_INFRARED"], 0);
    }
}
