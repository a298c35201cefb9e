//! Metric derivation
//!
//! This module derives physiological metrics from recent channel windows:
//! - Heart rate from PPG peak detection
//! - Heart rate variability (RMSSD) from the same beat intervals
//! - EDA tonic level
//! - Activity level from accelerometer spread
//! - Skin temperature
//!
//! Each metric is computed independently. A metric whose window is too short or
//! whose result falls outside its plausible range is reported as absent along
//! with the reason; it never affects the other metrics.

use crate::buffer::ChannelStore;
use crate::types::{Channel, Sample};
use std::ops::RangeInclusive;
use thiserror::Error;

/// PPG samples required (exclusive) before heart rate is attempted
pub const HEART_RATE_MIN_SAMPLES: usize = 30;
/// PPG window used for peak detection
pub const HEART_RATE_WINDOW: usize = 50;
/// Peak threshold, in standard deviations above the detrended mean
const PEAK_THRESHOLD_STDEVS: f64 = 0.7;
/// Peaks required before intervals are trusted
const MIN_PEAKS: usize = 3;
/// Accepted heart rate (bpm)
const HEART_RATE_RANGE: RangeInclusive<f64> = 30.0..=200.0;

/// Beat intervals required for RMSSD
const HRV_MIN_INTERVALS: usize = 3;
/// Accepted RMSSD (ms)
const HRV_RANGE: RangeInclusive<f64> = 5.0..=300.0;

pub const EDA_MIN_SAMPLES: usize = 10;
pub const EDA_WINDOW: usize = 20;
const EDA_RANGE: RangeInclusive<f64> = 0.0..=100.0;

pub const ACTIVITY_MIN_SAMPLES: usize = 15;
pub const ACTIVITY_WINDOW: usize = 30;

pub const TEMPERATURE_MIN_SAMPLES: usize = 5;
pub const TEMPERATURE_WINDOW: usize = 10;
/// Accepted temperature (celsius)
const TEMPERATURE_RANGE: RangeInclusive<f64> = 15.0..=60.0;

/// Why a metric was left absent
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricRejection {
    #[error("need more than {required} samples, have {available}")]
    InsufficientSamples { required: usize, available: usize },

    #[error("found {0} peaks, need at least 3")]
    TooFewPeaks(usize),

    #[error("need at least 3 beat intervals, have {0}")]
    TooFewIntervals(usize),

    #[error("non-positive beat interval {0}")]
    NonPositiveInterval(f64),

    #[error("heart rate unavailable")]
    NoHeartRate,

    #[error("value {0} outside plausible range")]
    OutOfRange(f64),
}

/// Windows copied out of the channel store for one recompute cycle
#[derive(Debug, Clone, Default)]
pub struct MetricWindows {
    pub ppg: Vec<Sample>,
    pub eda: Vec<f64>,
    pub accelerometer_x: Vec<f64>,
    pub temperature: Vec<f64>,
}

impl MetricWindows {
    /// Copy the most recent window of every source channel
    pub fn capture(store: &ChannelStore) -> Self {
        Self {
            ppg: store.recent(Channel::PpgInfrared, HEART_RATE_WINDOW),
            eda: store.recent_values(Channel::Eda, EDA_WINDOW),
            accelerometer_x: store.recent_values(Channel::AccelerometerX, ACTIVITY_WINDOW),
            temperature: store.recent_values(Channel::Temperature0, TEMPERATURE_WINDOW),
        }
    }
}

/// Beat detection result backing the heart rate
#[derive(Debug, Clone, PartialEq)]
pub struct BeatAnalysis {
    /// Indices of detected peaks within the window
    pub peaks: Vec<usize>,
    /// Inter-beat intervals (seconds)
    pub intervals: Vec<f64>,
    /// Median inter-beat interval (seconds)
    pub median_interval: f64,
    /// Heart rate before rounding
    pub bpm: f64,
}

/// Metrics derived from a single set of windows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedMetrics {
    pub heart_rate: Option<u32>,
    pub hrv_rmssd: Option<u32>,
    pub eda_tonic: Option<f64>,
    pub activity_level: Option<f64>,
    pub temperature: Option<f64>,
    /// Metrics left absent, with the reason
    pub rejections: Vec<(&'static str, MetricRejection)>,
}

/// Metric deriver for computing the metrics snapshot
pub struct MetricDeriver;

impl MetricDeriver {
    /// Derive every metric from the captured windows
    pub fn derive(windows: &MetricWindows) -> DerivedMetrics {
        let mut rejections = Vec::new();

        let beats = compute_heart_rate(&windows.ppg);
        let hrv = match &beats {
            Ok(analysis) => compute_hrv_rmssd(&analysis.intervals),
            Err(_) => Err(MetricRejection::NoHeartRate),
        };

        let heart_rate = accept(&mut rejections, "heart_rate", beats.map(|b| round(b.bpm)));
        let hrv_rmssd = accept(&mut rejections, "hrv_rmssd", hrv.map(round));
        let eda_tonic = accept(&mut rejections, "eda_tonic", compute_eda_tonic(&windows.eda));
        let activity_level = accept(
            &mut rejections,
            "activity_level",
            compute_activity_level(&windows.accelerometer_x),
        );
        let temperature = accept(
            &mut rejections,
            "temperature",
            compute_temperature(&windows.temperature),
        );

        DerivedMetrics {
            heart_rate,
            hrv_rmssd,
            eda_tonic,
            activity_level,
            temperature,
            rejections,
        }
    }
}

fn accept<T>(
    rejections: &mut Vec<(&'static str, MetricRejection)>,
    metric: &'static str,
    result: Result<T, MetricRejection>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(reason) => {
            rejections.push((metric, reason));
            None
        }
    }
}

fn round(value: f64) -> u32 {
    value.round() as u32
}

fn require_more_than(required: usize, available: usize) -> Result<(), MetricRejection> {
    if available > required {
        Ok(())
    } else {
        Err(MetricRejection::InsufficientSamples {
            required,
            available,
        })
    }
}

fn within(range: &RangeInclusive<f64>, value: f64) -> Result<f64, MetricRejection> {
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(MetricRejection::OutOfRange(value))
    }
}

/// Detect beats in a PPG window and convert the median interval to bpm
pub fn compute_heart_rate(window: &[Sample]) -> Result<BeatAnalysis, MetricRejection> {
    require_more_than(HEART_RATE_MIN_SAMPLES, window.len())?;

    let values: Vec<f64> = window.iter().map(|s| s.value).collect();
    let detrended = detrend(&values);
    let threshold = mean(&detrended) + PEAK_THRESHOLD_STDEVS * population_std(&detrended);
    let peaks = find_peaks(&detrended, threshold);
    if peaks.len() < MIN_PEAKS {
        return Err(MetricRejection::TooFewPeaks(peaks.len()));
    }

    let intervals: Vec<f64> = peaks
        .windows(2)
        .map(|pair| window[pair[1]].timestamp - window[pair[0]].timestamp)
        .collect();
    let median_interval = median(&intervals);
    if median_interval <= 0.0 || !median_interval.is_finite() {
        return Err(MetricRejection::NonPositiveInterval(median_interval));
    }

    let bpm = within(&HEART_RATE_RANGE, 60.0 / median_interval)?;

    Ok(BeatAnalysis {
        peaks,
        intervals,
        median_interval,
        bpm,
    })
}

/// Root mean square of successive interval differences, in milliseconds
pub fn compute_hrv_rmssd(intervals: &[f64]) -> Result<f64, MetricRejection> {
    if intervals.len() < HRV_MIN_INTERVALS {
        return Err(MetricRejection::TooFewIntervals(intervals.len()));
    }
    let squared: Vec<f64> = intervals
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).powi(2))
        .collect();
    within(&HRV_RANGE, mean(&squared).sqrt() * 1000.0)
}

/// Median of the recent EDA window
pub fn compute_eda_tonic(window: &[f64]) -> Result<f64, MetricRejection> {
    require_more_than(EDA_MIN_SAMPLES, window.len())?;
    within(&EDA_RANGE, median(window))
}

/// Spread of the recent accelerometer X window; no plausibility filter
pub fn compute_activity_level(window: &[f64]) -> Result<f64, MetricRejection> {
    require_more_than(ACTIVITY_MIN_SAMPLES, window.len())?;
    Ok(population_std(window))
}

/// Mean of the recent temperature window
pub fn compute_temperature(window: &[f64]) -> Result<f64, MetricRejection> {
    require_more_than(TEMPERATURE_MIN_SAMPLES, window.len())?;
    within(&TEMPERATURE_RANGE, mean(window))
}

/// Subtract the straight line joining the first and last values
fn detrend(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n < 2 {
        return values.to_vec();
    }
    let first = values[0];
    let slope = (values[n - 1] - first) / (n - 1) as f64;
    values
        .iter()
        .enumerate()
        .map(|(i, v)| v - (first + slope * i as f64))
        .collect()
}

/// Indices strictly above both neighbors on each side (two deep) and the threshold
fn find_peaks(values: &[f64], threshold: f64) -> Vec<usize> {
    if values.len() < 5 {
        return Vec::new();
    }
    (2..values.len() - 2)
        .filter(|&i| {
            let v = values[i];
            v > values[i - 1]
                && v > values[i + 1]
                && v > values[i - 2]
                && v > values[i + 2]
                && v > threshold
        })
        .collect()
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Standard deviation with the population (N) denominator
pub(crate) fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Median; the mean of the two middle values for even lengths
pub(crate) fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_PERIOD: f64 = 0.1;

    /// PPG window sampled every 100 ms with +500 peaks at the given indices
    fn ppg_window(len: usize, peaks: &[usize], drift_per_sample: f64) -> Vec<Sample> {
        (0..len)
            .map(|i| {
                let base = 1000.0 + drift_per_sample * i as f64;
                let value = if peaks.contains(&i) { base + 500.0 } else { base };
                Sample::new(i as f64 * SAMPLE_PERIOD, value)
            })
            .collect()
    }

    #[test]
    fn test_heart_rate_from_three_peaks() {
        // 8 samples apart = 0.8 s
        let window = ppg_window(50, &[10, 18, 26], 0.0);
        let analysis = compute_heart_rate(&window).unwrap();

        assert_eq!(analysis.peaks, vec![10, 18, 26]);
        assert!((analysis.median_interval - 0.8).abs() < 1e-9);
        assert_eq!(round(analysis.bpm), 75);

        let windows = MetricWindows {
            ppg: window,
            ..Default::default()
        };
        let derived = MetricDeriver::derive(&windows);
        assert_eq!(derived.heart_rate, Some(75));
        // Two intervals are not enough for RMSSD
        assert_eq!(derived.hrv_rmssd, None);
    }

    #[test]
    fn test_heart_rate_needs_more_than_thirty_samples() {
        let window = ppg_window(30, &[5, 13, 21], 0.0);
        assert_eq!(
            compute_heart_rate(&window),
            Err(MetricRejection::InsufficientSamples {
                required: 30,
                available: 30
            })
        );
        // 31 samples with the same shape is enough
        let window = ppg_window(31, &[5, 13, 21], 0.0);
        assert!(compute_heart_rate(&window).is_ok());
    }

    #[test]
    fn test_sample_minimum_ignores_waveform_shape() {
        // Tall beats every 4th sample would read as 150 bpm given one more sample
        let pulse_train = |len: usize| -> Vec<Sample> {
            (0..len)
                .map(|i| {
                    let value = if i % 4 == 1 { 9000.0 } else { 1000.0 };
                    Sample::new(i as f64 * SAMPLE_PERIOD, value)
                })
                .collect()
        };

        assert_eq!(
            compute_heart_rate(&pulse_train(30)),
            Err(MetricRejection::InsufficientSamples {
                required: 30,
                available: 30
            })
        );
        let analysis = compute_heart_rate(&pulse_train(31)).unwrap();
        assert_eq!(round(analysis.bpm), 150);
    }

    #[test]
    fn test_heart_rate_survives_baseline_drift() {
        let window = ppg_window(50, &[10, 18, 26, 34], 5.0);
        let analysis = compute_heart_rate(&window).unwrap();
        assert_eq!(analysis.peaks, vec![10, 18, 26, 34]);
        assert_eq!(round(analysis.bpm), 75);
    }

    #[test]
    fn test_heart_rate_flat_signal_has_no_peaks() {
        let window = ppg_window(50, &[], 0.0);
        assert_eq!(
            compute_heart_rate(&window),
            Err(MetricRejection::TooFewPeaks(0))
        );
    }

    #[test]
    fn test_heart_rate_out_of_range() {
        // Peaks 2.2 s apart -> ~27 bpm
        let window = ppg_window(50, &[2, 24, 46], 0.0);
        assert!(matches!(
            compute_heart_rate(&window),
            Err(MetricRejection::OutOfRange(_))
        ));
    }

    #[test]
    fn test_heart_rate_rejects_zero_intervals() {
        // Every sample shares one timestamp
        let window: Vec<Sample> = ppg_window(50, &[10, 18, 26], 0.0)
            .into_iter()
            .map(|s| Sample::new(1.0, s.value))
            .collect();
        assert_eq!(
            compute_heart_rate(&window),
            Err(MetricRejection::NonPositiveInterval(0.0))
        );
    }

    #[test]
    fn test_hrv_from_irregular_beats() {
        // Intervals 0.8, 0.9, 0.7, 0.8 s
        let window = ppg_window(50, &[5, 13, 22, 29, 37], 0.0);
        let windows = MetricWindows {
            ppg: window,
            ..Default::default()
        };
        let derived = MetricDeriver::derive(&windows);

        assert_eq!(derived.heart_rate, Some(75));
        // sqrt(mean(0.01, 0.04, 0.01)) * 1000 = 141.4
        assert_eq!(derived.hrv_rmssd, Some(141));
    }

    #[test]
    fn test_hrv_rejects_perfectly_regular_beats() {
        let window = ppg_window(50, &[10, 18, 26, 34], 5.0);
        let windows = MetricWindows {
            ppg: window,
            ..Default::default()
        };
        let derived = MetricDeriver::derive(&windows);

        assert_eq!(derived.heart_rate, Some(75));
        assert_eq!(derived.hrv_rmssd, None);
        assert!(derived
            .rejections
            .iter()
            .any(|(metric, reason)| *metric == "hrv_rmssd"
                && matches!(reason, MetricRejection::OutOfRange(_))));
    }

    #[test]
    fn test_eda_tonic_is_median() {
        let eda = vec![
            2.0, 3.0, 2.5, 3.5, 4.0, 2.0, 3.0, 2.8, 3.1, 2.9, 3.0, 2.7, 3.3, 2.6, 3.2, 2.4, 3.4,
            2.9, 3.0, 2.95,
        ];
        let tonic = compute_eda_tonic(&eda).unwrap();
        assert!((tonic - 2.975).abs() < 1e-9);
        assert_eq!(tonic, median(&eda));
    }

    #[test]
    fn test_eda_tonic_out_of_range() {
        let eda = vec![150.0; 20];
        assert_eq!(
            compute_eda_tonic(&eda),
            Err(MetricRejection::OutOfRange(150.0))
        );
    }

    #[test]
    fn test_eda_tonic_needs_more_than_ten() {
        assert!(compute_eda_tonic(&[1.0; 10]).is_err());
        assert!(compute_eda_tonic(&[1.0; 11]).is_ok());
    }

    #[test]
    fn test_activity_level() {
        let accel: Vec<f64> = (0..30).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        assert!((compute_activity_level(&accel).unwrap() - 1.0).abs() < 1e-9);
        assert!(compute_activity_level(&accel[..15]).is_err());
        // No plausibility filter
        let wild: Vec<f64> = (0..16).map(|i| i as f64 * 1000.0).collect();
        assert!(compute_activity_level(&wild).is_ok());
    }

    #[test]
    fn test_temperature() {
        let temps = vec![33.0, 33.5, 34.0, 34.5, 35.0, 35.5];
        assert!((compute_temperature(&temps).unwrap() - 34.25).abs() < 1e-9);
        assert!(compute_temperature(&temps[..5]).is_err());
        assert!(compute_temperature(&[70.0; 10]).is_err());
    }

    #[test]
    fn test_capture_uses_recent_windows() {
        let mut store = ChannelStore::new(200);
        for i in 0..100 {
            store.append(Channel::Eda, Sample::new(i as f64, i as f64));
            store.append(Channel::PpgInfrared, Sample::new(i as f64, i as f64));
        }
        let windows = MetricWindows::capture(&store);
        assert_eq!(windows.eda.len(), EDA_WINDOW);
        assert_eq!(windows.eda[0], 80.0);
        assert_eq!(windows.ppg.len(), HEART_RATE_WINDOW);
        assert!(windows.temperature.is_empty());
    }

    #[test]
    fn test_empty_windows_derive_nothing() {
        let derived = MetricDeriver::derive(&MetricWindows::default());
        assert_eq!(derived.heart_rate, None);
        assert_eq!(derived.eda_tonic, None);
        assert_eq!(derived.activity_level, None);
        assert_eq!(derived.temperature, None);
        assert_eq!(derived.rejections.len(), 5);
    }

    #[test]
    fn test_stats_helpers() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), 2.0);
        assert!((population_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]) - 2.0).abs() < 1e-12);
        assert_eq!(detrend(&[1.0, 2.0, 3.0]), vec![0.0, 0.0, 0.0]);
    }
}
