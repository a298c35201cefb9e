//! Numeric token scanning shared by the decoding strategies

use once_cell::sync::Lazy;
use regex::Regex;

/// Listener port value that leaks into payloads and must never be mistaken
/// for a sensor value.
pub const RESERVED_SENTINEL: f64 = 3000.0;

/// Upper bound on the magnitude of a plausible sensor value
pub const MAX_SENSOR_MAGNITUDE: f64 = 100_000.0;

/// Optional sign, digits, optional point, optional fraction digits
static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-?[0-9]+\.?[0-9]*").expect("valid number pattern"));

/// Like [`NUMBER`] but at least two digits long, so stray single digits in
/// free-form text are ignored
static MULTI_DIGIT_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-?[0-9]+\.?[0-9]+").expect("valid number pattern"));

/// Every numeric substring in the payload, in order of appearance
pub fn numbers(payload: &str) -> Vec<f64> {
    scan(&NUMBER, payload)
}

/// Numeric substrings of at least two digits, in order of appearance
pub fn multi_digit_numbers(payload: &str) -> Vec<f64> {
    scan(&MULTI_DIGIT_NUMBER, payload)
}

fn scan(pattern: &Regex, payload: &str) -> Vec<f64> {
    pattern
        .find_iter(payload)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .collect()
}

/// Magnitude below [`MAX_SENSOR_MAGNITUDE`]; NaN and infinities never pass
pub fn within_sensor_range(value: f64) -> bool {
    value.abs() < MAX_SENSOR_MAGNITUDE
}

pub fn is_sentinel(value: f64) -> bool {
    value == RESERVED_SENTINEL
}
