//! Utility functions and helpers.

pub mod http;
pub mod log;
pub mod url;

/// Round to two decimals, the precision every point total is kept at.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
