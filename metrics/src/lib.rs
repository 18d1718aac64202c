//! Per-class classification metrics for epoch-wise training.
//!
//! Counts are collected batch by batch in a [`ClassCounts`], turned into an
//! [`EpochMetrics`] once a phase ends, and appended to a [`History`].

mod counts;
mod epoch;
mod error;
mod history;

pub use counts::ClassCounts;
pub use epoch::EpochMetrics;
pub use error::{Error, Result};
pub use history::History;

/// Rounds to two decimal places (half away from zero).
///
/// Every reported metric goes through this, so comparisons between epochs
/// operate on the same precision that is logged.
#[inline]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Unweighted mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}
