//! # Statistics Engine
//!
//! Turns merged, sorted samples into per-operation statistics.
//!
//! ## Latency
//!
//! Percentiles are rank based with no interpolation: the value at index
//! `len * p / 100` of the ascending sequence, clamped to the last element.
//! The average is an integer mean with the fraction discarded.
//!
//! ## Throughput
//!
//! Workers start and stop at slightly different wall-clock times, so the
//! ramp-up and ramp-down edges of the combined timestamp sequence are trimmed
//! symmetrically before measuring the window. Throughput is the number of
//! samples left in the window divided by its length in whole seconds, scaled by
//! the batch size of the load generator.
//!
//! All internal values are microseconds; the `*_ms` accessors truncate to
//! milliseconds for display.

use crate::samples::{OperationKind, OperationSamples};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const MICROS_PER_SECOND: i64 = 1_000_000;
const MICROS_PER_MILLI: i64 = 1_000;

/// Reasons a kind's samples cannot produce a throughput figure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatsError {
    #[error("{kind}: trimmed window holds {remaining} timestamps, need at least 2")]
    WindowTooShort {
        kind: OperationKind,
        remaining: usize,
    },

    #[error("{kind}: trimmed window spans {spread_us}us, less than one second")]
    ZeroDurationWindow { kind: OperationKind, spread_us: i64 },

    #[error("{kind}: {per_second} ops/s at batch size {batch_size} overflows u64")]
    ThroughputOverflow {
        kind: OperationKind,
        per_second: u64,
        batch_size: u64,
    },
}

/// Tunables for [`OperationStats::compute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsOptions {
    /// Percentage of timestamps dropped from each end of the window.
    pub trim_percentage: u32,
    /// Underlying requests represented by one logged operation.
    pub batch_size: u64,
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self {
            trim_percentage: crate::defaults::TRIM_PERCENTAGE,
            batch_size: 1,
        }
    }
}

/// Rank-based percentile of an ascending sequence.
///
/// Returns `None` when `sorted` is empty.
pub fn percentile(sorted: &[i64], p: u32) -> Option<i64> {
    if sorted.is_empty() {
        return None;
    }
    let index = sorted.len() * p as usize / 100;
    Some(sorted[index.min(sorted.len() - 1)])
}

/// Truncating integer mean. Returns `None` when `values` is empty.
pub fn average(values: &[i64]) -> Option<i64> {
    if values.is_empty() {
        return None;
    }
    let sum: i128 = values.iter().map(|&v| v as i128).sum();
    Some((sum / values.len() as i128) as i64)
}

/// Drop `len * trim_percentage / 100` elements from both ends of `sorted`.
///
/// Yields an empty slice when the two trims would meet.
pub fn trim_window(sorted: &[i64], trim_percentage: u32) -> &[i64] {
    let cut = sorted.len() * trim_percentage as usize / 100;
    if cut * 2 >= sorted.len() {
        return &sorted[..0];
    }
    &sorted[cut..sorted.len() - cut]
}

/// Share of failed operations, in percent.
///
/// `None` when there were neither failures nor successes.
pub fn error_percentage(errors: u64, successes: usize) -> Option<f64> {
    let total = errors + successes as u64;
    if total == 0 {
        return None;
    }
    Some(100.0 * errors as f64 / total as f64)
}

/// Trimmed window length and the throughput measured over it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowThroughput {
    pub window_secs: u64,
    pub samples_in_window: usize,
    pub ops_per_sec: u64,
}

/// Measure throughput over the trimmed timestamp window of one kind.
pub fn window_throughput(
    kind: OperationKind,
    sorted_timestamps: &[i64],
    options: &StatsOptions,
) -> Result<WindowThroughput, StatsError> {
    let window = trim_window(sorted_timestamps, options.trim_percentage);
    let (first, last) = match window {
        [first, .., last] => (*first, *last),
        _ => {
            return Err(StatsError::WindowTooShort {
                kind,
                remaining: window.len(),
            })
        }
    };

    let spread_us = last - first;
    let window_secs = spread_us / MICROS_PER_SECOND;
    if window_secs <= 0 {
        return Err(StatsError::ZeroDurationWindow { kind, spread_us });
    }
    let window_secs = window_secs as u64;

    let per_second = window.len() as u64 / window_secs;
    let ops_per_sec = per_second.checked_mul(options.batch_size).ok_or(
        StatsError::ThroughputOverflow {
            kind,
            per_second,
            batch_size: options.batch_size,
        },
    )?;

    Ok(WindowThroughput {
        window_secs,
        samples_in_window: window.len(),
        ops_per_sec,
    })
}

/// Statistics of one operation kind over a whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationStats {
    pub kind: OperationKind,
    pub samples: usize,
    pub average_us: i64,
    pub p50_us: i64,
    pub p90_us: i64,
    pub p99_us: i64,
    pub window_secs: u64,
    pub throughput: u64,
    pub errors: u64,
    pub error_percentage: f64,
}

impl OperationStats {
    /// Compute statistics for `samples`, whose sequences must be sorted.
    ///
    /// Returns `Ok(None)` when the kind recorded no successful operation.
    pub fn compute(
        kind: OperationKind,
        samples: &OperationSamples,
        options: &StatsOptions,
    ) -> Result<Option<Self>, StatsError> {
        let latencies = samples.latencies();
        let (Some(average_us), Some(p50_us), Some(p90_us), Some(p99_us)) = (
            average(latencies),
            percentile(latencies, 50),
            percentile(latencies, 90),
            percentile(latencies, 99),
        ) else {
            return Ok(None);
        };

        let window = window_throughput(kind, samples.timestamps(), options)?;
        let error_percentage = error_percentage(samples.errors(), samples.successes())
            .unwrap_or_default();

        Ok(Some(Self {
            kind,
            samples: samples.successes(),
            average_us,
            p50_us,
            p90_us,
            p99_us,
            window_secs: window.window_secs,
            throughput: window.ops_per_sec,
            errors: samples.errors(),
            error_percentage,
        }))
    }

    pub fn average_ms(&self) -> i64 {
        self.average_us / MICROS_PER_MILLI
    }

    pub fn p50_ms(&self) -> i64 {
        self.p50_us / MICROS_PER_MILLI
    }

    pub fn p90_ms(&self) -> i64 {
        self.p90_us / MICROS_PER_MILLI
    }

    pub fn p99_ms(&self) -> i64 {
        self.p99_us / MICROS_PER_MILLI
    }
}
