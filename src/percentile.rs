//! Percentile engine and summary statistics
//!
//! Percentiles use linear interpolation between order statistics: for `n`
//! sorted samples the order `p` sits at rank `p / 100 * (n - 1)` and the value
//! is interpolated between the two neighbouring samples. This is the common
//! default definition (numpy's `linear`, R-7).
//!
//! Every function refuses empty input with [`AnalysisError::EmptySample`];
//! nothing here invents a value for a missing distribution.

use crate::error::{AnalysisError, Result};
use crate::latency::{LatencySamples, PairKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Samples sorted once, queried for many orders
#[derive(Debug, Clone)]
pub struct SortedSamples {
    sorted: Vec<f64>,
}

impl SortedSamples {
    /// Sort a copy of `samples`
    pub fn new(samples: &[f64]) -> Result<Self> {
        if samples.is_empty() {
            return Err(AnalysisError::EmptySample);
        }
        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);
        Ok(Self { sorted })
    }

    /// Percentile of order `order` in `[0, 100]`
    pub fn percentile(&self, order: f64) -> Result<f64> {
        validate_order(order)?;

        let sorted = &self.sorted;
        if sorted.len() == 1 {
            return Ok(sorted[0]);
        }

        let rank = (order / 100.0) * (sorted.len() - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = rank.ceil() as usize;

        if lower == upper {
            Ok(sorted[lower])
        } else {
            let weight = rank - lower as f64;
            Ok(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
        }
    }

    pub fn median(&self) -> f64 {
        // 50 is always a valid order
        self.percentile(50.0).unwrap_or(f64::NAN)
    }

    pub fn min(&self) -> f64 {
        self.sorted[0]
    }

    pub fn max(&self) -> f64 {
        self.sorted[self.sorted.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.sorted
    }
}

fn validate_order(order: f64) -> Result<()> {
    if (0.0..=100.0).contains(&order) {
        Ok(())
    } else {
        Err(AnalysisError::InvalidPercentile(order))
    }
}

/// Percentile of `samples` at `order` (0-100), independent of input order
///
/// # Example
/// ```
/// use tailscope::percentile::percentile;
///
/// assert_eq!(percentile(&[4.0, 1.0, 3.0, 2.0], 50.0).unwrap(), 2.5);
/// assert!(percentile(&[], 50.0).is_err());
/// ```
pub fn percentile(samples: &[f64], order: f64) -> Result<f64> {
    validate_order(order)?;
    SortedSamples::new(samples)?.percentile(order)
}

/// Median, identical to `percentile(samples, 50.0)`
pub fn median(samples: &[f64]) -> Result<f64> {
    percentile(samples, 50.0)
}

pub fn mean(samples: &[f64]) -> Result<f64> {
    if samples.is_empty() {
        return Err(AnalysisError::EmptySample);
    }
    Ok(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Population standard deviation
pub fn std_dev(samples: &[f64]) -> Result<f64> {
    let mean = mean(samples)?;
    let variance =
        samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / samples.len() as f64;
    Ok(variance.sqrt())
}

pub fn min(samples: &[f64]) -> Result<f64> {
    samples
        .iter()
        .copied()
        .min_by(f64::total_cmp)
        .ok_or(AnalysisError::EmptySample)
}

pub fn max(samples: &[f64]) -> Result<f64> {
    samples
        .iter()
        .copied()
        .max_by(f64::total_cmp)
        .ok_or(AnalysisError::EmptySample)
}

/// Mean, median, standard deviation and range of a value set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub max: f64,
    pub min: f64,
}

impl SummaryStats {
    pub fn compute(values: &[f64]) -> Result<Self> {
        let sorted = SortedSamples::new(values)?;
        Ok(Self {
            mean: mean(values)?,
            median: sorted.median(),
            std_dev: std_dev(values)?,
            max: sorted.max(),
            min: sorted.min(),
        })
    }
}

/// Orders reported by [`PercentileProfile`]
pub const PROFILE_ORDERS: [f64; 6] = [50.0, 90.0, 99.0, 99.9, 99.99, 99.999];

/// Per-pair percentile profile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentileProfile {
    pub p50: f64,
    pub p90: f64,
    pub p99: f64,
    pub p99_9: f64,
    pub p99_99: f64,
    pub p99_999: f64,
    pub samples: usize,
}

impl PercentileProfile {
    pub fn compute(samples: &[f64]) -> Result<Self> {
        let sorted = SortedSamples::new(samples)?;
        let [p50, p90, p99, p99_9, p99_99, p99_999] = PROFILE_ORDERS;
        Ok(Self {
            p50: sorted.percentile(p50)?,
            p90: sorted.percentile(p90)?,
            p99: sorted.percentile(p99)?,
            p99_9: sorted.percentile(p99_9)?,
            p99_99: sorted.percentile(p99_99)?,
            p99_999: sorted.percentile(p99_999)?,
            samples: sorted.len(),
        })
    }

    /// `(order, value)` pairs in ascending order
    pub fn values(&self) -> [(f64, f64); 6] {
        [
            (PROFILE_ORDERS[0], self.p50),
            (PROFILE_ORDERS[1], self.p90),
            (PROFILE_ORDERS[2], self.p99),
            (PROFILE_ORDERS[3], self.p99_9),
            (PROFILE_ORDERS[4], self.p99_99),
            (PROFILE_ORDERS[5], self.p99_999),
        ]
    }
}

/// Percentile profile of every pair
pub fn pair_percentiles(samples: &LatencySamples) -> Result<BTreeMap<PairKey, PercentileProfile>> {
    samples
        .iter()
        .map(|(pair, values)| Ok((pair.clone(), PercentileProfile::compute(values)?)))
        .collect()
}
