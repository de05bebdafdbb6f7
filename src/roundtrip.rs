//! Same-process round-trip summary
//!
//! Some deployments publish and read back their own messages, recording both
//! timestamps in one field set of one entry. No cross-entry correlation is
//! needed: each such field set contributes `subscribe - publish` directly.

use crate::correlate::CorrelationMarkers;
use crate::error::Result;
use crate::extract::FieldSet;
use crate::percentile::SortedSamples;
use serde::{Deserialize, Serialize};

/// Round-trip latencies of the field sets holding both markers
pub fn round_trip_latencies(field_sets: &[FieldSet], markers: &CorrelationMarkers) -> Vec<f64> {
    field_sets
        .iter()
        .filter_map(|set| {
            let number = |name: &str| {
                set.fields
                    .iter()
                    .find(|(field, _)| field == name)
                    .and_then(|(_, value)| value.as_number())
            };
            Some(number(markers.consume.as_str())? - number(markers.publish.as_str())?)
        })
        .collect()
}

/// Distribution summary of round-trip latencies of one archive
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoundTripSummary {
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p99: f64,
    pub p99_9: f64,
    pub p99_99: f64,
    pub p99_999: f64,
    pub samples: usize,
    /// Entries read from the archive
    pub entry_count: usize,
}

impl RoundTripSummary {
    pub fn compute(latencies: &[f64], entry_count: usize) -> Result<Self> {
        let sorted = SortedSamples::new(latencies)?;
        Ok(Self {
            min: sorted.min(),
            max: sorted.max(),
            median: sorted.median(),
            p25: sorted.percentile(25.0)?,
            p50: sorted.percentile(50.0)?,
            p75: sorted.percentile(75.0)?,
            p99: sorted.percentile(99.0)?,
            p99_9: sorted.percentile(99.9)?,
            p99_99: sorted.percentile(99.99)?,
            p99_999: sorted.percentile(99.999)?,
            samples: sorted.len(),
            entry_count,
        })
    }
}
