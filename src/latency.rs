//! Latency derivation from correlated events
//!
//! A latency sample is `consume - publish` for an event carrying both
//! timestamps and both identities. Samples are filed under the ordered
//! (source, destination) pair and pooled across archives before statistics.

use crate::correlate::{CorrelatedEvents, CorrelationMarkers};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Producer/consumer relationship a sample belongs to
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PairKey {
    pub source: String,
    pub destination: String,
}

impl PairKey {
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.destination)
    }
}

/// Latency samples grouped by pair
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatencySamples {
    by_pair: BTreeMap<PairKey, Vec<f64>>,
}

impl LatencySamples {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one sample (duplicates are kept)
    pub fn record(&mut self, pair: PairKey, latency: f64) {
        self.by_pair.entry(pair).or_default().push(latency);
    }

    /// Pool another sample set into this one
    pub fn merge(&mut self, other: LatencySamples) {
        for (pair, samples) in other.by_pair {
            self.by_pair.entry(pair).or_default().extend(samples);
        }
    }

    pub fn get(&self, pair: &PairKey) -> Option<&[f64]> {
        self.by_pair.get(pair).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PairKey, &[f64])> {
        self.by_pair.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Number of pairs
    pub fn len(&self) -> usize {
        self.by_pair.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_pair.is_empty()
    }

    /// Number of samples over all pairs
    pub fn total_samples(&self) -> usize {
        self.by_pair.values().map(Vec::len).sum()
    }
}

/// Derive latency samples from fully correlated events
///
/// Partially correlated events are expected (not every publish is consumed
/// inside the scanned archive set) and are skipped without error.
pub fn derive_latencies(events: &CorrelatedEvents, markers: &CorrelationMarkers) -> LatencySamples {
    let mut samples = LatencySamples::new();
    let mut partial = 0usize;

    for (key, event) in events {
        let (Some(source), Some(destination)) = (&event.source, &event.destination) else {
            partial += 1;
            continue;
        };
        let (Some(published), Some(consumed)) = (
            event.timestamp(&markers.publish),
            event.timestamp(&markers.consume),
        ) else {
            tracing::trace!("Event {} has non-numeric timestamps", key);
            partial += 1;
            continue;
        };

        samples.record(
            PairKey::new(source.as_str(), destination.as_str()),
            consumed - published,
        );
    }

    tracing::debug!(
        "Derived {} latency samples over {} pairs ({} partial events skipped)",
        samples.total_samples(),
        samples.len(),
        partial
    );
    samples
}
