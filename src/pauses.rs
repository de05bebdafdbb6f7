//! Event-loop pause histogram
//!
//! Pause logs are JSON lists of `{"delta": <ms>, ...}` objects. Deltas at or
//! below 5 ms are under the instrumentation's noise floor and are dropped.
//! Deltas above 1000 ms share one overflow bucket; everything else falls into
//! 100 ms wide buckets anchored at 6 ms (`6-105`, `106-205`, ...).

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Deltas at or below this are discarded
pub const NOISE_FLOOR_MS: f64 = 5.0;
/// Deltas above this land in the overflow bucket
pub const OVERFLOW_MS: f64 = 1000.0;
const BUCKET_ORIGIN: i64 = 6;
const BUCKET_WIDTH: i64 = 100;

/// One histogram interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PauseBucket {
    /// Inclusive millisecond range
    Range { lower: i64, upper: i64 },
    /// Everything above [`OVERFLOW_MS`]
    Overflow,
}

impl PauseBucket {
    /// Bucket for a pause delta, or `None` when it is below the noise floor
    ///
    /// # Example
    /// ```
    /// use tailscope::pauses::PauseBucket;
    ///
    /// assert_eq!(PauseBucket::classify(5.0), None);
    /// assert_eq!(PauseBucket::classify(106.0).unwrap().to_string(), "106-205");
    /// assert_eq!(PauseBucket::classify(1001.0), Some(PauseBucket::Overflow));
    /// ```
    pub fn classify(delta: f64) -> Option<Self> {
        if delta.is_nan() || delta <= NOISE_FLOOR_MS {
            return None;
        }
        if delta > OVERFLOW_MS {
            return Some(Self::Overflow);
        }
        if delta < BUCKET_ORIGIN as f64 {
            return None;
        }

        let index = ((delta - BUCKET_ORIGIN as f64) / BUCKET_WIDTH as f64).floor() as i64;
        let lower = index * BUCKET_WIDTH + BUCKET_ORIGIN;
        Some(Self::Range {
            lower,
            upper: lower + BUCKET_WIDTH - 1,
        })
    }

    fn sort_key(&self) -> (u8, i64) {
        match self {
            Self::Range { lower, .. } => (0, *lower),
            Self::Overflow => (1, 0),
        }
    }
}

impl Ord for PauseBucket {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for PauseBucket {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PauseBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Range { lower, upper } => write!(f, "{}-{}", lower, upper),
            Self::Overflow => write!(f, ">{}", OVERFLOW_MS as i64),
        }
    }
}

/// Bucket label → count; the overflow bucket is always present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PauseHistogram {
    counts: BTreeMap<PauseBucket, u64>,
}

impl Default for PauseHistogram {
    fn default() -> Self {
        Self::new()
    }
}

impl PauseHistogram {
    pub fn new() -> Self {
        let mut counts = BTreeMap::new();
        counts.insert(PauseBucket::Overflow, 0);
        Self { counts }
    }

    /// Count one delta; returns the bucket it landed in
    pub fn record(&mut self, delta: f64) -> Option<PauseBucket> {
        let bucket = PauseBucket::classify(delta)?;
        *self.counts.entry(bucket).or_insert(0) += 1;
        Some(bucket)
    }

    pub fn extend<I: IntoIterator<Item = f64>>(&mut self, deltas: I) {
        for delta in deltas {
            self.record(delta);
        }
    }

    pub fn merge(&mut self, other: &PauseHistogram) {
        for (bucket, count) in &other.counts {
            *self.counts.entry(*bucket).or_insert(0) += count;
        }
    }

    pub fn count(&self, bucket: &PauseBucket) -> u64 {
        self.counts.get(bucket).copied().unwrap_or(0)
    }

    /// Buckets ascending by lower bound, overflow last
    pub fn iter(&self) -> impl Iterator<Item = (&PauseBucket, u64)> {
        self.counts.iter().map(|(b, c)| (b, *c))
    }

    /// Number of counted (non-discarded) deltas
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}

impl Serialize for PauseHistogram {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.counts.len()))?;
        for (bucket, count) in &self.counts {
            map.serialize_entry(&bucket.to_string(), count)?;
        }
        map.end()
    }
}

/// Field carrying the pause duration
pub const DELTA_FIELD: &str = "delta";

/// Numeric `delta` of every item of a pause log
///
/// Items without a numeric delta are skipped. A record that is not a list
/// yields nothing.
pub fn extract_pause_deltas(record: &Value) -> Vec<f64> {
    let Some(items) = record.as_array() else {
        tracing::debug!("Pause record is not a list");
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| item.get(DELTA_FIELD).and_then(Value::as_f64))
        .collect()
}
