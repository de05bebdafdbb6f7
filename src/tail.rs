//! Tail-deviation aggregation (D2..D5)
//!
//! Stage one: for every pair, `D_i = percentile(order_i) - median` at four
//! increasingly extreme orders. Stage two: pool each label's deviations over
//! all pairs and summarize them (mean, median, std dev, max, min).
//!
//! The result describes how far tails stray from the median per communication
//! pair, and how that straying is distributed across pairs, independently of
//! each pair's absolute latency.

use crate::error::Result;
use crate::latency::{LatencySamples, PairKey};
use crate::percentile::{SortedSamples, SummaryStats};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Labels of the four tail deviations, by increasing order
pub const TAIL_LABELS: [&str; 4] = ["D2", "D3", "D4", "D5"];

/// Percentile orders behind D2..D5
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TailOrders([f64; 4]);

impl Default for TailOrders {
    fn default() -> Self {
        Self([99.0, 99.9, 99.99, 99.999])
    }
}

impl TailOrders {
    pub fn new(orders: [f64; 4]) -> std::result::Result<Self, String> {
        let orders = Self(orders);
        orders.validate()?;
        Ok(orders)
    }

    pub fn orders(&self) -> [f64; 4] {
        self.0
    }

    /// Orders must lie in (0, 100] and increase strictly
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(bad) = self.0.iter().find(|o| !(**o > 0.0 && **o <= 100.0)) {
            return Err(format!("tail order must be within (0, 100], got {}", bad));
        }
        if self.0.windows(2).any(|w| w[0] >= w[1]) {
            return Err(format!(
                "tail orders must be strictly increasing, got {:?}",
                self.0
            ));
        }
        Ok(())
    }

    /// `(label, order)` pairs
    pub fn labeled(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        TAIL_LABELS.iter().copied().zip(self.0.iter().copied())
    }
}

impl FromStr for TailOrders {
    type Err = String;

    /// Parse `"99,99.9,99.99,99.999"`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parsed: Vec<f64> = s
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<f64>()
                    .map_err(|e| format!("invalid tail order {:?}: {}", part.trim(), e))
            })
            .collect::<std::result::Result<_, _>>()?;

        let orders: [f64; 4] = parsed
            .try_into()
            .map_err(|v: Vec<f64>| format!("expected 4 tail orders, got {}", v.len()))?;
        Self::new(orders)
    }
}

/// Median and D2..D5 of one pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TailDeviations {
    pub median: f64,
    pub d2: f64,
    pub d3: f64,
    pub d4: f64,
    pub d5: f64,
    pub samples: usize,
}

impl TailDeviations {
    /// Deviations in label order
    pub fn values(&self) -> [f64; 4] {
        [self.d2, self.d3, self.d4, self.d5]
    }
}

/// Compute the median and tail deviations of one sample set
pub fn tail_deviations(samples: &[f64], orders: &TailOrders) -> Result<TailDeviations> {
    let sorted = SortedSamples::new(samples)?;
    let median = sorted.median();
    let [o2, o3, o4, o5] = orders.orders();

    Ok(TailDeviations {
        median,
        d2: sorted.percentile(o2)? - median,
        d3: sorted.percentile(o3)? - median,
        d4: sorted.percentile(o4)? - median,
        d5: sorted.percentile(o5)? - median,
        samples: sorted.len(),
    })
}

/// Tail deviations of every pair
pub fn pair_deviations(
    samples: &LatencySamples,
    orders: &TailOrders,
) -> Result<BTreeMap<PairKey, TailDeviations>> {
    samples
        .iter()
        .map(|(pair, values)| Ok((pair.clone(), tail_deviations(values, orders)?)))
        .collect()
}

/// Cross-pair summary of each deviation label
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TailAggregate {
    /// Number of pairs pooled
    pub pairs: usize,
    /// Label (D2..D5) → summary of that label's deviations over all pairs
    pub by_label: BTreeMap<String, SummaryStats>,
}

impl TailAggregate {
    pub fn get(&self, label: &str) -> Option<&SummaryStats> {
        self.by_label.get(label)
    }

    pub fn is_empty(&self) -> bool {
        self.by_label.is_empty()
    }
}

/// Pool deviations per label across all pairs and summarize them
///
/// With no pairs the aggregate is empty rather than an error: a group whose
/// archives never correlated a single event simply has nothing to report.
pub fn aggregate_deviations(per_pair: &BTreeMap<PairKey, TailDeviations>) -> Result<TailAggregate> {
    if per_pair.is_empty() {
        return Ok(TailAggregate::default());
    }

    let mut by_label = BTreeMap::new();
    for (index, label) in TAIL_LABELS.iter().enumerate() {
        let pooled: Vec<f64> = per_pair.values().map(|d| d.values()[index]).collect();
        by_label.insert(label.to_string(), SummaryStats::compute(&pooled)?);
    }

    Ok(TailAggregate {
        pairs: per_pair.len(),
        by_label,
    })
}

/// Both stages for one pooled sample set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TailAnalysis {
    pub pairs: BTreeMap<PairKey, TailDeviations>,
    pub aggregate: TailAggregate,
}

pub fn analyze_tails(samples: &LatencySamples, orders: &TailOrders) -> Result<TailAnalysis> {
    let pairs = pair_deviations(samples, orders)?;
    let aggregate = aggregate_deviations(&pairs)?;
    Ok(TailAnalysis { pairs, aggregate })
}
