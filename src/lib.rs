//! Tailscope - trace correlation and tail-latency statistics
//!
//! This library reads zip archives of per-process instrumentation traces,
//! correlates producer and consumer events that share a timestamp key, and
//! reports latency percentiles and tail deviations (D2..D5) per
//! producer/consumer pair and across groups of archives. A second pipeline
//! buckets event-loop pause durations into a fixed-width histogram.
//!
//! Pipeline: [`archive`] → [`decode`] → [`extract`] → [`correlate`] →
//! [`latency`] → [`percentile`] / [`tail`], driven per archive by [`scan`] and
//! per directory by [`directory`].

pub mod archive;
pub mod cli;
pub mod config;
pub mod correlate;
pub mod decode;
pub mod directory;
pub mod error;
pub mod extract;
pub mod latency;
pub mod pauses;
pub mod percentile;
pub mod report;
pub mod roundtrip;
pub mod scan;
pub mod snapshot;
pub mod tail;

pub use error::{AnalysisError, Result};
