//! Error taxonomy for archive analysis
//!
//! Archive and decode failures are scoped: an `Archive` error is fatal for one
//! archive only, a `Decode` error for one entry only. Directory-level callers
//! record them and keep going.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the analysis engine
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Failed to open archive {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Failed to decode entry {entry}: {reason}")]
    Decode { entry: String, reason: String },

    #[error("Cannot compute a statistic over an empty sample set")]
    EmptySample,

    #[error("Percentile order must be within [0, 100], got {0}")]
    InvalidPercentile(f64),

    #[error("Invalid entry pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, AnalysisError>;
