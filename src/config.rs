//! Analysis configuration
//!
//! Defaults reproduce the instrumentation conventions the archives were
//! recorded with: `beforePublish` / `afterConsume` markers, per-process
//! `instrumentation.json` entries and `eventLoopPauses.json` pause logs.
//! Everything can be overridden from a TOML file and then from the CLI.

use crate::archive::EntrySelector;
use crate::correlate::{CorrelationMarkers, IdentityScheme};
use crate::tail::TailOrders;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration shared by every analysis pipeline
///
/// # Example
/// ```
/// use tailscope::config::AnalysisConfig;
///
/// let config = AnalysisConfig::from_toml_str("publish_field = \"sent\"").unwrap();
/// assert_eq!(config.publish_field, "sent");
/// assert_eq!(config.consume_field, "afterConsume");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Suffix selecting trace entries inside an archive
    pub entry_suffix: String,

    /// Case-insensitive pattern selecting pause entries
    pub pause_pattern: String,

    /// Field marking the producer side of an event
    pub publish_field: String,

    /// Field marking the consumer side of an event
    pub consume_field: String,

    /// Field marking same-process subscription receipt (round-trip summary)
    pub subscribe_field: String,

    /// How entry names become source/destination identities
    pub identity: IdentityScheme,

    /// Percentile orders behind D2..D5
    pub tail_orders: TailOrders,

    /// Worker threads used to scan archives of a directory
    pub jobs: usize,

    /// Optional path for the merged-event snapshot (overwritten on every run)
    pub snapshot_path: Option<PathBuf>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            entry_suffix: "instrumentation.json".to_string(),
            pause_pattern: r".*/eventLoopPauses\.json$".to_string(),
            publish_field: "beforePublish".to_string(),
            consume_field: "afterConsume".to_string(),
            subscribe_field: "afterSubscribeXReadDelta".to_string(),
            identity: IdentityScheme::ParentDirectory,
            tail_orders: TailOrders::default(),
            jobs: 1,
            snapshot_path: None,
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse TOML config")?;
        config.validate().map_err(anyhow::Error::msg)?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.entry_suffix.is_empty() {
            return Err("entry_suffix must not be empty".to_string());
        }

        if self.publish_field.is_empty() || self.consume_field.is_empty() {
            return Err("publish_field and consume_field must not be empty".to_string());
        }

        if self.publish_field == self.consume_field {
            return Err(format!(
                "publish_field and consume_field must differ, both are {:?}",
                self.publish_field
            ));
        }

        if self.jobs == 0 {
            return Err("jobs must be >= 1".to_string());
        }

        self.tail_orders.validate()?;

        if let Err(e) = EntrySelector::pattern(&self.pause_pattern) {
            return Err(e.to_string());
        }

        Ok(())
    }

    /// Markers used by the correlator and latency deriver
    pub fn markers(&self) -> CorrelationMarkers {
        CorrelationMarkers::new(&self.publish_field, &self.consume_field)
    }

    /// Markers of the same-process round trip
    pub fn round_trip_markers(&self) -> CorrelationMarkers {
        CorrelationMarkers::new(&self.publish_field, &self.subscribe_field)
    }

    /// Selector for per-process trace entries
    pub fn trace_selector(&self) -> EntrySelector {
        EntrySelector::suffix(&self.entry_suffix)
    }

    /// Selector for pause entries
    pub fn pause_selector(&self) -> crate::error::Result<EntrySelector> {
        EntrySelector::pattern(&self.pause_pattern)
    }
}
