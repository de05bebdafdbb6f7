//! Markdown and JSON rendering of analysis results
//!
//! Markdown tables have one fixed header row and one row per key; numbers are
//! rounded to two decimals. JSON output carries the unrounded values, flattened
//! into rows because pair keys cannot be JSON object keys.

use crate::directory::{ArchiveFailure, DirectoryAnalysis, PauseAnalysis, RoundTripAnalysis};
use crate::pauses::PauseBucket;
use crate::percentile::{PercentileProfile, SummaryStats};
use crate::tail::{TailDeviations, TAIL_LABELS};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Labels given their own focus table in the tail report
pub const FOCUS_LABELS: [&str; 2] = ["D2", "D3"];

/// Markdown table formatter
#[derive(Debug)]
pub struct MarkdownTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl MarkdownTable {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Escape pipes so cell text cannot break the table
    fn escape_cell(cell: &str) -> String {
        cell.replace('|', "\\|")
    }

    fn format_row(cells: &[String]) -> String {
        let cells: Vec<String> = cells.iter().map(|c| Self::escape_cell(c)).collect();
        format!("| {} |", cells.join(" | "))
    }

    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str(&Self::format_row(&self.headers));
        output.push('\n');
        let rule: Vec<&str> = self.headers.iter().map(|_| "---").collect();
        output.push_str(&format!("|{}|", rule.join("|")));
        output.push('\n');

        for row in &self.rows {
            output.push_str(&Self::format_row(row));
            output.push('\n');
        }

        output
    }
}

/// Two-decimal presentation of a statistic
pub fn round2(value: f64) -> String {
    format!("{:.2}", value)
}

fn summary_cells(stats: &SummaryStats) -> Vec<String> {
    [stats.median, stats.mean, stats.std_dev, stats.max, stats.min]
        .into_iter()
        .map(round2)
        .collect()
}

fn failures_markdown(failures: &[ArchiveFailure]) -> String {
    if failures.is_empty() {
        return String::new();
    }

    let mut output = String::from("\n**Skipped archives**\n\n");
    for failure in failures {
        output.push_str(&format!("- `{}`: {}\n", failure.path.display(), failure.error));
    }
    output
}

/// Per-pair percentile profiles, one table per group
pub fn pairs_markdown(analysis: &DirectoryAnalysis) -> String {
    let mut output = String::new();

    for (name, group) in &analysis.groups {
        output.push_str(&format!("## {}\n\n", name));

        let mut table = MarkdownTable::new([
            "Source",
            "Destination",
            "Samples",
            "P50",
            "P90",
            "P99",
            "P99.9",
            "P99.99",
            "P99.999",
        ]);
        for (pair, profile) in &group.profiles {
            let mut row = vec![
                pair.source.clone(),
                pair.destination.clone(),
                profile.samples.to_string(),
            ];
            row.extend(profile.values().iter().map(|(_, value)| round2(*value)));
            table.add_row(row);
        }

        if table.is_empty() {
            output.push_str("No correlated pairs found.\n\n");
        } else {
            output.push_str(&table.to_markdown());
            output.push('\n');
        }
    }

    output.push_str(&failures_markdown(&analysis.failures));
    output
}

/// Tail-deviation aggregates of every group plus the focus tables
pub fn tails_markdown(analysis: &DirectoryAnalysis) -> String {
    let mut output = String::from("## Tail deviations\n\n");

    let mut table =
        MarkdownTable::new(["Group", "Metric", "Median", "Mean", "StdDev", "Max", "Min"]);
    for (name, group) in &analysis.groups {
        for label in TAIL_LABELS {
            if let Some(stats) = group.tails.aggregate.get(label) {
                let mut row = vec![name.clone(), label.to_string()];
                row.extend(summary_cells(stats));
                table.add_row(row);
            }
        }
    }
    output.push_str(&table.to_markdown());

    for label in FOCUS_LABELS {
        output.push_str(&format!("\n### {}\n\n", label));
        let mut focus =
            MarkdownTable::new(["Group", "Pairs", "Median", "Mean", "StdDev", "Max", "Min"]);
        for (name, group) in &analysis.groups {
            if let Some(stats) = group.tails.aggregate.get(label) {
                let mut row = vec![name.clone(), group.tails.aggregate.pairs.to_string()];
                row.extend(summary_cells(stats));
                focus.add_row(row);
            }
        }
        output.push_str(&focus.to_markdown());
    }

    output.push_str(&failures_markdown(&analysis.failures));
    output
}

/// One row per archive
pub fn round_trips_markdown(analysis: &RoundTripAnalysis) -> String {
    let mut table = MarkdownTable::new([
        "Group", "Archive", "Entries", "Samples", "Min", "Max", "Median", "P25", "P50", "P75",
        "P99", "P99.9", "P99.99", "P99.999",
    ]);

    for row in &analysis.rows {
        let archive = row
            .archive
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut cells = vec![row.group.clone(), archive];

        match &row.summary {
            Some(summary) => {
                cells.push(summary.entry_count.to_string());
                cells.push(summary.samples.to_string());
                cells.extend(
                    [
                        summary.min,
                        summary.max,
                        summary.median,
                        summary.p25,
                        summary.p50,
                        summary.p75,
                        summary.p99,
                        summary.p99_9,
                        summary.p99_99,
                        summary.p99_999,
                    ]
                    .into_iter()
                    .map(round2),
                );
            }
            None => {
                cells.push("-".to_string());
                cells.push("0".to_string());
                cells.push("No valid timestamp data found".to_string());
                cells.extend((0..9).map(|_| "-".to_string()));
            }
        }
        table.add_row(cells);
    }

    let mut output = String::from("## Round trips\n\n");
    output.push_str(&table.to_markdown());
    output.push_str(&failures_markdown(&analysis.failures));
    output
}

/// Interval label as shown in the pause table
pub fn pause_interval_label(bucket: &PauseBucket) -> String {
    match bucket {
        PauseBucket::Range { .. } => bucket.to_string(),
        PauseBucket::Overflow => format!("`{}`", bucket),
    }
}

pub fn pauses_markdown(analysis: &PauseAnalysis) -> String {
    let mut table = MarkdownTable::new(["Interval (ms)", "Count"]);
    for (bucket, count) in analysis.histogram.iter() {
        table.add_row(vec![pause_interval_label(bucket), count.to_string()]);
    }

    let mut output = format!(
        "## Event loop pauses ({} archives, {} pauses)\n\n",
        analysis.archives,
        analysis.histogram.total()
    );
    output.push_str(&table.to_markdown());
    output.push_str(&failures_markdown(&analysis.failures));
    output
}

/// Percentile profile of one pair, flattened for JSON
#[derive(Debug, Clone, Serialize)]
pub struct JsonPairProfile {
    pub source: String,
    pub destination: String,
    #[serde(flatten)]
    pub profile: PercentileProfile,
}

/// Tail deviations of one pair, flattened for JSON
#[derive(Debug, Clone, Serialize)]
pub struct JsonPairDeviations {
    pub source: String,
    pub destination: String,
    #[serde(flatten)]
    pub deviations: TailDeviations,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonGroup {
    pub name: String,
    pub archives: Vec<PathBuf>,
    pub profiles: Vec<JsonPairProfile>,
    pub deviations: Vec<JsonPairDeviations>,
    /// Label (D2..D5) → summary across pairs
    pub aggregate: BTreeMap<String, SummaryStats>,
    pub recovered_entries: usize,
    pub skipped_entries: usize,
}

/// JSON document for `pairs` and `tails`
#[derive(Debug, Clone, Serialize)]
pub struct JsonLatencyReport {
    pub groups: Vec<JsonGroup>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ArchiveFailure>,
}

impl JsonLatencyReport {
    pub fn from_analysis(analysis: &DirectoryAnalysis) -> Self {
        let groups = analysis
            .groups
            .values()
            .map(|group| JsonGroup {
                name: group.name.clone(),
                archives: group.archives.clone(),
                profiles: group
                    .profiles
                    .iter()
                    .map(|(pair, profile)| JsonPairProfile {
                        source: pair.source.clone(),
                        destination: pair.destination.clone(),
                        profile: *profile,
                    })
                    .collect(),
                deviations: group
                    .tails
                    .pairs
                    .iter()
                    .map(|(pair, deviations)| JsonPairDeviations {
                        source: pair.source.clone(),
                        destination: pair.destination.clone(),
                        deviations: *deviations,
                    })
                    .collect(),
                aggregate: group.tails.aggregate.by_label.clone(),
                recovered_entries: group.reports.iter().map(|r| r.recovered.len()).sum(),
                skipped_entries: group.reports.iter().map(|r| r.skipped.len()).sum(),
            })
            .collect();

        Self {
            groups,
            failures: analysis.failures.clone(),
        }
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub fn round_trips_json(analysis: &RoundTripAnalysis) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(analysis)?)
}

pub fn pauses_json(analysis: &PauseAnalysis) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(analysis)?)
}
