//! Single-archive scans
//!
//! A scan opens one archive, decodes the selected entries in name order and
//! feeds them to one pipeline. Entries that cannot be read or decoded are
//! skipped and recorded in the [`ScanReport`]; only a failure to open the
//! archive itself aborts the scan. The zip handle is owned by the scan and
//! dropped on every exit path.

use crate::archive::{ArchiveReader, EntrySelector};
use crate::config::AnalysisConfig;
use crate::correlate::{CorrelatedEvents, Correlator, IdentityMap};
use crate::decode::decode_entry;
use crate::error::Result;
use crate::extract::extract_field_sets;
use crate::latency::{derive_latencies, LatencySamples};
use crate::pauses::{extract_pause_deltas, PauseHistogram};
use crate::roundtrip::round_trip_latencies;
use serde::Serialize;
use serde_json::Value;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

/// Entry whose trailing content was dropped during decoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecoveredEntry {
    pub entry: String,
    pub offset: usize,
}

/// Entry skipped entirely
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEntry {
    pub entry: String,
    pub reason: String,
}

/// What happened to the entries of one archive
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub archive: PathBuf,
    /// Entries decoded (fully or recovered)
    pub entries_read: usize,
    pub recovered: Vec<RecoveredEntry>,
    pub skipped: Vec<SkippedEntry>,
}

impl ScanReport {
    pub fn new(archive: &Path) -> Self {
        Self {
            archive: archive.to_path_buf(),
            ..Default::default()
        }
    }
}

/// Decode every selected entry and hand its value to `visit`
fn visit_entries<R, F>(
    reader: &mut ArchiveReader<R>,
    selector: &EntrySelector,
    report: &mut ScanReport,
    mut visit: F,
) where
    R: Read + Seek,
    F: FnMut(&str, Value),
{
    for name in reader.entry_names(selector) {
        tracing::debug!("Processing JSON file: {}", name);

        let decoded = reader
            .read_entry(&name)
            .and_then(|entry| decode_entry(&entry.name, &entry.bytes));

        match decoded {
            Ok(decoded) => {
                if let Some(offset) = decoded.recovered_offset() {
                    report.recovered.push(RecoveredEntry {
                        entry: name.clone(),
                        offset,
                    });
                }
                report.entries_read += 1;
                visit(&name, decoded.into_value());
            }
            Err(e) => {
                tracing::warn!("Error processing file {}: {}", name, e);
                report.skipped.push(SkippedEntry {
                    entry: name,
                    reason: e.to_string(),
                });
            }
        }
    }
}

/// Result of correlating one archive
#[derive(Debug, Clone)]
pub struct LatencyScan {
    pub samples: LatencySamples,
    pub events: CorrelatedEvents,
    pub identities: IdentityMap,
    pub report: ScanReport,
}

/// Correlate the trace entries of one archive and derive its latency samples
pub fn scan_latencies(path: &Path, config: &AnalysisConfig) -> Result<LatencyScan> {
    let reader = ArchiveReader::open(path)?;
    scan_latencies_from(reader, config)
}

pub fn scan_latencies_from<R: Read + Seek>(
    mut reader: ArchiveReader<R>,
    config: &AnalysisConfig,
) -> Result<LatencyScan> {
    let markers = config.markers();
    let mut report = ScanReport::new(reader.path());
    let mut correlator = Correlator::new(markers.clone());

    visit_entries(
        &mut reader,
        &config.trace_selector(),
        &mut report,
        |name, record| {
            let field_sets = extract_field_sets(&record);
            correlator.ingest(name, config.identity, &field_sets);
        },
    );

    let (events, identities) = correlator.into_parts();
    let samples = derive_latencies(&events, &markers);

    tracing::info!(
        "Scanned {}: {} entries, {} events, {} samples over {} pairs",
        report.archive.display(),
        report.entries_read,
        events.len(),
        samples.total_samples(),
        samples.len()
    );

    Ok(LatencyScan {
        samples,
        events,
        identities,
        report,
    })
}

/// Same-process round-trip latencies of one archive
#[derive(Debug, Clone)]
pub struct RoundTripScan {
    pub latencies: Vec<f64>,
    pub report: ScanReport,
}

pub fn scan_round_trips(path: &Path, config: &AnalysisConfig) -> Result<RoundTripScan> {
    let reader = ArchiveReader::open(path)?;
    scan_round_trips_from(reader, config)
}

pub fn scan_round_trips_from<R: Read + Seek>(
    mut reader: ArchiveReader<R>,
    config: &AnalysisConfig,
) -> Result<RoundTripScan> {
    let markers = config.round_trip_markers();
    let mut report = ScanReport::new(reader.path());
    let mut latencies = Vec::new();

    visit_entries(
        &mut reader,
        &config.trace_selector(),
        &mut report,
        |_, record| {
            latencies.extend(round_trip_latencies(&extract_field_sets(&record), &markers));
        },
    );

    Ok(RoundTripScan { latencies, report })
}

/// Pause histogram of one archive
#[derive(Debug, Clone)]
pub struct PauseScan {
    pub histogram: PauseHistogram,
    pub report: ScanReport,
}

pub fn scan_pauses(path: &Path, config: &AnalysisConfig) -> Result<PauseScan> {
    let reader = ArchiveReader::open(path)?;
    scan_pauses_from(reader, config)
}

pub fn scan_pauses_from<R: Read + Seek>(
    mut reader: ArchiveReader<R>,
    config: &AnalysisConfig,
) -> Result<PauseScan> {
    let selector = config.pause_selector()?;
    let mut report = ScanReport::new(reader.path());
    let mut histogram = PauseHistogram::new();

    visit_entries(&mut reader, &selector, &mut report, |name, record| {
        let deltas = extract_pause_deltas(&record);
        tracing::debug!("Delta entries processed for {}: {}", name, deltas.len());
        histogram.extend(deltas);
    });

    Ok(PauseScan { histogram, report })
}
