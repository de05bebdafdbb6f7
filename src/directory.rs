//! Directory analysis
//!
//! Walks a directory tree for `*.zip` archives, scans them (optionally on
//! several worker threads) and pools the results per group. A group is the set
//! of archives sharing a parent directory name, e.g. every run of one
//! benchmark configuration. Each worker owns the correlation state of the
//! archive it is scanning; only finished scans are pooled.
//!
//! A broken archive is recorded as an [`ArchiveFailure`] and never aborts its
//! siblings.

use crate::config::AnalysisConfig;
use crate::correlate::CorrelatedEvents;
use crate::error::Result;
use crate::latency::{LatencySamples, PairKey};
use crate::pauses::PauseHistogram;
use crate::percentile::{pair_percentiles, PercentileProfile};
use crate::roundtrip::RoundTripSummary;
use crate::scan::{scan_latencies, scan_pauses, scan_round_trips, ScanReport};
use crate::snapshot::write_snapshot;
use crate::tail::{analyze_tails, TailAnalysis};
use jwalk::WalkDir;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Archive that could not be scanned
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveFailure {
    pub path: PathBuf,
    pub error: String,
}

/// All `*.zip` files under `root`, sorted by path
///
/// A file path is returned as is, so a single archive behaves like a
/// directory holding only that archive. Symbolic links are not followed, and
/// a subtree that cannot be read is logged and skipped.
pub fn discover_archives(root: &Path) -> Result<Vec<PathBuf>> {
    if fs::metadata(root)?.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }

    let mut archives = Vec::new();
    for entry in WalkDir::new(root).skip_hidden(false).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable path under {}: {}", root.display(), e);
                continue;
            }
        };

        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "zip") {
            archives.push(path);
        }
    }

    archives.sort();
    tracing::debug!("Found {} archives under {}", archives.len(), root.display());
    Ok(archives)
}

/// Name of the group an archive belongs to: its parent directory name
pub fn group_name(archive: &Path) -> String {
    archive
        .parent()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| ".".to_string())
}

/// Run `scan` over every archive, returning results in archive order
///
/// With `jobs > 1` archives are handed out to scoped worker threads one at a
/// time.
pub fn scan_all<T, F>(archives: &[PathBuf], jobs: usize, scan: F) -> Vec<Result<T>>
where
    T: Send,
    F: Fn(&Path) -> Result<T> + Sync,
{
    if jobs <= 1 || archives.len() <= 1 {
        return archives.iter().map(|path| scan(path)).collect();
    }

    let workers = jobs.min(archives.len());
    let next_index = AtomicUsize::new(0);
    let (tx, rx) = crossbeam::channel::unbounded();

    let outcome = crossbeam::scope(|s| {
        for _ in 0..workers {
            let tx = tx.clone();
            let next_index = &next_index;
            let scan = &scan;
            s.spawn(move |_| loop {
                let index = next_index.fetch_add(1, Ordering::Relaxed);
                let Some(path) = archives.get(index) else {
                    break;
                };
                if tx.send((index, scan(path))).is_err() {
                    break;
                }
            });
        }
    });
    drop(tx);

    if let Err(panic) = outcome {
        std::panic::resume_unwind(panic);
    }

    let mut results: Vec<(usize, Result<T>)> = rx.into_iter().collect();
    results.sort_by_key(|(index, _)| *index);
    results.into_iter().map(|(_, result)| result).collect()
}

/// Split scan results into successes and recorded failures
fn partition<T>(
    archives: &[PathBuf],
    results: Vec<Result<T>>,
) -> (Vec<(PathBuf, T)>, Vec<ArchiveFailure>) {
    let mut scanned = Vec::new();
    let mut failures = Vec::new();

    for (path, result) in archives.iter().zip(results) {
        match result {
            Ok(value) => scanned.push((path.clone(), value)),
            Err(e) => {
                tracing::warn!("Skipping archive {}: {}", path.display(), e);
                failures.push(ArchiveFailure {
                    path: path.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    (scanned, failures)
}

/// Pooled latency statistics of one group
#[derive(Debug, Clone, Default)]
pub struct GroupAnalysis {
    pub name: String,
    pub archives: Vec<PathBuf>,
    pub samples: LatencySamples,
    pub profiles: BTreeMap<PairKey, PercentileProfile>,
    pub tails: TailAnalysis,
    pub reports: Vec<ScanReport>,
}

#[derive(Debug, Clone, Default)]
pub struct DirectoryAnalysis {
    /// Group name → pooled statistics
    pub groups: BTreeMap<String, GroupAnalysis>,
    pub failures: Vec<ArchiveFailure>,
}

/// Latency scan of one archive, reduced to what group pooling needs
#[derive(Debug)]
struct PooledScan {
    samples: LatencySamples,
    report: ScanReport,
    /// Kept only when a snapshot will be written
    events: Option<CorrelatedEvents>,
}

fn scan_for_pooling(path: &Path, config: &AnalysisConfig) -> Result<PooledScan> {
    let scan = scan_latencies(path, config)?;
    Ok(PooledScan {
        samples: scan.samples,
        report: scan.report,
        events: config.snapshot_path.is_some().then_some(scan.events),
    })
}

/// Correlate every archive under `root` and compute per-group statistics
///
/// Statistics are computed only once every archive of a group was pooled.
/// Merged events are released as soon as an archive's samples are derived,
/// unless a snapshot path is configured; then the events of the last archive
/// scanned successfully are written there.
pub fn analyze_directory(root: &Path, config: &AnalysisConfig) -> Result<DirectoryAnalysis> {
    let archives = discover_archives(root)?;
    let results = scan_all(&archives, config.jobs, |path| scan_for_pooling(path, config));
    let (scanned, failures) = partition(&archives, results);

    let mut groups: BTreeMap<String, GroupAnalysis> = BTreeMap::new();
    let mut last_events = None;

    for (path, scan) in scanned {
        let name = group_name(&path);
        let group = groups.entry(name.clone()).or_insert_with(|| GroupAnalysis {
            name,
            ..Default::default()
        });
        group.archives.push(path);
        group.samples.merge(scan.samples);
        group.reports.push(scan.report);
        if scan.events.is_some() {
            last_events = scan.events;
        }
    }

    for group in groups.values_mut() {
        group.profiles = pair_percentiles(&group.samples)?;
        group.tails = analyze_tails(&group.samples, &config.tail_orders)?;
        tracing::info!(
            "Group {}: {} archives, {} pairs, {} samples",
            group.name,
            group.archives.len(),
            group.samples.len(),
            group.samples.total_samples()
        );
    }

    if let (Some(path), Some(events)) = (&config.snapshot_path, &last_events) {
        write_snapshot(path, events)?;
    }

    Ok(DirectoryAnalysis { groups, failures })
}

/// Round-trip summary of one archive
#[derive(Debug, Clone, Serialize)]
pub struct RoundTripRow {
    pub group: String,
    pub archive: PathBuf,
    /// `None` when the archive held no field set with both markers
    pub summary: Option<RoundTripSummary>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RoundTripAnalysis {
    pub rows: Vec<RoundTripRow>,
    pub failures: Vec<ArchiveFailure>,
}

/// Summarize same-process round trips of every archive under `root`
pub fn analyze_round_trips(root: &Path, config: &AnalysisConfig) -> Result<RoundTripAnalysis> {
    let archives = discover_archives(root)?;
    let results = scan_all(&archives, config.jobs, |path| scan_round_trips(path, config));
    let (scanned, failures) = partition(&archives, results);

    let rows = scanned
        .into_iter()
        .map(|(path, scan)| {
            let summary = if scan.latencies.is_empty() {
                tracing::warn!("No valid timestamp data found in {}", path.display());
                None
            } else {
                Some(RoundTripSummary::compute(
                    &scan.latencies,
                    scan.report.entries_read,
                )?)
            };
            Ok(RoundTripRow {
                group: group_name(&path),
                archive: path,
                summary,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(RoundTripAnalysis { rows, failures })
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PauseAnalysis {
    /// Histogram merged over all archives
    pub histogram: PauseHistogram,
    /// Archives scanned successfully
    pub archives: usize,
    pub failures: Vec<ArchiveFailure>,
}

/// Bucket the pause deltas of every archive under `root` into one histogram
pub fn analyze_pauses(root: &Path, config: &AnalysisConfig) -> Result<PauseAnalysis> {
    let archives = discover_archives(root)?;
    let results = scan_all(&archives, config.jobs, |path| scan_pauses(path, config));
    let (scanned, failures) = partition(&archives, results);

    let mut histogram = PauseHistogram::new();
    for (_, scan) in &scanned {
        histogram.merge(&scan.histogram);
    }

    Ok(PauseAnalysis {
        histogram,
        archives: scanned.len(),
        failures,
    })
}
