//! End-to-end tests of the correlation pipeline
//!
//! Archives are written to a temp directory and analyzed through the public
//! library API, from archive reading to tail-deviation aggregates.

mod utils;

use tailscope::config::AnalysisConfig;
use tailscope::correlate::IdentityScheme;
use tailscope::directory::{analyze_directory, analyze_pauses, analyze_round_trips};
use tailscope::latency::PairKey;
use tailscope::pauses::PauseBucket;
use tailscope::scan::scan_latencies;
use tailscope::snapshot::read_snapshot;
use tailscope::tail::TailOrders;
use tempfile::TempDir;
use utils::{pair_archive, trace_entry, write_archive};

fn producer_consumer() -> PairKey {
    PairKey::new("producer", "consumer")
}

#[test]
fn test_single_pair_single_sample() {
    let dir = TempDir::new().unwrap();
    let archive = pair_archive(dir.path(), "run.zip", &[(100.0, 150.0)]);

    let scan = scan_latencies(&archive, &AnalysisConfig::default()).unwrap();
    assert_eq!(scan.samples.len(), 1);
    assert_eq!(scan.samples.get(&producer_consumer()), Some(&[50.0][..]));
}

#[test]
fn test_partial_events_yield_no_samples() {
    let dir = TempDir::new().unwrap();
    let producer = trace_entry("beforePublish", &[("k1", 100.0), ("k2", 200.0)]);
    let consumer = trace_entry("afterConsume", &[("k1", 130.0)]);
    let archive = write_archive(
        dir.path(),
        "run.zip",
        &[
            ("producer/instrumentation.json", producer.as_str()),
            ("consumer/instrumentation.json", consumer.as_str()),
        ],
    );

    let scan = scan_latencies(&archive, &AnalysisConfig::default()).unwrap();
    assert_eq!(scan.events.len(), 2);
    assert_eq!(scan.samples.total_samples(), 1);
    assert!(scan.events["k2"].destination.is_none());
}

#[test]
fn test_conflicting_fields_resolve_to_last_entry_by_name() {
    let dir = TempDir::new().unwrap();
    let early = trace_entry("beforePublish", &[("k", 10.0)]);
    let late = trace_entry("beforePublish", &[("k", 40.0)]);
    let consumer = trace_entry("afterConsume", &[("k", 100.0)]);
    let archive = write_archive(
        dir.path(),
        "run.zip",
        &[
            ("z-late/instrumentation.json", late.as_str()),
            ("a-early/instrumentation.json", early.as_str()),
            ("m-consumer/instrumentation.json", consumer.as_str()),
        ],
    );

    let scan = scan_latencies(&archive, &AnalysisConfig::default()).unwrap();
    assert_eq!(
        scan.samples.get(&PairKey::new("z-late", "m-consumer")),
        Some(&[60.0][..])
    );
    assert_eq!(scan.samples.len(), 1);
}

#[test]
fn test_missing_archive_is_an_error() {
    let dir = TempDir::new().unwrap();
    let result = scan_latencies(&dir.path().join("absent.zip"), &AnalysisConfig::default());
    assert!(result.is_err());
}

#[test]
fn test_tail_deviations_pooled_per_group() {
    let dir = TempDir::new().unwrap();
    let first: Vec<(f64, f64)> = (0..50).map(|i| (1.0, 1.0 + i as f64)).collect();
    let second: Vec<(f64, f64)> = (50..101).map(|i| (1.0, 1.0 + i as f64)).collect();
    pair_archive(dir.path(), "baseline/run1.zip", &first);
    pair_archive(dir.path(), "baseline/run2.zip", &second);

    let config = AnalysisConfig {
        tail_orders: TailOrders::new([90.0, 95.0, 99.0, 100.0]).unwrap(),
        ..Default::default()
    };
    let analysis = analyze_directory(dir.path(), &config).unwrap();
    let group = &analysis.groups["baseline"];

    // latencies 0..=100 pooled from both runs
    assert_eq!(group.samples.total_samples(), 101);
    let deviations = &group.tails.pairs[&producer_consumer()];
    assert_eq!(deviations.median, 50.0);
    assert!((deviations.d2 - 40.0).abs() < 1e-9);
    assert!((deviations.d5 - 50.0).abs() < 1e-9);

    let d5 = group.tails.aggregate.get("D5").unwrap();
    assert!((d5.mean - 50.0).abs() < 1e-9);
    assert_eq!(d5.std_dev, 0.0);
}

#[test]
fn test_aggregate_over_two_pairs() {
    let dir = TempDir::new().unwrap();
    let p1 = trace_entry("beforePublish", &[("a", 1.0), ("b", 1.0), ("c", 1.0)]);
    let c1 = trace_entry("afterConsume", &[("a", 2.0), ("b", 3.0), ("c", 4.0)]);
    let p2 = trace_entry("beforePublish", &[("x", 1.0), ("y", 1.0), ("z", 1.0)]);
    let c2 = trace_entry("afterConsume", &[("x", 2.0), ("y", 11.0), ("z", 21.0)]);
    write_archive(
        dir.path(),
        "g/run.zip",
        &[
            ("p1/instrumentation.json", p1.as_str()),
            ("c1/instrumentation.json", c1.as_str()),
            ("p2/instrumentation.json", p2.as_str()),
            ("c2/instrumentation.json", c2.as_str()),
        ],
    );

    let config = AnalysisConfig {
        tail_orders: TailOrders::new([50.0, 60.0, 70.0, 100.0]).unwrap(),
        ..Default::default()
    };
    let analysis = analyze_directory(dir.path(), &config).unwrap();
    let aggregate = &analysis.groups["g"].tails.aggregate;

    // p1->c1 samples {1,2,3}: D5 = 1; p2->c2 samples {1,10,20}: D5 = 10
    assert_eq!(aggregate.pairs, 2);
    let d5 = aggregate.get("D5").unwrap();
    assert_eq!(d5.mean, 5.5);
    assert_eq!(d5.std_dev, 4.5);
    assert_eq!(d5.min, 1.0);
    assert_eq!(d5.max, 10.0);
}

#[test]
fn test_corrupt_archive_skipped_siblings_reported() {
    let dir = TempDir::new().unwrap();
    pair_archive(dir.path(), "g/a.zip", &[(1.0, 5.0)]);
    std::fs::write(dir.path().join("g/b.zip"), b"PK\x03\x04 truncated").unwrap();
    pair_archive(dir.path(), "g/c.zip", &[(1.0, 9.0)]);

    let config = AnalysisConfig {
        jobs: 3,
        ..Default::default()
    };
    let analysis = analyze_directory(dir.path(), &config).unwrap();
    assert_eq!(analysis.failures.len(), 1);
    assert_eq!(analysis.groups["g"].archives.len(), 2);
    assert_eq!(
        analysis.groups["g"].samples.get(&producer_consumer()),
        Some(&[4.0, 8.0][..])
    );
}

#[test]
fn test_parallel_and_sequential_scans_agree() {
    let dir = TempDir::new().unwrap();
    for i in 0..6 {
        let latencies: Vec<(f64, f64)> = (0..5).map(|j| (1.0, 2.0 + (i * 5 + j) as f64)).collect();
        pair_archive(dir.path(), &format!("g{}/run{}.zip", i % 2, i), &latencies);
    }

    let sequential = analyze_directory(dir.path(), &AnalysisConfig::default()).unwrap();
    let parallel = analyze_directory(
        dir.path(),
        &AnalysisConfig {
            jobs: 4,
            ..Default::default()
        },
    )
    .unwrap();

    for (name, group) in &sequential.groups {
        assert_eq!(group.samples, parallel.groups[name].samples);
        assert_eq!(group.tails, parallel.groups[name].tails);
    }
}

#[test]
fn test_synthesized_identities() {
    let dir = TempDir::new().unwrap();
    let archive = pair_archive(dir.path(), "run.zip", &[(1.0, 2.0), (1.0, 3.0)]);

    let config = AnalysisConfig {
        identity: IdentityScheme::Synthesized,
        ..Default::default()
    };
    let scan = scan_latencies(&archive, &config).unwrap();
    assert_eq!(scan.samples.len(), 1);
    assert_eq!(scan.identities.len(), 2);
    let (pair, samples) = scan.samples.iter().next().unwrap();
    assert_ne!(pair.source, "producer");
    assert_eq!(samples.len(), 2);
}

#[test]
fn test_trailing_garbage_entry_still_contributes() {
    let dir = TempDir::new().unwrap();
    let producer = format!("{}\u{0}\u{0}garbage", trace_entry("beforePublish", &[("k", 10.0)]));
    let consumer = trace_entry("afterConsume", &[("k", 12.5)]);
    let archive = write_archive(
        dir.path(),
        "run.zip",
        &[
            ("producer/instrumentation.json", producer.as_str()),
            ("consumer/instrumentation.json", consumer.as_str()),
        ],
    );

    let scan = scan_latencies(&archive, &AnalysisConfig::default()).unwrap();
    assert_eq!(scan.report.recovered.len(), 1);
    assert_eq!(scan.samples.get(&producer_consumer()), Some(&[2.5][..]));
}

#[test]
fn test_snapshot_round_trip() {
    let dir = TempDir::new().unwrap();
    let archive = pair_archive(dir.path(), "run.zip", &[(100.0, 150.0)]);
    let snapshot = dir.path().join("intermediate.json");

    let config = AnalysisConfig {
        snapshot_path: Some(snapshot.clone()),
        ..Default::default()
    };
    analyze_directory(&archive, &config).unwrap();

    let events = read_snapshot(&snapshot).unwrap();
    assert_eq!(events["k0"].timestamp("beforePublish"), Some(100.0));
    assert_eq!(events["k0"].timestamp("afterConsume"), Some(150.0));
}

#[test]
fn test_round_trip_summary() {
    let dir = TempDir::new().unwrap();
    let entry = r#"{"timestamps":{
        "a":{"beforePublish":10,"afterSubscribeXReadDelta":11},
        "b":{"beforePublish":10,"afterSubscribeXReadDelta":12},
        "c":{"beforePublish":10,"afterSubscribeXReadDelta":13}
    }}"#;
    write_archive(dir.path(), "g/run.zip", &[("p/instrumentation.json", entry)]);

    let analysis = analyze_round_trips(dir.path(), &AnalysisConfig::default()).unwrap();
    let summary = analysis.rows[0].summary.unwrap();
    assert_eq!(summary.min, 1.0);
    assert_eq!(summary.median, 2.0);
    assert_eq!(summary.max, 3.0);
    assert_eq!(summary.samples, 3);
}

#[test]
fn test_pause_histogram_from_archive() {
    let dir = TempDir::new().unwrap();
    write_archive(
        dir.path(),
        "run.zip",
        &[
            (
                "worker-1/eventLoopPauses.json",
                r#"[{"delta":4},{"delta":6},{"delta":105},{"delta":106},{"delta":1500}]"#,
            ),
            ("worker-1/instrumentation.json", r#"{"timestamps":{}}"#),
        ],
    );

    let analysis = analyze_pauses(dir.path(), &AnalysisConfig::default()).unwrap();
    let histogram = &analysis.histogram;
    assert_eq!(histogram.count(&PauseBucket::Range { lower: 6, upper: 105 }), 2);
    assert_eq!(histogram.count(&PauseBucket::Range { lower: 106, upper: 205 }), 1);
    assert_eq!(histogram.count(&PauseBucket::Overflow), 1);
    assert_eq!(histogram.total(), 4);
}
