//! Comprehensive property-based tests
//!
//! Core properties covered:
//! 1. Percentile engine (bounds, median, order independence, monotonicity)
//! 2. Tail deviations (non-negative, single-sample zero)
//! 3. Pause bucketing (noise floor, bucket membership)
//! 4. Tolerant decoding (trailing garbage never loses the leading value)
//! 5. Correlated events keep only recorded fields

use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};
use tailscope::correlate::{CorrelationMarkers, Correlator, IdentityScheme};
use tailscope::decode::decode_str;
use tailscope::extract::{extract_field_sets, FieldValue};
use tailscope::pauses::{PauseBucket, PauseHistogram};
use tailscope::percentile::{max, median, min, percentile};
use tailscope::tail::{tail_deviations, TailOrders};

// Interpolation may round by an ulp across neighbouring ranks
const TOLERANCE: f64 = 1e-6;

fn samples() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-1.0e6..1.0e6f64, 1..200)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_percentile_bounds_are_min_and_max(values in samples()) {
        prop_assert_eq!(percentile(&values, 0.0).unwrap(), min(&values).unwrap());
        prop_assert_eq!(percentile(&values, 100.0).unwrap(), max(&values).unwrap());
    }

    #[test]
    fn prop_median_is_fiftieth_percentile(values in samples()) {
        prop_assert_eq!(median(&values).unwrap(), percentile(&values, 50.0).unwrap());
    }

    #[test]
    fn prop_percentile_within_range(values in samples(), order in 0.0..=100.0f64) {
        let p = percentile(&values, order).unwrap();
        prop_assert!(p >= min(&values).unwrap() - TOLERANCE);
        prop_assert!(p <= max(&values).unwrap() + TOLERANCE);
    }

    #[test]
    fn prop_percentile_independent_of_input_order(values in samples(), order in 0.0..=100.0f64) {
        let mut reversed = values.clone();
        reversed.reverse();
        prop_assert_eq!(
            percentile(&values, order).unwrap(),
            percentile(&reversed, order).unwrap()
        );
    }

    #[test]
    fn prop_percentile_monotonic_in_order(values in samples(), a in 0.0..=100.0f64, b in 0.0..=100.0f64) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(percentile(&values, low).unwrap() <= percentile(&values, high).unwrap() + TOLERANCE);
    }

    #[test]
    fn prop_single_sample_every_order(value in -1.0e6..1.0e6f64, order in 0.0..=100.0f64) {
        prop_assert_eq!(percentile(&[value], order).unwrap(), value);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_tail_deviations_non_negative(values in samples()) {
        let deviations = tail_deviations(&values, &TailOrders::default()).unwrap();
        for d in deviations.values() {
            prop_assert!(d >= -TOLERANCE);
        }
        prop_assert_eq!(deviations.samples, values.len());
    }

    #[test]
    fn prop_constant_samples_have_zero_deviation(value in -1.0e3..1.0e3f64, n in 1usize..50) {
        let values = vec![value; n];
        let deviations = tail_deviations(&values, &TailOrders::default()).unwrap();
        prop_assert_eq!(deviations.median, value);
        prop_assert_eq!(deviations.values(), [0.0; 4]);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_pause_noise_floor_discarded(delta in -1.0e3..=5.0f64) {
        prop_assert_eq!(PauseBucket::classify(delta), None);
    }

    #[test]
    fn prop_pause_bucket_contains_delta(delta in 6u32..=1000) {
        match PauseBucket::classify(f64::from(delta)) {
            Some(PauseBucket::Range { lower, upper }) => {
                prop_assert!(i64::from(delta) >= lower && i64::from(delta) <= upper);
                prop_assert_eq!(upper - lower, 99);
                prop_assert_eq!((lower - 6) % 100, 0);
            }
            other => prop_assert!(false, "unexpected bucket {:?}", other),
        }
    }

    #[test]
    fn prop_pause_overflow(delta in 1000.001..1.0e7f64) {
        prop_assert_eq!(PauseBucket::classify(delta), Some(PauseBucket::Overflow));
    }

    #[test]
    fn prop_histogram_total_counts_kept_deltas(deltas in prop::collection::vec(0.0..2000.0f64, 0..100)) {
        let mut histogram = PauseHistogram::new();
        histogram.extend(deltas.iter().copied());
        let kept = deltas.iter().filter(|d| PauseBucket::classify(**d).is_some()).count();
        prop_assert_eq!(histogram.total(), kept as u64);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_trailing_garbage_keeps_leading_value(key in "[a-z]{1,8}", value in 1u32..1_000_000, garbage in "[a-zA-Z#%]{1,20}") {
        let document = json!({ "timestamps": { key.clone(): { "beforePublish": value } } });
        let text = format!("{}{}", document, garbage);

        let decoded = decode_str("proc/instrumentation.json", &text).unwrap();
        prop_assert_eq!(decoded.value(), &document);
        prop_assert_eq!(decoded.recovered_offset(), Some(document.to_string().chars().count()));
    }

    #[test]
    fn prop_correlated_events_hold_only_meaningful_fields(
        produced in trace_record(),
        consumed in trace_record(),
    ) {
        let mut correlator = Correlator::new(CorrelationMarkers::default());
        for (entry, record) in [
            ("producer/instrumentation.json", &produced),
            ("consumer/instrumentation.json", &consumed),
        ] {
            let field_sets = extract_field_sets(&json!({ "timestamps": record }));
            correlator.ingest(entry, IdentityScheme::ParentDirectory, &field_sets);
        }
        let (events, _) = correlator.into_parts();

        for event in events.values() {
            prop_assert!(!event.fields.is_empty());
            prop_assert!(event.fields.values().all(FieldValue::is_meaningful));
        }

        let keys: BTreeSet<&String> = produced.keys().chain(consumed.keys()).collect();
        for key in keys {
            let recorded = |record: &TraceRecord, field: Option<&str>| {
                record.get(key).is_some_and(|fields| {
                    fields
                        .iter()
                        .any(|(name, value)| {
                            field.map_or(true, |f| f == name.as_str()) && recorded_value(value)
                        })
                })
            };

            let any_field = recorded(&produced, None) || recorded(&consumed, None);
            prop_assert_eq!(events.contains_key(key), any_field);

            let expected_source = if recorded(&consumed, Some("beforePublish")) {
                Some("consumer")
            } else if recorded(&produced, Some("beforePublish")) {
                Some("producer")
            } else {
                None
            };
            prop_assert_eq!(
                events.get(key).and_then(|event| event.source.as_deref()),
                expected_source
            );
        }
    }
}

type TraceRecord = BTreeMap<String, BTreeMap<String, Value>>;

/// Whether the instrumentation actually recorded `value`
fn recorded_value(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn field_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        prop_oneof![Just(0i64), -1000i64..1000].prop_map(Value::from),
        "[a-z]{0,3}".prop_map(Value::from),
        prop::collection::vec(0i64..3, 0..2).prop_map(|items| json!(items)),
        prop::collection::btree_map("[a-z]{1,2}", 0i64..3, 0..2).prop_map(|map| json!(map)),
    ]
}

fn trace_record() -> impl Strategy<Value = TraceRecord> {
    let field_name = prop_oneof![
        Just("beforePublish".to_string()),
        Just("afterConsume".to_string()),
        "[a-z]{1,4}",
    ];
    prop::collection::btree_map(
        "k[0-9]",
        prop::collection::btree_map(field_name, field_value(), 0..4),
        0..5,
    )
}
