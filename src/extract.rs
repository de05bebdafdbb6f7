//! Event extraction from decoded trace records
//!
//! A trace record looks like `{"timestamps": {"<key>": {"<field>": <value>, ...}}}`.
//! The instrumentation writes zero or empty values for fields it did not
//! record, so those are dropped here and never reach the correlator.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Top-level field holding the timestamp-keyed map
pub const TIMESTAMPS_FIELD: &str = "timestamps";

/// Value of a single recorded field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Sequence(Vec<Value>),
    Mapping(Map<String, Value>),
}

impl FieldValue {
    /// Classify a JSON value
    ///
    /// Booleans count as numbers (`true` = 1). `null` is not a field value.
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(Self::Number(if b { 1.0 } else { 0.0 })),
            Value::Number(n) => n.as_f64().map(Self::Number),
            Value::String(s) => Some(Self::Text(s)),
            Value::Array(items) => Some(Self::Sequence(items)),
            Value::Object(map) => Some(Self::Mapping(map)),
        }
    }

    /// Non-zero number, or non-empty text/sequence/mapping
    pub fn is_meaningful(&self) -> bool {
        match self {
            Self::Number(n) => *n != 0.0,
            Self::Text(s) => !s.is_empty(),
            Self::Sequence(items) => !items.is_empty(),
            Self::Mapping(map) => !map.is_empty(),
        }
    }

    /// Numeric view, used for timestamps
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// Meaningful fields recorded under one timestamp key of one entry
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSet {
    pub key: String,
    pub fields: Vec<(String, FieldValue)>,
}

/// Extract the meaningful field sets of a trace record
///
/// Records without a `timestamps` object yield nothing. Keys whose fields are
/// all zero/empty are omitted.
pub fn extract_field_sets(record: &Value) -> Vec<FieldSet> {
    let Some(timestamps) = record.get(TIMESTAMPS_FIELD).and_then(Value::as_object) else {
        tracing::debug!("Record has no {} object", TIMESTAMPS_FIELD);
        return Vec::new();
    };

    timestamps
        .iter()
        .filter_map(|(key, values)| {
            let Some(values) = values.as_object() else {
                tracing::trace!("Skipping non-object field set under key {}", key);
                return None;
            };

            let fields: Vec<(String, FieldValue)> = values
                .iter()
                .filter_map(|(name, value)| {
                    FieldValue::from_json(value.clone())
                        .filter(FieldValue::is_meaningful)
                        .map(|v| (name.clone(), v))
                })
                .collect();

            if fields.is_empty() {
                None
            } else {
                Some(FieldSet {
                    key: key.clone(),
                    fields,
                })
            }
        })
        .collect()
}
