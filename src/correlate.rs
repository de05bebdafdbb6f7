//! Correlation of field sets sharing a timestamp key
//!
//! Every entry of an archive reports some fields for some timestamp keys. The
//! correlator merges them into one [`CorrelatedEvent`] per key and stamps the
//! event with the identity of the entry that reported the publish marker
//! (source) and the one that reported the consume marker (destination).
//!
//! Identities come from an explicit [`IdentityMap`] owned by one scan. It is
//! handed in and handed back so nothing leaks between archives.

use crate::extract::{FieldSet, FieldValue};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use uuid::Uuid;

/// How an entry name becomes a source/destination identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityScheme {
    /// Name of the entry's parent directory (the full entry name at archive root)
    #[default]
    ParentDirectory,
    /// Random token per distinct entry name
    Synthesized,
}

impl IdentityScheme {
    fn identify(self, entry_name: &str) -> String {
        match self {
            Self::ParentDirectory => parent_directory_name(entry_name)
                .unwrap_or(entry_name)
                .to_string(),
            Self::Synthesized => Uuid::new_v4().to_string(),
        }
    }
}

fn parent_directory_name(entry_name: &str) -> Option<&str> {
    Path::new(entry_name)
        .parent()?
        .file_name()?
        .to_str()
        .filter(|name| !name.is_empty())
}

/// Entry name → identity, stable for the lifetime of one scan
#[derive(Debug, Clone, Default)]
pub struct IdentityMap {
    by_entry: HashMap<String, String>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity of `entry_name`, assigned on first sight
    pub fn resolve(&mut self, entry_name: &str, scheme: IdentityScheme) -> String {
        self.by_entry
            .entry(entry_name.to_string())
            .or_insert_with(|| scheme.identify(entry_name))
            .clone()
    }

    pub fn get(&self, entry_name: &str) -> Option<&str> {
        self.by_entry.get(entry_name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_entry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_entry.is_empty()
    }
}

/// Field names that mark the two ends of a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationMarkers {
    pub publish: String,
    pub consume: String,
}

impl CorrelationMarkers {
    pub fn new(publish: &str, consume: &str) -> Self {
        Self {
            publish: publish.to_string(),
            consume: consume.to_string(),
        }
    }
}

impl Default for CorrelationMarkers {
    fn default() -> Self {
        Self::new("beforePublish", "afterConsume")
    }
}

/// All fields merged for one timestamp key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrelatedEvent {
    #[serde(flatten)]
    pub fields: BTreeMap<String, FieldValue>,
    #[serde(
        rename = "srcInstrumentationIdentifier",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub source: Option<String>,
    #[serde(
        rename = "dstInstrumentationIdentifier",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub destination: Option<String>,
}

impl CorrelatedEvent {
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Numeric value of a field, if present and numeric
    pub fn timestamp(&self, name: &str) -> Option<f64> {
        self.field(name).and_then(FieldValue::as_number)
    }
}

/// Timestamp key → merged event
pub type CorrelatedEvents = BTreeMap<String, CorrelatedEvent>;

/// Merges field sets from the entries of one archive scan
#[derive(Debug)]
pub struct Correlator {
    markers: CorrelationMarkers,
    identities: IdentityMap,
    events: CorrelatedEvents,
}

impl Correlator {
    pub fn new(markers: CorrelationMarkers) -> Self {
        Self::with_identities(markers, IdentityMap::new())
    }

    /// Start from an existing identity map (e.g. shared by two passes over one archive)
    pub fn with_identities(markers: CorrelationMarkers, identities: IdentityMap) -> Self {
        Self {
            markers,
            identities,
            events: CorrelatedEvents::new(),
        }
    }

    /// Merge the field sets reported by one entry
    ///
    /// Later entries overwrite fields set by earlier ones, so callers feed
    /// entries in name order. Returns the number of fields merged.
    pub fn ingest(
        &mut self,
        entry_name: &str,
        scheme: IdentityScheme,
        field_sets: &[FieldSet],
    ) -> usize {
        let identity = self.identities.resolve(entry_name, scheme);
        let mut merged = 0;

        for set in field_sets {
            for (name, value) in &set.fields {
                if !value.is_meaningful() {
                    continue;
                }

                let event = self.events.entry(set.key.clone()).or_default();
                if *name == self.markers.publish {
                    event.source = Some(identity.clone());
                } else if *name == self.markers.consume {
                    event.destination = Some(identity.clone());
                }
                event.fields.insert(name.clone(), value.clone());
                merged += 1;
            }
        }

        tracing::trace!("Merged {} fields from {} as {}", merged, entry_name, identity);
        merged
    }

    pub fn markers(&self) -> &CorrelationMarkers {
        &self.markers
    }

    pub fn events(&self) -> &CorrelatedEvents {
        &self.events
    }

    /// Finish the scan, returning merged events and the identity map
    pub fn into_parts(self) -> (CorrelatedEvents, IdentityMap) {
        (self.events, self.identities)
    }
}
