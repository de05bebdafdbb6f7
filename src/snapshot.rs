//! Merged-event snapshot
//!
//! The correlated events of a scan can be written out as one JSON object keyed
//! by timestamp key, indented by four spaces. The file is replaced as a whole
//! on every write; nothing is appended.

use crate::correlate::CorrelatedEvents;
use crate::error::Result;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

/// Write `events` to `path`, overwriting any previous snapshot
pub fn write_snapshot<P: AsRef<Path>>(path: P, events: &CorrelatedEvents) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
    events.serialize(&mut serializer).map_err(io::Error::from)?;
    writer.flush()?;

    tracing::info!("Wrote {} events to {}", events.len(), path.display());
    Ok(())
}

/// Read a snapshot written by [`write_snapshot`]
pub fn read_snapshot<P: AsRef<Path>>(path: P) -> Result<CorrelatedEvents> {
    let reader = BufReader::new(File::open(path)?);
    let events = serde_json::from_reader(reader).map_err(io::Error::from)?;
    Ok(events)
}
