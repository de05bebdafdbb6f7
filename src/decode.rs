//! Tolerant JSON decoding of archive entries
//!
//! Instrumentation files were observed with concatenated or corrupted trailing
//! fragments after an otherwise valid document. Decoding is two-stage: a strict
//! parse of the whole text, then a parse of the text up to where the strict
//! parse failed. The caller sees which of the two succeeded through
//! [`Decoded`].

use crate::error::{AnalysisError, Result};
use serde_json::error::Category;
use serde_json::Value;

/// Outcome of a successful decode
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// The whole entry parsed as one JSON value
    Complete(Value),
    /// Only a leading value parsed; everything from `offset` (in characters) was dropped
    Recovered { value: Value, offset: usize },
}

impl Decoded {
    /// Borrow the decoded value
    pub fn value(&self) -> &Value {
        match self {
            Self::Complete(value) | Self::Recovered { value, .. } => value,
        }
    }

    /// Take the decoded value
    pub fn into_value(self) -> Value {
        match self {
            Self::Complete(value) | Self::Recovered { value, .. } => value,
        }
    }

    /// Character offset where trailing content was cut, if any
    pub fn recovered_offset(&self) -> Option<usize> {
        match self {
            Self::Complete(_) => None,
            Self::Recovered { offset, .. } => Some(*offset),
        }
    }
}

/// Decode bytes as UTF-8, silently dropping invalid sequences
pub fn decode_text(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text
}

/// Decode one archive entry, recovering a valid leading value when possible
///
/// # Example
/// ```
/// use tailscope::decode::{decode_entry, Decoded};
///
/// let decoded = decode_entry("p/instrumentation.json", b"{\"a\":1}GARBAGE").unwrap();
/// assert_eq!(decoded.recovered_offset(), Some(7));
/// ```
pub fn decode_entry(entry: &str, bytes: &[u8]) -> Result<Decoded> {
    let text = decode_text(bytes);
    let decoded = decode_str(entry, &text)?;

    if let Some(offset) = decoded.recovered_offset() {
        tracing::warn!(
            "Processed valid part of JSON data in {} up to position {}, extra data ignored",
            entry,
            offset
        );
    }

    Ok(decoded)
}

/// Decode already-converted text
pub fn decode_str(entry: &str, text: &str) -> Result<Decoded> {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => Ok(Decoded::Complete(value)),
        Err(strict_err) => match recover_leading_value(text, &strict_err) {
            Some((value, offset)) => Ok(Decoded::Recovered { value, offset }),
            None => Err(AnalysisError::Decode {
                entry: entry.to_string(),
                reason: strict_err.to_string(),
            }),
        },
    }
}

/// Re-parse the text up to where the strict parse failed
///
/// Succeeds only when that prefix is a complete value on its own, i.e. the
/// failure was content trailing a valid document.
fn recover_leading_value(text: &str, strict_err: &serde_json::Error) -> Option<(Value, usize)> {
    if strict_err.classify() != Category::Syntax {
        return None;
    }

    let end = byte_position(text, strict_err.line(), strict_err.column())?;
    let prefix = text.get(..end)?;
    let value = serde_json::from_str::<Value>(prefix).ok()?;
    Some((value, prefix.chars().count()))
}

/// Byte offset of a one-based line and byte column, if inside `text`
fn byte_position(text: &str, line: usize, column: usize) -> Option<usize> {
    let line_start: usize = text
        .split('\n')
        .take(line.checked_sub(1)?)
        .map(|l| l.len() + 1)
        .sum();
    let end = line_start + column.checked_sub(1)?;
    (end < text.len()).then_some(end)
}
