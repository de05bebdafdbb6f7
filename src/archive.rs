//! Zip archive access for instrumentation bundles
//!
//! An archive is opened once per scan. Entries are selected with an
//! [`EntrySelector`] and always visited in name order so that merges over the
//! same timestamp key resolve the same way on every run.

use crate::error::{AnalysisError, Result};
use regex::{Regex, RegexBuilder};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Predicate choosing which archive entries feed a pipeline
#[derive(Debug, Clone)]
pub enum EntrySelector {
    /// Entry name ends with the given suffix (e.g. `instrumentation.json`)
    Suffix(String),
    /// Entry name matches a case-insensitive pattern anchored at its start
    Pattern(Regex),
}

impl EntrySelector {
    /// Select entries whose names end with `suffix`
    pub fn suffix(suffix: &str) -> Self {
        Self::Suffix(suffix.to_string())
    }

    /// Select entries matching `pattern` (case-insensitive, anchored at the start)
    pub fn pattern(pattern: &str) -> Result<Self> {
        let regex = RegexBuilder::new(&format!("^(?:{})", pattern))
            .case_insensitive(true)
            .build()
            .map_err(|source| AnalysisError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
        Ok(Self::Pattern(regex))
    }

    /// Check whether an entry name is selected
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Suffix(suffix) => name.ends_with(suffix.as_str()),
            Self::Pattern(regex) => regex.is_match(name),
        }
    }
}

impl fmt::Display for EntrySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Suffix(suffix) => write!(f, "*{}", suffix),
            Self::Pattern(regex) => write!(f, "/{}/i", regex.as_str()),
        }
    }
}

/// Raw bytes of one selected archive entry
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Read-only view over a zip archive
pub struct ArchiveReader<R: Read + Seek = BufReader<File>> {
    path: PathBuf,
    archive: ZipArchive<R>,
}

impl ArchiveReader {
    /// Open an archive on disk
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| AnalysisError::Archive {
            path: path.to_path_buf(),
            source: zip::result::ZipError::Io(e),
        })?;
        Self::with_path(path.to_path_buf(), BufReader::new(file))
    }
}

impl<R: Read + Seek> ArchiveReader<R> {
    /// Wrap an in-memory or already-open archive
    pub fn from_reader(reader: R) -> Result<Self> {
        Self::with_path(PathBuf::from("<memory>"), reader)
    }

    fn with_path(path: PathBuf, reader: R) -> Result<Self> {
        let archive =
            ZipArchive::new(reader).map_err(|source| AnalysisError::Archive {
                path: path.clone(),
                source,
            })?;
        Ok(Self { path, archive })
    }

    /// Path the archive was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names of selected file entries, sorted
    pub fn entry_names(&self, selector: &EntrySelector) -> Vec<String> {
        let mut names: Vec<String> = self
            .archive
            .file_names()
            .filter(|name| !name.ends_with('/'))
            .filter(|name| selector.matches(name))
            .map(str::to_string)
            .collect();
        names.sort();
        names
    }

    /// Read one entry fully into memory
    ///
    /// A damaged entry is reported as a decode failure of that entry only.
    pub fn read_entry(&mut self, name: &str) -> Result<ArchiveEntry> {
        let decode_err = |reason: String| AnalysisError::Decode {
            entry: name.to_string(),
            reason,
        };

        let mut file = self
            .archive
            .by_name(name)
            .map_err(|e| decode_err(e.to_string()))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|e| decode_err(e.to_string()))?;

        Ok(ArchiveEntry {
            name: name.to_string(),
            bytes,
        })
    }

    /// Read every selected entry, in name order
    pub fn read_entries(&mut self, selector: &EntrySelector) -> Result<Vec<ArchiveEntry>> {
        self.entry_names(selector)
            .iter()
            .map(|name| self.read_entry(name))
            .collect()
    }
}
