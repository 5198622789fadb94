//! Canonical sample types produced by the normalizer.
//!
//! Every input encoding is reduced to a flat list of [`Sample`]s. Ordering is
//! whatever the source file had; sorting belongs to the window detector.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A single heart-rate reading.
///
/// The timestamp is always present. The value is `None` when the source row
/// had no usable reading (sensor dropout, blank or garbled field).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// When the reading was taken
    pub timestamp: DateTime<Utc>,
    /// Beats per minute, if the source provided a usable number
    pub value: Option<f64>,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, value: Option<f64>) -> Self {
        Self { timestamp, value }
    }

    /// Check whether this sample carries a reading.
    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }
}

/// Samples in source order.
pub type SampleStream = Vec<Sample>;

/// Recognized input encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// `timestamp,value[,...]` rows (`.csv`)
    DelimitedText,
    /// List of records holding `[epochMillis, value]` pairs (`.json`)
    Structured,
}

impl SourceFormat {
    /// Determine the format from a file name extension (case-insensitive).
    pub fn from_filename(name: &str) -> Result<Self, NormalizeError> {
        let lower = name.trim().to_lowercase();
        if lower.ends_with(".csv") {
            Ok(SourceFormat::DelimitedText)
        } else if lower.ends_with(".json") {
            Ok(SourceFormat::Structured)
        } else {
            Err(NormalizeError::UnsupportedFormat(name.to_string()))
        }
    }

    /// Determine the format from a path.
    pub fn from_path(path: &Path) -> Result<Self, NormalizeError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_filename(&name)
    }

    /// Canonical file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            SourceFormat::DelimitedText => "csv",
            SourceFormat::Structured => "json",
        }
    }
}

/// Errors that abort normalization of a single input.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizeError {
    /// The file name does not carry a recognized extension
    UnsupportedFormat(String),
    /// The payload is structurally invalid for its declared format
    Parse(String),
}

impl std::fmt::Display for NormalizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NormalizeError::UnsupportedFormat(name) => {
                write!(f, "Unsupported file type: {name}")
            }
            NormalizeError::Parse(e) => write!(f, "Parse error: {e}"),
        }
    }
}

impl std::error::Error for NormalizeError {}
