//! Sample normalization for heart-rate exports.
//!
//! Converts the raw bytes of one uploaded file into a flat [`SampleStream`].
//! Two encodings are recognized, selected by file extension:
//! - `.csv`: delimited `timestamp,value` rows
//! - `.json`: a list of records holding `[epochMillis, value]` pairs

pub mod delimited;
pub mod structured;
pub mod timestamp;
pub mod types;

// Re-export commonly used types
pub use delimited::{classify_row, RowOutcome, SkipReason};
pub use structured::DEFAULT_SERIES_FIELD;
pub use timestamp::{parse_timestamp, TimestampLayout, TIMESTAMP_LAYOUTS};
pub use types::{NormalizeError, Sample, SampleStream, SourceFormat};

use chrono_tz::Tz;

/// Settings that affect how input files are read.
#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    /// Zone used to interpret timestamps that carry no offset
    pub timezone: Tz,
    /// Name of the pair list inside structured records
    pub series_field: String,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            timezone: Tz::UTC,
            series_field: DEFAULT_SERIES_FIELD.to_string(),
        }
    }
}

/// Reads uploaded files into sample streams.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    config: NormalizerConfig,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Normalize a payload of a known format.
    pub fn normalize(&self, bytes: &[u8], format: SourceFormat) -> Result<SampleStream, NormalizeError> {
        match format {
            SourceFormat::DelimitedText => delimited::parse_delimited(bytes, &self.config.timezone),
            SourceFormat::Structured => {
                structured::parse_structured(bytes, &self.config.series_field)
            }
        }
    }

    /// Normalize a payload, deriving its format from the file name.
    pub fn normalize_file(&self, filename: &str, bytes: &[u8]) -> Result<SampleStream, NormalizeError> {
        let format = SourceFormat::from_filename(filename)?;
        self.normalize(bytes, format)
    }
}

/// Normalize a payload with default settings (UTC, `heartRateValues`).
pub fn normalize(bytes: &[u8], format: SourceFormat) -> Result<SampleStream, NormalizeError> {
    Normalizer::default().normalize(bytes, format)
}
