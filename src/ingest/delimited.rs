//! Delimited-text (`.csv`) exports.
//!
//! Each row is `timestamp, value[, ...]`. Rows that cannot describe a reading
//! are skipped rather than failing the whole file; only a payload the CSV
//! reader cannot frame at all is fatal.

use crate::ingest::timestamp::parse_timestamp;
use crate::ingest::types::{NormalizeError, Sample, SampleStream};
use chrono_tz::Tz;
use csv::{ReaderBuilder, StringRecord, Trim};

/// Timestamp-column labels that mark a header row.
const HEADER_LABELS: &[&str] = &["timestamp", "time"];

/// Why a row was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Fewer than two fields
    TooFewFields,
    /// The timestamp field is blank
    EmptyTimestamp,
    /// The row looks like a header
    Header,
    /// The timestamp matched none of the accepted layouts
    UnparsableTimestamp,
}

/// Classification of a single row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Skip(SkipReason),
    Sample(Sample),
    Fatal(NormalizeError),
}

/// Classify one row read from the input.
pub fn classify_row(row: Result<StringRecord, csv::Error>, tz: &Tz) -> RowOutcome {
    let record = match row {
        Ok(record) => record,
        Err(e) => return RowOutcome::Fatal(NormalizeError::Parse(e.to_string())),
    };

    if record.len() < 2 {
        return RowOutcome::Skip(SkipReason::TooFewFields);
    }

    let ts_field = record.get(0).unwrap_or_default();
    let value_field = record.get(1).unwrap_or_default();

    if ts_field.is_empty() {
        return RowOutcome::Skip(SkipReason::EmptyTimestamp);
    }
    if HEADER_LABELS
        .iter()
        .any(|label| ts_field.eq_ignore_ascii_case(label))
    {
        return RowOutcome::Skip(SkipReason::Header);
    }

    let Some(timestamp) = parse_timestamp(ts_field, tz) else {
        return RowOutcome::Skip(SkipReason::UnparsableTimestamp);
    };

    RowOutcome::Sample(Sample::new(timestamp, parse_value(value_field)))
}

/// Parse a reading. Blank, garbled and non-finite values are absent.
fn parse_value(field: &str) -> Option<f64> {
    if field.is_empty() {
        return None;
    }
    field.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a whole delimited-text payload.
pub fn parse_delimited(bytes: &[u8], tz: &Tz) -> Result<SampleStream, NormalizeError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| NormalizeError::Parse(format!("input is not valid UTF-8: {e}")))?;

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut samples = Vec::new();
    let mut skipped = 0usize;

    for row in reader.records() {
        match classify_row(row, tz) {
            RowOutcome::Sample(sample) => samples.push(sample),
            RowOutcome::Skip(reason) => {
                tracing::trace!(?reason, "skipping row");
                skipped += 1;
            }
            RowOutcome::Fatal(e) => return Err(e),
        }
    }

    tracing::debug!(samples = samples.len(), skipped, "parsed delimited text");
    Ok(samples)
}
