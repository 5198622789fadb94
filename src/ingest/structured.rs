//! Structured (`.json`) exports.
//!
//! The payload is a list of records; each record may carry a named list of
//! `[epochMillis, value]` pairs. Records without the list contribute nothing.

use crate::ingest::types::{NormalizeError, Sample, SampleStream};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Default name of the nested pair list.
pub const DEFAULT_SERIES_FIELD: &str = "heartRateValues";

/// A reading as it appears in a pair: a JSON number or a numeric string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Reading {
    Number(f64),
    Text(String),
}

impl Reading {
    fn to_f64(&self) -> Result<f64, NormalizeError> {
        match self {
            Reading::Number(value) => Ok(*value),
            Reading::Text(text) => text
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| NormalizeError::Parse(format!("reading '{text}' is not a number"))),
        }
    }
}

/// Parse a whole structured payload.
pub fn parse_structured(bytes: &[u8], series_field: &str) -> Result<SampleStream, NormalizeError> {
    let records: Vec<Map<String, Value>> = serde_json::from_slice(bytes).map_err(|e| {
        NormalizeError::Parse(format!("expected a list of records: {e}"))
    })?;

    let mut samples = Vec::new();
    for (index, record) in records.iter().enumerate() {
        let pairs = match record.get(series_field) {
            None | Some(Value::Null) => continue,
            Some(value) => value,
        };

        let pairs: Vec<(f64, Option<Reading>)> = serde_json::from_value(pairs.clone()).map_err(|e| {
            NormalizeError::Parse(format!(
                "record {index}: '{series_field}' is not a list of [epochMillis, value] pairs: {e}"
            ))
        })?;

        for (epoch_ms, value) in pairs {
            // Pairs without a reading are dropped
            let Some(value) = value else { continue };
            samples.push(Sample::new(from_epoch_millis(epoch_ms)?, Some(value.to_f64()?)));
        }
    }

    tracing::debug!(
        records = records.len(),
        samples = samples.len(),
        "parsed structured payload"
    );
    Ok(samples)
}

/// Convert fractional epoch milliseconds to an instant, keeping sub-millisecond
/// precision down to the nanosecond.
fn from_epoch_millis(epoch_ms: f64) -> Result<DateTime<Utc>, NormalizeError> {
    if !epoch_ms.is_finite() {
        return Err(NormalizeError::Parse(format!(
            "epoch timestamp {epoch_ms} is not finite"
        )));
    }

    let secs = (epoch_ms / 1000.0).floor();
    let rem_ms = epoch_ms - secs * 1000.0;
    let nanos = ((rem_ms * 1_000_000.0).round() as u32).min(999_999_999);

    if secs < i64::MIN as f64 || secs > i64::MAX as f64 {
        return Err(NormalizeError::Parse(format!(
            "epoch timestamp {epoch_ms} is out of range"
        )));
    }

    DateTime::<Utc>::from_timestamp(secs as i64, nanos).ok_or_else(|| {
        NormalizeError::Parse(format!("epoch timestamp {epoch_ms} is out of range"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_pairs_become_samples() {
        let input = br#"[
            {"calendarDate": "2024-01-01", "heartRateValues": [[1704103200000, 61], [1704103320000, 63.5]]},
            {"heartRateValues": [[1704103440000, 65]]}
        ]"#;
        let samples = parse_structured(input, DEFAULT_SERIES_FIELD).unwrap();

        assert_eq!(samples.len(), 3);
        assert_eq!(
            samples[0].timestamp,
            Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
        );
        assert_eq!(samples[0].value, Some(61.0));
        assert_eq!(samples[1].value, Some(63.5));
        assert_eq!(samples[2].timestamp - samples[1].timestamp, Duration::minutes(2));
    }

    #[test]
    fn test_records_without_series_are_empty() {
        let input = br#"[{"restingHeartRate": 55}, {"heartRateValues": null}, {}]"#;
        let samples = parse_structured(input, DEFAULT_SERIES_FIELD).unwrap();
        assert!(samples.is_empty());
    }

    #[test]
    fn test_null_values_dropped() {
        let input = br#"[{"heartRateValues": [[1704103200000, null], [1704103320000, 70]]}]"#;
        let samples = parse_structured(input, DEFAULT_SERIES_FIELD).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].value, Some(70.0));
    }

    #[test]
    fn test_numeric_string_values() {
        let input = br#"[{"heartRateValues": [[1704103200000, "72"], [1704103320000, " 73.5 "]]}]"#;
        let samples = parse_structured(input, DEFAULT_SERIES_FIELD).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].value, Some(72.0));
        assert_eq!(samples[1].value, Some(73.5));
    }

    #[test]
    fn test_non_numeric_string_value() {
        for reading in ["high", "NaN", ""] {
            let input = format!(r#"[{{"heartRateValues": [[1704103200000, "{reading}"]]}}]"#);
            assert!(matches!(
                parse_structured(input.as_bytes(), DEFAULT_SERIES_FIELD),
                Err(NormalizeError::Parse(_))
            ));
        }
    }

    #[test]
    fn test_fractional_epoch() {
        let input = br#"[{"heartRateValues": [[1704103200000.5, 70]]}]"#;
        let samples = parse_structured(input, DEFAULT_SERIES_FIELD).unwrap();
        assert_eq!(
            samples[0].timestamp,
            Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap() + Duration::microseconds(500)
        );
    }

    #[test]
    fn test_custom_series_field() {
        let input = br#"[{"bpm": [[0, 80]]}]"#;
        let samples = parse_structured(input, "bpm").unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].timestamp, DateTime::<Utc>::from_timestamp(0, 0).unwrap());
    }

    #[test]
    fn test_malformed_top_level() {
        let inputs: [&[u8]; 3] = [br#"{"heartRateValues": []}"#, b"[1, 2, 3]", b"not json"];
        for input in inputs {
            assert!(matches!(
                parse_structured(input, DEFAULT_SERIES_FIELD),
                Err(NormalizeError::Parse(_))
            ));
        }
    }

    #[test]
    fn test_malformed_pairs() {
        let input = br#"[{"heartRateValues": [[1704103200000, 61, 5]]}]"#;
        assert!(parse_structured(input, DEFAULT_SERIES_FIELD).is_err());

        let input = br#"[{"heartRateValues": "none"}]"#;
        assert!(parse_structured(input, DEFAULT_SERIES_FIELD).is_err());
    }
}
