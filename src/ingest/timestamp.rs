//! Tolerant timestamp parsing for delimited-text exports.
//!
//! Accepted layouts are tried in the order of [`TIMESTAMP_LAYOUTS`]; the first
//! one that parses wins.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// One accepted textual layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampLayout {
    /// ISO 8601 / RFC 3339 with an explicit offset (`...Z`, `...+02:00`)
    Rfc3339,
    /// Date-time with a numeric offset in `strftime` syntax (`+0200`, `+02:00`)
    Offset(&'static str),
    /// Naive date-time in `strftime` syntax, read in the configured zone
    Naive(&'static str),
}

/// Layouts in the order they are attempted.
pub const TIMESTAMP_LAYOUTS: &[TimestampLayout] = &[
    TimestampLayout::Rfc3339,
    TimestampLayout::Offset("%Y-%m-%dT%H:%M:%S%.f%z"),
    TimestampLayout::Offset("%Y-%m-%dT%H:%M%z"),
    TimestampLayout::Offset("%Y-%m-%d %H:%M:%S%.f%z"),
    TimestampLayout::Offset("%Y-%m-%d %H:%M%z"),
    TimestampLayout::Naive("%Y-%m-%dT%H:%M:%S%.f"),
    TimestampLayout::Naive("%Y-%m-%dT%H:%M"),
    TimestampLayout::Naive("%Y-%m-%d %H:%M:%S%.f"),
    TimestampLayout::Naive("%Y-%m-%d %H:%M"),
];

impl TimestampLayout {
    /// Parse `text` with this layout. Naive layouts are localized to `tz`.
    pub fn parse(&self, text: &str, tz: &Tz) -> Option<DateTime<Utc>> {
        match self {
            TimestampLayout::Rfc3339 => DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            TimestampLayout::Offset(fmt) => DateTime::parse_from_str(text, fmt)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            TimestampLayout::Naive(fmt) => {
                let naive = NaiveDateTime::parse_from_str(text, fmt).ok()?;
                // Nonexistent local times (DST gap) yield None
                tz.from_local_datetime(&naive)
                    .earliest()
                    .map(|dt| dt.with_timezone(&Utc))
            }
        }
    }
}

/// Parse a timestamp field, trying every accepted layout in order.
pub fn parse_timestamp(text: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    TIMESTAMP_LAYOUTS
        .iter()
        .find_map(|layout| layout.parse(text, tz))
}
