//! Fixed-cadence window detection.
//!
//! A window is a run of samples spanning exactly `duration`, with consecutive
//! timestamps exactly `step` apart. Anything early, late, missing or repeated
//! breaks the run; there is no tolerance band.

use crate::core::stats::{summarize, WindowSummary};
use crate::ingest::Sample;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Default span of a window (2 hours).
pub const DEFAULT_WINDOW_SECS: u64 = 2 * 60 * 60;

/// Default spacing between samples (2 minutes).
pub const DEFAULT_STEP_SECS: u64 = 2 * 60;

/// Validated detector configuration.
///
/// `duration` and `step` are positive whole seconds and `duration` is an
/// exact multiple of `step`. Values that break this cannot be constructed or
/// deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawWindowConfig", into = "RawWindowConfig")]
pub struct WindowConfig {
    duration: Duration,
    step: Duration,
}

impl WindowConfig {
    /// Create a configuration, validating both durations.
    pub fn new(
        duration: std::time::Duration,
        step: std::time::Duration,
    ) -> Result<Self, WindowConfigError> {
        if duration.is_zero() {
            return Err(WindowConfigError::NonPositive("duration"));
        }
        if step.is_zero() {
            return Err(WindowConfigError::NonPositive("step"));
        }
        if duration.subsec_nanos() != 0 {
            return Err(WindowConfigError::FractionalSeconds("duration"));
        }
        if step.subsec_nanos() != 0 {
            return Err(WindowConfigError::FractionalSeconds("step"));
        }
        if duration.as_secs() % step.as_secs() != 0 {
            return Err(WindowConfigError::NotMultiple { duration, step });
        }

        let to_chrono = |d: std::time::Duration, name: &'static str| {
            Duration::from_std(d).map_err(|_| WindowConfigError::OutOfRange(name))
        };

        Ok(Self {
            duration: to_chrono(duration, "duration")?,
            step: to_chrono(step, "step")?,
        })
    }

    /// Create a configuration from whole seconds.
    pub fn from_secs(duration_secs: u64, step_secs: u64) -> Result<Self, WindowConfigError> {
        Self::new(
            std::time::Duration::from_secs(duration_secs),
            std::time::Duration::from_secs(step_secs),
        )
    }

    /// Total span a window must cover.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Exact spacing between consecutive samples.
    pub fn step(&self) -> Duration {
        self.step
    }

    /// Number of samples in every valid window.
    pub fn samples_per_window(&self) -> usize {
        let steps = self.duration.num_nanoseconds().unwrap_or(i64::MAX)
            / self.step.num_nanoseconds().unwrap_or(i64::MAX);
        steps as usize + 1
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            duration: Duration::seconds(DEFAULT_WINDOW_SECS as i64),
            step: Duration::seconds(DEFAULT_STEP_SECS as i64),
        }
    }
}

/// Unvalidated on-disk form of [`WindowConfig`], in whole seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawWindowConfig {
    pub duration_secs: u64,
    pub step_secs: u64,
}

impl TryFrom<RawWindowConfig> for WindowConfig {
    type Error = WindowConfigError;

    fn try_from(raw: RawWindowConfig) -> Result<Self, Self::Error> {
        WindowConfig::from_secs(raw.duration_secs, raw.step_secs)
    }
}

impl From<WindowConfig> for RawWindowConfig {
    fn from(config: WindowConfig) -> Self {
        Self {
            duration_secs: config.duration.num_seconds() as u64,
            step_secs: config.step.num_seconds() as u64,
        }
    }
}

/// Invalid detector configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowConfigError {
    /// The named duration is zero
    NonPositive(&'static str),
    /// The named duration is not a whole number of seconds
    FractionalSeconds(&'static str),
    /// `duration` is not an integer multiple of `step`
    NotMultiple {
        duration: std::time::Duration,
        step: std::time::Duration,
    },
    /// The named duration does not fit a timestamp offset
    OutOfRange(&'static str),
}

impl std::fmt::Display for WindowConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WindowConfigError::NonPositive(name) => write!(f, "{name} must be positive"),
            WindowConfigError::FractionalSeconds(name) => {
                write!(f, "{name} must be a whole number of seconds")
            }
            WindowConfigError::NotMultiple { duration, step } => write!(
                f,
                "duration {}s is not a multiple of step {}s",
                duration.as_secs_f64(),
                step.as_secs_f64()
            ),
            WindowConfigError::OutOfRange(name) => write!(f, "{name} is out of range"),
        }
    }
}

impl std::error::Error for WindowConfigError {}

/// A detected fixed-cadence window.
///
/// Always non-empty; consecutive timestamps differ by exactly the configured
/// step and the last minus the first equals the configured duration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Window {
    /// Index of the first sample in the sorted stream
    start_index: usize,
    /// Samples in ascending timestamp order
    samples: Vec<Sample>,
}

impl Window {
    /// Index of the first sample within the sorted input.
    pub fn start_index(&self) -> usize {
        self.start_index
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Timestamp of the first sample.
    pub fn start(&self) -> DateTime<Utc> {
        self.samples[0].timestamp
    }

    /// Timestamp of the last sample.
    pub fn end(&self) -> DateTime<Utc> {
        self.samples[self.samples.len() - 1].timestamp
    }

    pub fn duration(&self) -> Duration {
        self.end() - self.start()
    }

    /// Check if a timestamp falls within this window (inclusive at both ends).
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.start() && timestamp <= self.end()
    }

    /// Readings that are present, in order.
    pub fn present_values(&self) -> Vec<f64> {
        self.samples.iter().filter_map(|s| s.value).collect()
    }

    /// Number of samples without a reading.
    pub fn absent_count(&self) -> usize {
        self.samples.iter().filter(|s| s.value.is_none()).count()
    }

    /// Ordered `(timestamp, value)` series for plotting.
    ///
    /// Absent readings stay `None` so a renderer can show the dropout.
    pub fn series(&self) -> Vec<(DateTime<Utc>, Option<f64>)> {
        self.samples.iter().map(|s| (s.timestamp, s.value)).collect()
    }

    /// Min/max/mean over present readings.
    pub fn summary(&self) -> Option<WindowSummary> {
        summarize(self)
    }
}

/// Scans sample streams for fixed-cadence windows.
#[derive(Debug, Clone, Default)]
pub struct WindowDetector {
    config: WindowConfig,
}

impl WindowDetector {
    pub fn new(config: WindowConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// Detect all windows in `samples`. See [`detect_windows`].
    pub fn detect(&self, samples: &[Sample]) -> Vec<Window> {
        detect_windows(samples, &self.config)
    }
}

/// Find every maximal fixed-cadence window in a sample stream.
///
/// The input need not be sorted: a copy is stable-sorted by timestamp, so
/// samples sharing a timestamp keep their input order. A candidate starting
/// at index `i` is walked forward while each timestamp equals the expected
/// one. On success the scan resumes after the window; on failure it retries
/// from `i + 1`.
///
/// A repeated timestamp never satisfies the next expected step, so it always
/// breaks the candidate holding its predecessor.
pub fn detect_windows(samples: &[Sample], config: &WindowConfig) -> Vec<Window> {
    if samples.is_empty() {
        return Vec::new();
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by_key(|s| s.timestamp);

    let mut windows = Vec::new();
    let mut cursor = 0;

    while cursor < sorted.len() {
        match walk_candidate(&sorted, cursor, config) {
            Some(end) => {
                windows.push(Window {
                    start_index: cursor,
                    samples: sorted[cursor..end].to_vec(),
                });
                cursor = end;
            }
            None => cursor += 1,
        }
    }

    tracing::debug!(
        samples = sorted.len(),
        windows = windows.len(),
        "window detection complete"
    );
    windows
}

/// Walk a candidate starting at `start`. Returns the exclusive end index if
/// the candidate covers the full duration.
fn walk_candidate(sorted: &[Sample], start: usize, config: &WindowConfig) -> Option<usize> {
    let start_ts = sorted[start].timestamp;
    let end_ts = start_ts.checked_add_signed(config.duration)?;

    let mut expected = Some(start_ts);
    let mut last_accepted = None;
    let mut idx = start;

    while let Some(want) = expected {
        let Some(sample) = sorted.get(idx) else { break };
        if sample.timestamp > end_ts || sample.timestamp != want {
            break;
        }
        last_accepted = Some(want);
        idx += 1;
        expected = want.checked_add_signed(config.step);
    }

    (last_accepted == Some(end_ts)).then_some(idx)
}
