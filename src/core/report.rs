//! Serializable analysis report.
//!
//! A report bundles the detected windows of one input with their summaries,
//! the configuration used and producer metadata. It is what the CLI prints
//! with `--json`, what `export` writes and what the server returns.

use crate::core::stats::WindowSummary;
use crate::core::windowing::{Window, WindowConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The current report format version.
pub const REPORT_VERSION: &str = "1.0";

/// The name of this producer.
pub const PRODUCER_NAME: &str = "heartrate-windows";

/// Producer metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// One detected window in a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowEntry {
    /// Position of the window in discovery order
    pub index: usize,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub sample_count: usize,
    /// `None` when no sample in the window has a reading
    pub summary: Option<WindowSummary>,
}

impl WindowEntry {
    fn new(index: usize, window: &Window) -> Self {
        Self {
            index,
            start: window.start(),
            end: window.end(),
            sample_count: window.len(),
            summary: window.summary(),
        }
    }
}

/// Result of analyzing one input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub report_version: String,
    pub report_id: String,
    pub producer: ReportProducer,
    pub generated_at: DateTime<Utc>,
    /// File name or other label of the analyzed input
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub config: WindowConfig,
    /// Samples read from the input, before detection
    pub sample_count: usize,
    pub window_count: usize,
    pub windows: Vec<WindowEntry>,
    /// Summary of the most recent window
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest: Option<WindowEntry>,
}

impl AnalysisReport {
    /// Check whether any window was found.
    pub fn has_windows(&self) -> bool {
        self.window_count > 0
    }
}

/// Builder for analysis reports.
pub struct ReportBuilder {
    instance_id: Uuid,
}

impl ReportBuilder {
    /// Create a new builder with a fresh instance id.
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4(),
        }
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Build a report for the windows detected in one input.
    pub fn build(
        &self,
        source: Option<&str>,
        sample_count: usize,
        config: &WindowConfig,
        windows: &[Window],
    ) -> AnalysisReport {
        let entries: Vec<WindowEntry> = windows
            .iter()
            .enumerate()
            .map(|(i, w)| WindowEntry::new(i, w))
            .collect();
        let latest = entries.last().cloned();

        AnalysisReport {
            report_version: REPORT_VERSION.to_string(),
            report_id: Uuid::new_v4().to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: crate::VERSION.to_string(),
                instance_id: self.instance_id.to_string(),
            },
            generated_at: Utc::now(),
            source: source.map(str::to_string),
            config: *config,
            sample_count,
            window_count: entries.len(),
            windows: entries,
            latest,
        }
    }
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}
