//! Core functionality for heart-rate window analysis.
//!
//! This module contains:
//! - Fixed-cadence window detection over sample streams
//! - Summary statistics for detected windows
//! - Report building for export

pub mod report;
pub mod stats;
pub mod windowing;

// Re-export commonly used types
pub use report::{AnalysisReport, ReportBuilder, WindowEntry, PRODUCER_NAME, REPORT_VERSION};
pub use stats::{summarize, WindowSummary};
pub use windowing::{
    detect_windows, Window, WindowConfig, WindowConfigError, WindowDetector, DEFAULT_STEP_SECS,
    DEFAULT_WINDOW_SECS,
};
