//! heartrate-windows - fixed-cadence window detection for heart-rate exports.
//!
//! This library reads heart-rate time series exported by wearables and finds
//! every stretch that forms a valid fixed-cadence window: samples spanning
//! exactly a target duration at an exact target step, with no gaps, no
//! duplicates and no reordering.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      heartrate-windows                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐         │
//! │  │   Ingest    │──▶│  Windowing  │──▶│    Stats    │         │
//! │  │ (csv/json)  │   │ (detector)  │   │ (min/max/μ) │         │
//! │  └─────────────┘   └─────────────┘   └─────────────┘         │
//! │                           │                 │                │
//! │                           ▼                 ▼                │
//! │                    ┌─────────────────────────────┐           │
//! │                    │       Analysis Report       │           │
//! │                    └─────────────────────────────┘           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use heartrate_windows::{detect_windows, normalize, SourceFormat, WindowConfig};
//!
//! let csv = b"timestamp,heartrate\n2024-01-01 10:00:00,62\n2024-01-01 10:02:00,64\n";
//! let samples = normalize(csv, SourceFormat::DelimitedText).unwrap();
//!
//! let config = WindowConfig::from_secs(120, 120).unwrap();
//! let windows = detect_windows(&samples, &config);
//! assert_eq!(windows.len(), 1);
//! assert_eq!(windows[0].summary().unwrap().max, 64.0);
//! ```

pub mod config;
pub mod core;
pub mod ingest;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use core::{
    detect_windows, summarize, AnalysisReport, ReportBuilder, Window, WindowConfig,
    WindowConfigError, WindowDetector, WindowSummary,
};
pub use ingest::{normalize, NormalizeError, Normalizer, NormalizerConfig, Sample, SampleStream, SourceFormat};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
