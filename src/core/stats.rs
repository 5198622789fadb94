//! Summary statistics over a detected window.
//!
//! Validity of a window is timestamp-based, so a window may contain samples
//! without a reading. Those are excluded from every reduction.

use crate::core::windowing::Window;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Min/max/mean of a window's present readings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Samples that contributed to the reduction
    pub present_count: usize,
    /// Samples skipped for lack of a reading
    pub absent_count: usize,
}

/// Summarize a window. Returns `None` when no sample has a reading.
pub fn summarize(window: &Window) -> Option<WindowSummary> {
    let values = window.present_values();
    if values.is_empty() {
        return None;
    }

    Some(WindowSummary {
        min: Statistics::min(&values),
        max: Statistics::max(&values),
        mean: Statistics::mean(&values),
        present_count: values.len(),
        absent_count: window.absent_count(),
    })
}
