//! JSON report generator

use crate::core::report::{Report, ReportGenerator};
use std::error::Error;

/// Emits the full report structure, not just the flattened table
pub struct JsonReporter;

impl JsonReporter {
    /// Create a new JSON reporter
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportGenerator for JsonReporter {
    fn render(&self, report: &dyn Report) -> Result<String, Box<dyn Error>> {
        Ok(report.to_json()?)
    }
}
