//! CSV report generator
//!
//! Writes the header and body rows only; title, metadata and notes have no
//! place in a CSV file.

use crate::core::report::{Report, ReportGenerator};
use std::error::Error;

/// CSV report generator
pub struct CsvReporter;

impl CsvReporter {
    /// Create a new CSV reporter
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for CsvReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportGenerator for CsvReporter {
    fn render(&self, report: &dyn Report) -> Result<String, Box<dyn Error>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(report.header())?;
        for row in report.rows() {
            writer.write_record(row)?;
        }
        let bytes = writer.into_inner().map_err(|e| e.to_string())?;
        Ok(String::from_utf8(bytes)?)
    }
}
