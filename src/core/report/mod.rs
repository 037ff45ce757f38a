//! Report output
//!
//! Every report assembled by [`crate::core::indices`] can be laid out as a
//! single table ([`TabularReport`]) and serialized as-is. The generators in
//! [`formats`] turn that into Markdown, HTML, JSON or CSV.

pub mod formats;

use serde::Serialize;
use std::error::Error;
use std::fs;
use std::path::Path;

pub use formats::{CsvReporter, HtmlReporter, JsonReporter, MarkdownReporter, ReportFormat};

/// A report that can be laid out as one table
pub trait TabularReport {
    /// Report title
    fn title(&self) -> String;

    /// Key/value lines shown above the table (cohort, program, filters)
    fn metadata(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Column headers
    fn header(&self) -> Vec<String>;

    /// Table body, one entry per row, aligned with [`header`](Self::header)
    fn rows(&self) -> Vec<Vec<String>>;

    /// Free-form lines shown below the table (totals, data issues)
    fn notes(&self) -> Vec<String> {
        Vec::new()
    }
}

/// A tabular report that also knows its structured (JSON) form
pub trait Report: TabularReport {
    /// Pretty-printed JSON of the full report
    ///
    /// # Errors
    /// Returns an error if serialization fails
    fn to_json(&self) -> serde_json::Result<String>;
}

impl<T: TabularReport + Serialize> Report for T {
    fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// A report flattened to strings, ready for a template
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportTable {
    /// Report title
    pub title: String,
    /// Key/value lines
    pub metadata: Vec<(String, String)>,
    /// Column headers
    pub header: Vec<String>,
    /// Body rows
    pub rows: Vec<Vec<String>>,
    /// Lines below the table
    pub notes: Vec<String>,
}

impl ReportTable {
    /// Flatten a report
    #[must_use]
    pub fn from_report(report: &dyn TabularReport) -> Self {
        Self {
            title: report.title(),
            metadata: report.metadata(),
            header: report.header(),
            rows: report.rows(),
            notes: report.notes(),
        }
    }
}

/// Trait for report generators
pub trait ReportGenerator {
    /// Generate a report to a file
    ///
    /// # Errors
    /// Returns an error if report generation or file writing fails
    fn generate(&self, report: &dyn Report, output_path: &Path) -> Result<(), Box<dyn Error>> {
        let content = self.render(report)?;
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(output_path, content)?;
        Ok(())
    }

    /// Generate report content as a string
    ///
    /// # Errors
    /// Returns an error if report generation fails
    fn render(&self, report: &dyn Report) -> Result<String, Box<dyn Error>>;
}

/// The generator for a format
#[must_use]
pub fn generator_for(format: ReportFormat) -> Box<dyn ReportGenerator> {
    match format {
        ReportFormat::Markdown => Box::new(MarkdownReporter::new()),
        ReportFormat::Html => Box::new(HtmlReporter::new()),
        ReportFormat::Json => Box::new(JsonReporter::new()),
        ReportFormat::Csv => Box::new(CsvReporter::new()),
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::sample;
    use super::*;

    #[test]
    fn table_flattens_report() {
        let table = ReportTable::from_report(&sample());
        assert_eq!(table.header, ["Period", "Total"]);
        assert_eq!(table.rows[1], ["20243", "2"]);
        assert_eq!(table.notes.len(), 1);
    }

    #[test]
    fn generate_writes_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("report.json");
        generator_for(ReportFormat::Json)
            .generate(&sample(), &path)
            .expect("generate");
        let written = fs::read_to_string(&path).expect("read");
        assert!(written.contains("\"20243\""));
    }
}
