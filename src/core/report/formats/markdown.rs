//! Markdown report generator
//!
//! Renders the report table as GitHub-flavored Markdown. This is also what
//! the CLI prints when no output file is given.

use crate::core::report::{Report, ReportGenerator, ReportTable};
use std::error::Error;
use std::fmt::Write;

/// Embedded Markdown report template
const MARKDOWN_TEMPLATE: &str = include_str!("../templates/report.md");

/// Markdown report generator
pub struct MarkdownReporter;

impl MarkdownReporter {
    /// Create a new Markdown reporter
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Render the report using template substitution
    #[allow(clippy::unused_self)]
    fn render_template(&self, table: &ReportTable) -> String {
        let mut output = MARKDOWN_TEMPLATE.to_string();

        output = output.replace("{{title}}", &table.title);
        output = output.replace("{{metadata}}", &Self::generate_metadata(table));
        output = output.replace("{{table}}", &Self::generate_table(table));
        output = output.replace("{{notes}}", &Self::generate_notes(table));
        output = output.replace("{{version}}", crate::core::get_version());

        output
    }

    fn generate_metadata(table: &ReportTable) -> String {
        let mut block = String::new();
        for (key, value) in &table.metadata {
            let _ = writeln!(block, "- **{key}:** {value}");
        }
        block
    }

    /// Generate the body table
    fn generate_table(table: &ReportTable) -> String {
        let mut block = String::new();
        if table.header.is_empty() {
            return block;
        }

        let _ = writeln!(block, "| {} |", table.header.join(" | "));
        let _ = writeln!(block, "|{}", "---|".repeat(table.header.len()));
        for row in &table.rows {
            let cells: Vec<String> = row.iter().map(|c| escape_cell(c)).collect();
            let _ = writeln!(block, "| {} |", cells.join(" | "));
        }
        block
    }

    fn generate_notes(table: &ReportTable) -> String {
        let mut block = String::new();
        for note in &table.notes {
            let _ = writeln!(block, "> {note}");
        }
        block
    }
}

fn escape_cell(cell: &str) -> String {
    cell.replace('|', "\\|")
}

impl Default for MarkdownReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportGenerator for MarkdownReporter {
    fn render(&self, report: &dyn Report) -> Result<String, Box<dyn Error>> {
        Ok(self.render_template(&ReportTable::from_report(report)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::report::test_support::sample;

    #[test]
    fn renders_pipe_table() {
        let out = MarkdownReporter::new().render(&sample()).expect("render");
        assert!(out.starts_with("# Sample <report>"));
        assert!(out.contains("- **Cohort:** 20241"));
        assert!(out.contains("| Period | Total |\n|---|---|\n| 20241 | 3 |\n| 20243 | 2 |"));
        assert!(out.contains("> 1 data issue"));
        assert!(!out.contains("{{"));
    }
}
