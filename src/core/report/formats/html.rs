//! HTML report generator
//!
//! Renders a self-contained page (inline CSS) through an askama template.

use crate::core::report::{Report, ReportGenerator, ReportTable};
use askama::Template;
use std::error::Error;

#[derive(Template)]
#[template(path = "report.html")]
struct HtmlPage<'a> {
    table: &'a ReportTable,
    version: &'a str,
}

/// HTML report generator
pub struct HtmlReporter;

impl HtmlReporter {
    /// Create a new HTML reporter
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for HtmlReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportGenerator for HtmlReporter {
    fn render(&self, report: &dyn Report) -> Result<String, Box<dyn Error>> {
        let table = ReportTable::from_report(report);
        let page = HtmlPage {
            table: &table,
            version: crate::core::get_version(),
        };
        Ok(page.render()?)
    }
}
