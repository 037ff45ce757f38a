//! Integration smoke tests for `cohort_analytics`

use cohort_analytics::core::report::{generator_for, ReportFormat};
use cohort_analytics::get_version;

mod common;

#[test]
fn version_is_not_empty() {
    let v = get_version();
    assert!(!v.trim().is_empty());
}

#[test]
fn sample_report_renders_in_every_format() {
    let report = common::retention_report();
    for format in [
        ReportFormat::Markdown,
        ReportFormat::Html,
        ReportFormat::Json,
        ReportFormat::Csv,
    ] {
        let rendered = generator_for(format).render(&report).expect("render");
        assert!(rendered.contains("20241"), "{format} output lacks the last term");
    }
}
