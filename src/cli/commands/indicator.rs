//! Indicator command handler

use super::{emit, fail, load_store, parse_period, run_context};
use crate::args::{CohortArgs, OutputArgs};
use cohort_analytics::config::Config;
use cohort_analytics::core::indices::{
    run_indicator, AccumulationMode, IndicatorKind, IndicatorRequest, Pipeline,
};
use cohort_analytics::core::models::ProgramScope;
use cohort_analytics::verbose;
use std::str::FromStr;

/// Run the indicator command.
pub fn run(
    kind: &str,
    cohort: &CohortArgs,
    terms: Option<i64>,
    accumulation: Option<&str>,
    output: &OutputArgs,
    config: &Config,
) {
    if let Err(err) = indicator(kind, cohort, terms, accumulation, output, config) {
        fail("indicator", &err);
    }
}

fn indicator(
    kind: &str,
    cohort: &CohortArgs,
    terms: Option<i64>,
    accumulation: Option<&str>,
    output: &OutputArgs,
    config: &Config,
) -> Result<(), String> {
    let kind = IndicatorKind::from_str(kind)
        .map_err(|e| format!("✗ {e}. Use: retention, graduation, degree, or attrition"))?;
    let mut pipeline = Pipeline::new(kind);
    if let Some(mode) = accumulation {
        let mode = AccumulationMode::from_str(mode)
            .map_err(|e| format!("✗ {e}. Use: point, running, or summed"))?;
        pipeline = pipeline.with_accumulation(mode);
    }

    let request = IndicatorRequest {
        cohort: parse_period(&cohort.cohort)?,
        terms: terms.unwrap_or(config.analytics.terms),
        scope: ProgramScope::parse(Some(&cohort.program)),
        filter: cohort.filter(),
        pipeline,
        policy: config.analytics.attrition_policy,
    };

    let store = load_store(config)?;
    let ctx = run_context(
        format!("{} {} {}", kind.title().to_lowercase(), request.cohort, request.scope),
        config,
    );
    let report = run_indicator(&store, &ctx, &request).map_err(|e| format!("✗ {e}"))?;
    verbose!(
        "{} members, final {} rate {}",
        report.size,
        kind.title().to_lowercase(),
        report.final_rate.percent_label()
    );

    let stem = format!(
        "{}_{}_{}",
        kind.title().to_lowercase().replace(' ', "_"),
        request.cohort,
        cohort.program
    );
    emit(&report, output, config, &stem)
}
