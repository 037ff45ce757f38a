//! Cohort listing command handler

use super::{emit, fail, load_store, parse_period, run_context};
use crate::args::{CohortArgs, OutputArgs};
use cohort_analytics::config::Config;
use cohort_analytics::core::indices::cohort_listing;
use cohort_analytics::core::models::ProgramScope;

/// Run the cohort command.
pub fn run(cohort: &CohortArgs, output: &OutputArgs, config: &Config) {
    if let Err(err) = list(cohort, output, config) {
        fail("cohort", &err);
    }
}

fn list(cohort: &CohortArgs, output: &OutputArgs, config: &Config) -> Result<(), String> {
    let entry = parse_period(&cohort.cohort)?;
    let scope = ProgramScope::parse(Some(&cohort.program));

    let store = load_store(config)?;
    let ctx = run_context(format!("cohort {entry} {scope}"), config);
    let listing = cohort_listing(&store, &ctx, entry, cohort.filter(), scope)
        .map_err(|e| format!("✗ {e}"))?;

    emit(&listing, output, config, &format!("cohort_{entry}_{}", cohort.program))
}
