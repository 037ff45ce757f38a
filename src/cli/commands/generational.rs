//! Generational report command handler

use super::{emit, fail, load_store, parse_period, run_context, scheduler};
use crate::args::{filter_from, OutputArgs};
use cohort_analytics::config::Config;
use cohort_analytics::core::indices::{generational, GenerationalKind, GenerationalRequest};
use std::str::FromStr;

/// Arguments of the generational command
pub struct GenerationalArgs<'a> {
    /// graduation or degree
    pub kind: &'a str,
    /// Entry term
    pub cohort: &'a str,
    /// Semesters to walk
    pub terms: i64,
    /// First-time admissions
    pub new_admission: bool,
    /// Transfers and equivalencies
    pub transfer: bool,
}

/// Run the generational command.
pub fn run(args: &GenerationalArgs<'_>, output: &OutputArgs, config: &Config) {
    if let Err(err) = report(args, output, config) {
        fail("generational", &err);
    }
}

fn report(args: &GenerationalArgs<'_>, output: &OutputArgs, config: &Config) -> Result<(), String> {
    let kind = GenerationalKind::from_str(args.kind)
        .map_err(|e| format!("✗ {e}. Use: graduation or degree"))?;
    let request = GenerationalRequest {
        cohort: parse_period(args.cohort)?,
        terms: args.terms,
        filter: filter_from(args.new_admission, args.transfer),
        kind,
    };

    let store = load_store(config)?;
    let pool = scheduler(config)?;
    let ctx = run_context(format!("generational {} {}", args.kind, request.cohort), config);
    let report = generational(&store, &ctx, &pool, &request).map_err(|e| format!("✗ {e}"))?;

    let stem = format!("generational_{}_{}", args.kind, request.cohort);
    emit(&report, output, config, &stem)
}
