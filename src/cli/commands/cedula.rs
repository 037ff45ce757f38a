//! Accreditation table command handler

use super::{emit, fail, load_store, parse_period, run_context, scheduler};
use crate::args::{CohortArgs, OutputArgs};
use cohort_analytics::config::Config;
use cohort_analytics::core::indices::{caceca, cacei, CedulaRequest};
use cohort_analytics::core::models::ProgramScope;

/// Run the cedula command.
pub fn run(kind: &str, cohort: &CohortArgs, generations: usize, output: &OutputArgs, config: &Config) {
    if let Err(err) = cedula(kind, cohort, generations, output, config) {
        fail("cedula", &err);
    }
}

fn cedula(
    kind: &str,
    cohort: &CohortArgs,
    generations: usize,
    output: &OutputArgs,
    config: &Config,
) -> Result<(), String> {
    let program = match ProgramScope::parse(Some(&cohort.program)) {
        ProgramScope::Program(key) => key,
        ProgramScope::All => {
            return Err("✗ Accreditation tables need a single --program".to_string());
        }
    };
    let mut request = CedulaRequest::new(
        parse_period(&cohort.cohort)?,
        program.clone(),
        cohort.filter(),
    );
    request.generations = generations;

    let store = load_store(config)?;
    let pool = scheduler(config)?;
    let ctx = run_context(format!("{kind} {} {program}", request.cohort), config);
    let stem = format!("{kind}_{}_{program}", request.cohort);

    match kind.trim().to_lowercase().as_str() {
        "cacei" => {
            let report = cacei(&store, &ctx, &pool, &request).map_err(|e| format!("✗ {e}"))?;
            emit(&report, output, config, &stem)
        }
        "caceca" => {
            let report = caceca(&store, &ctx, &pool, &request).map_err(|e| format!("✗ {e}"))?;
            emit(&report, output, config, &stem)
        }
        other => Err(format!("✗ Unknown accreditation table: {other}. Use: cacei or caceca")),
    }
}
