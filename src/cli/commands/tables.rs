//! Population tables command handler

use super::{emit, fail, load_store, parse_period, run_context};
use crate::args::{filter_from, OutputArgs};
use cohort_analytics::config::Config;
use cohort_analytics::core::indices::{
    growth_table, new_admission_table, population_table, TableRequest,
};
use cohort_analytics::core::models::ProgramScope;

/// Arguments of the tables command
pub struct TablesArgs<'a> {
    /// population, growth or new-admission
    pub kind: &'a str,
    /// First term
    pub start: &'a str,
    /// Number of terms, config default when absent
    pub terms: Option<i64>,
    /// Program for the growth table
    pub program: &'a str,
    /// First-time admissions
    pub new_admission: bool,
    /// Transfers and equivalencies
    pub transfer: bool,
}

/// Run the tables command.
pub fn run(args: &TablesArgs<'_>, output: &OutputArgs, config: &Config) {
    if let Err(err) = tables(args, output, config) {
        fail("tables", &err);
    }
}

fn tables(args: &TablesArgs<'_>, output: &OutputArgs, config: &Config) -> Result<(), String> {
    let request = TableRequest {
        start: parse_period(args.start)?,
        terms: args.terms.unwrap_or(config.analytics.terms),
        filter: filter_from(args.new_admission, args.transfer),
        scope: ProgramScope::parse(Some(args.program)),
    };
    let kind = args.kind.trim().to_lowercase();

    let store = load_store(config)?;
    let ctx = run_context(format!("{kind} {}", request.start), config);
    let stem = format!("{}_{}", kind.replace('-', "_"), request.start);

    match kind.as_str() {
        "population" => {
            let table = population_table(&store, &ctx, &request).map_err(|e| format!("✗ {e}"))?;
            emit(&table, output, config, &stem)
        }
        "growth" => {
            let table = growth_table(&store, &ctx, &request).map_err(|e| format!("✗ {e}"))?;
            emit(&table, output, config, &stem)
        }
        "new-admission" | "new_admission" => {
            let table =
                new_admission_table(&store, &ctx, &request).map_err(|e| format!("✗ {e}"))?;
            emit(&table, output, config, &stem)
        }
        other => Err(format!(
            "✗ Unknown table: {other}. Use: population, growth, or new-admission"
        )),
    }
}
