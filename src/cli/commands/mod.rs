//! CLI command handlers for `cohortes`.
//!
//! Each subcommand lives in its own submodule. Report commands share the
//! helpers below for loading the dataset, building the run context and
//! writing the rendered report.

pub mod cedula;
pub mod cohort;
pub mod config;
pub mod dataset;
pub mod generational;
pub mod indicator;
pub mod tables;

use crate::args::OutputArgs;
use cohort_analytics::config::Config;
use cohort_analytics::core::cohort::RunContext;
use cohort_analytics::core::indices::BatchScheduler;
use cohort_analytics::core::models::Period;
use cohort_analytics::core::report::{generator_for, Report, ReportFormat};
use cohort_analytics::core::store::{load_dataset, InMemoryStore};
use cohort_analytics::{error, info, warn};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Load the configured dataset, logging rejected rows
pub fn load_store(config: &Config) -> Result<InMemoryStore, String> {
    if config.dataset.dir.is_empty() {
        return Err("✗ No dataset directory configured. Use --data-dir or `config set data_dir`".to_string());
    }
    let dir = Path::new(&config.dataset.dir);
    let loaded = load_dataset(dir).map_err(|e| {
        error!("Failed to load dataset {}: {e}", dir.display());
        format!("✗ Failed to load dataset {}: {e}", dir.display())
    })?;
    if !loaded.issues.is_empty() {
        warn!(
            "{} row(s) rejected while loading {}",
            loaded.issues.len(),
            dir.display()
        );
    }
    info!("Dataset loaded: {}", dir.display());
    Ok(loaded.store)
}

/// Run context for one command, with the configured time budget
pub fn run_context(scope: impl Into<String>, config: &Config) -> RunContext {
    let ctx = RunContext::new(scope);
    match config.analytics.time_budget() {
        Some(budget) => ctx.with_budget(budget),
        None => ctx,
    }
}

/// Worker pool sized from the config
pub fn scheduler(config: &Config) -> Result<BatchScheduler, String> {
    BatchScheduler::new(config.analytics.workers).map_err(|e| format!("✗ {e}"))
}

/// Parse a `YYYYS` term argument
pub fn parse_period(value: &str) -> Result<Period, String> {
    Period::from_str(value).map_err(|e| format!("✗ {e}"))
}

/// Render `report` and write it to `--output`, the reports directory
/// (`--save`), or stdout.
pub fn emit(report: &dyn Report, output: &OutputArgs, config: &Config, stem: &str) -> Result<(), String> {
    let format = ReportFormat::from_str(&output.format)
        .map_err(|e| format!("✗ {e}. Use: markdown, html, json, or csv"))?;
    let generator = generator_for(format);

    let path: Option<PathBuf> = if let Some(path) = &output.output {
        Some(path.clone())
    } else if output.save {
        let reports_dir = PathBuf::from(&config.paths.reports_dir);
        Some(reports_dir.join(format!("{stem}.{}", format.extension())))
    } else {
        None
    };

    match path {
        Some(path) => {
            generator
                .generate(report, &path)
                .map_err(|e| format!("✗ Failed to write {}: {e}", path.display()))?;
            println!("✓ Report generated: {}", path.display());
            info!("Report exported to: {}", path.display());
        }
        None => {
            let content = generator
                .render(report)
                .map_err(|e| format!("✗ Failed to render report: {e}"))?;
            println!("{content}");
        }
    }
    Ok(())
}

/// Print a command failure and log it
pub fn fail(command: &str, err: &str) {
    error!("{command} failed: {err}");
    eprintln!("{err}");
}
