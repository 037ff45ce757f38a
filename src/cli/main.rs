//! Command-line interface entry point for `cohortes`

mod args;
mod commands;

use args::{Cli, Command};
use clap::Parser;
use cohort_analytics::config::Config;
use cohort_analytics::info;
use cohort_analytics::logger::{enable_debug, enable_verbose, init_file_logging, set_level, Level};
use commands::generational::GenerationalArgs;
use commands::tables::TablesArgs;

fn main() {
    let args = Cli::parse();

    // Load configuration once at startup and apply CLI overrides to it
    let mut config = Config::load();
    let defaults = Config::from_defaults();
    config.apply_overrides(&args.to_config_overrides());

    // CLI flag wins over config logging.level; fallback warn
    let effective_level = args
        .log_level
        .map(std::convert::Into::into)
        .or_else(|| Level::parse(&config.logging.level))
        .unwrap_or(Level::Warn);

    let mut level = effective_level;
    if args.debug_flag || level == Level::Debug {
        level = Level::Debug;
        enable_debug();
    }

    let verbose = args.verbose || config.logging.verbose;
    if verbose {
        enable_verbose();
    }
    set_level(level);

    let config_log_path: Option<std::path::PathBuf> = if config.logging.file.is_empty() {
        None
    } else {
        Some(std::path::PathBuf::from(&config.logging.file))
    };

    if let Some(log_path) = args.log_file.as_ref().or(config_log_path.as_ref()) {
        let display_path = log_path.to_string_lossy();
        if init_file_logging(log_path) {
            if verbose {
                eprintln!("✓ File logging initialized at: {display_path}");
            } else {
                info!("File logging initialized at: {display_path}");
            }
        } else {
            eprintln!("✗ Failed to initialize file logging at: {display_path}");
        }
    }

    match args.command {
        Command::Config { subcommand } => {
            commands::config::run(subcommand, &mut config, &defaults);
        }
        Command::Indicator {
            kind,
            cohort,
            terms,
            accumulation,
            output,
        } => {
            commands::indicator::run(
                &kind,
                &cohort,
                terms,
                accumulation.as_deref(),
                &output,
                &config,
            );
        }
        Command::Generational {
            kind,
            cohort,
            terms,
            new_admission,
            transfer,
            output,
        } => {
            let generational = GenerationalArgs {
                kind: &kind,
                cohort: &cohort,
                terms,
                new_admission,
                transfer,
            };
            commands::generational::run(&generational, &output, &config);
        }
        Command::Cedula {
            kind,
            cohort,
            generations,
            output,
        } => {
            commands::cedula::run(&kind, &cohort, generations, &output, &config);
        }
        Command::Tables {
            kind,
            start,
            terms,
            program,
            new_admission,
            transfer,
            output,
        } => {
            let tables = TablesArgs {
                kind: &kind,
                start: &start,
                terms,
                program: &program,
                new_admission,
                transfer,
            };
            commands::tables::run(&tables, &output, &config);
        }
        Command::Cohort { cohort, output } => {
            commands::cohort::run(&cohort, &output, &config);
        }
        Command::Dataset { issues } => {
            commands::dataset::run(&config, issues);
        }
    }
}
