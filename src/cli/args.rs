//! CLI argument definitions for `cohortes`

use clap::{builder::BoolishValueParser, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use cohort_analytics::config::ConfigOverrides;
use cohort_analytics::core::cohort::AttritionPolicy;
use cohort_analytics::core::models::AdmissionFilter;
use cohort_analytics::logger::Level;

/// CLI log level argument
///
/// Converts to lowercase strings for config storage and to
/// [`Level`] for runtime use.
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum LogLevelArg {
    /// Error-level logging
    Error,
    /// Warning-level logging
    Warn,
    /// Info-level logging
    Info,
    /// Debug-level logging
    Debug,
}

impl From<LogLevelArg> for Level {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => Self::Error,
            LogLevelArg::Warn => Self::Warn,
            LogLevelArg::Info => Self::Info,
            LogLevelArg::Debug => Self::Debug,
        }
    }
}

impl std::fmt::Display for LogLevelArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let as_str = match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
        };
        write!(f, "{as_str}")
    }
}

/// Attrition policy argument
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum PolicyArg {
    /// Signed running total
    Signed,
    /// Running total clamped at zero
    Clamp,
}

impl From<PolicyArg> for AttritionPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Signed => Self::Signed,
            PolicyArg::Clamp => Self::ClampAtZero,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum ConfigSubcommand {
    /// Display configuration values.
    ///
    /// If a KEY is provided, displays only that configuration value.
    Get {
        /// Optional configuration key to display (e.g., `level`, `data_dir`, `workers`)
        #[arg(value_name = "KEY")]
        key: Option<String>,
    },
    /// Set a configuration value.
    Set {
        /// Configuration key to set
        #[arg(value_name = "KEY")]
        key: String,
        /// Value to set
        #[arg(value_name = "VALUE")]
        value: String,
    },
    /// Unset a configuration value.
    Unset {
        /// Configuration key to unset
        #[arg(value_name = "KEY")]
        key: String,
    },
    /// Reset configuration to defaults (requires confirmation).
    Reset,
}

/// Which cohort to follow
#[derive(Debug, Clone, Args)]
pub struct CohortArgs {
    /// Entry term, `YYYYS` (e.g. 20241)
    #[arg(long, value_name = "TERM")]
    pub cohort: String,

    /// Program key, or TODAS for every program
    #[arg(long, value_name = "KEY", default_value = "TODAS")]
    pub program: String,

    /// Count first-time admissions (EX, CO)
    #[arg(long)]
    pub new_admission: bool,

    /// Count transfers and equivalencies (TR, EQ)
    #[arg(long)]
    pub transfer: bool,
}

impl CohortArgs {
    /// Admission filter; new admissions when no flag is given
    pub const fn filter(&self) -> AdmissionFilter {
        filter_from(self.new_admission, self.transfer)
    }
}

/// Admission filter from the two flags; new admissions when neither is set
pub const fn filter_from(new_admission: bool, transfer: bool) -> AdmissionFilter {
    if !new_admission && !transfer {
        AdmissionFilter::new(true, false)
    } else {
        AdmissionFilter::new(new_admission, transfer)
    }
}

/// Where and how to write a report
#[derive(Debug, Clone, Args)]
pub struct OutputArgs {
    /// Report format: markdown (md), html, json, or csv
    #[arg(short, long, value_name = "FORMAT", default_value = "markdown")]
    pub format: String,

    /// Output file path (stdout when omitted)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Write into the configured reports directory instead of stdout
    #[arg(long, conflicts_with = "output")]
    pub save: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage configuration.
    ///
    /// If no subcommand is provided, displays all configuration values.
    Config {
        #[command(subcommand)]
        subcommand: Option<ConfigSubcommand>,
    },
    /// Per-term indicator for one cohort.
    ///
    /// KIND is retention, graduation, degree or attrition.
    Indicator {
        /// Indicator to compute
        #[arg(value_name = "KIND")]
        kind: String,

        #[command(flatten)]
        cohort: CohortArgs,

        /// Terms to walk, entry included (defaults to config `terms`)
        #[arg(long, value_name = "N", allow_negative_numbers = true)]
        terms: Option<i64>,

        /// How rates accumulate: point, running, or summed
        #[arg(long, value_name = "MODE")]
        accumulation: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Graduation or degree counts per program for one generation.
    Generational {
        /// graduation or degree
        #[arg(value_name = "KIND")]
        kind: String,

        /// Entry term, `YYYYS`
        #[arg(long, value_name = "TERM")]
        cohort: String,

        /// Semesters to walk, entry included
        #[arg(long, value_name = "N", default_value_t = 12, allow_negative_numbers = true)]
        terms: i64,

        /// Count first-time admissions (EX, CO)
        #[arg(long)]
        new_admission: bool,

        /// Count transfers and equivalencies (TR, EQ)
        #[arg(long)]
        transfer: bool,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Accreditation table for one program.
    ///
    /// KIND is cacei or caceca.
    Cedula {
        /// cacei or caceca
        #[arg(value_name = "KIND")]
        kind: String,

        #[command(flatten)]
        cohort: CohortArgs,

        /// Generations to include (cacei only)
        #[arg(long, value_name = "N", default_value_t = 10)]
        generations: usize,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Population tables over a range of terms.
    ///
    /// KIND is population, growth or new-admission.
    Tables {
        /// population, growth or new-admission
        #[arg(value_name = "KIND")]
        kind: String,

        /// First term, `YYYYS`
        #[arg(long, value_name = "TERM")]
        start: String,

        /// Number of terms
        #[arg(long, value_name = "N", allow_negative_numbers = true)]
        terms: Option<i64>,

        /// Program key for the growth table, or TODAS
        #[arg(long, value_name = "KEY", default_value = "TODAS")]
        program: String,

        /// Count first-time admissions (EX, CO)
        #[arg(long)]
        new_admission: bool,

        /// Count transfers and equivalencies (TR, EQ)
        #[arg(long)]
        transfer: bool,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// List the members of a cohort.
    Cohort {
        #[command(flatten)]
        cohort: CohortArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Load the dataset and summarize it.
    Dataset {
        /// Print every rejected row
        #[arg(long)]
        issues: bool,
    },
}

#[derive(Parser, Debug)]
#[command(
    name = "cohortes",
    about = "Cohort tracking statistics for student records",
    version = env!("CARGO_PKG_VERSION")
)]
pub struct Cli {
    /// Set the runtime log level (error|warn|info|debug). Falls back to config if omitted.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevelArg>,

    /// Enable verbose output (runtime only)
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Enable debug-level logging and runtime debug flag (shorthand)
    #[arg(long = "debug")]
    pub debug_flag: bool,

    /// Write runtime logs to a file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    // --- Config overrides ---
    /// Override config logging level
    #[arg(long = "config-level", value_enum)]
    pub config_level: Option<LogLevelArg>,

    /// Override config log file path
    #[arg(long = "config-log-file", value_name = "PATH")]
    pub config_log_file: Option<PathBuf>,

    /// Override config verbose flag (true/false)
    #[arg(long = "config-verbose", value_parser = BoolishValueParser::new())]
    pub config_verbose: Option<bool>,

    /// Override config dataset directory
    #[arg(long = "config-data-dir", value_name = "DIR")]
    pub config_data_dir: Option<PathBuf>,

    /// Override config dataset directory (short form)
    #[arg(long = "data-dir", value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Override config reports directory
    #[arg(long = "config-reports-dir", value_name = "DIR")]
    pub config_reports_dir: Option<PathBuf>,

    /// Override config reports directory (short form)
    #[arg(long = "reports-dir", value_name = "DIR")]
    pub reports_dir: Option<PathBuf>,

    /// Worker threads for multi-cohort reports
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Wall-clock budget per run, in seconds (0 for none)
    #[arg(long, value_name = "SECS")]
    pub time_budget: Option<u64>,

    /// How running attrition accumulates
    #[arg(long, value_enum)]
    pub attrition_policy: Option<PolicyArg>,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

fn path_string(path: Option<&PathBuf>) -> Option<String> {
    path.map(|p| p.to_string_lossy().to_string())
}

impl Cli {
    /// Convert CLI flags into config overrides.
    ///
    /// Short-form flags (`--data-dir`) win over long-form flags
    /// (`--config-data-dir`) when both are given.
    pub fn to_config_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            level: self.config_level.map(|lvl| lvl.to_string()),
            file: path_string(self.config_log_file.as_ref()),
            verbose: self.config_verbose,
            data_dir: path_string(self.data_dir.as_ref())
                .or_else(|| path_string(self.config_data_dir.as_ref())),
            reports_dir: path_string(self.reports_dir.as_ref())
                .or_else(|| path_string(self.config_reports_dir.as_ref())),
            workers: self.workers,
            time_budget_secs: self.time_budget,
            attrition_policy: self.attrition_policy.map(Into::into),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["cohortes"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("valid arguments")
    }

    #[test]
    fn test_log_level_display() {
        assert_eq!(LogLevelArg::Error.to_string(), "error");
        assert_eq!(LogLevelArg::Warn.to_string(), "warn");
        assert_eq!(LogLevelArg::Info.to_string(), "info");
        assert_eq!(LogLevelArg::Debug.to_string(), "debug");
    }

    #[test]
    fn test_log_level_to_logger_level() {
        assert_eq!(Level::from(LogLevelArg::Error), Level::Error);
        assert_eq!(Level::from(LogLevelArg::Debug), Level::Debug);
    }

    #[test]
    fn test_to_config_overrides_empty() {
        let overrides = cli(&["config"]).to_config_overrides();
        assert!(overrides.level.is_none());
        assert!(overrides.file.is_none());
        assert!(overrides.verbose.is_none());
        assert!(overrides.data_dir.is_none());
        assert!(overrides.reports_dir.is_none());
        assert!(overrides.workers.is_none());
        assert!(overrides.attrition_policy.is_none());
    }

    #[test]
    fn test_to_config_overrides_with_values() {
        let overrides = cli(&[
            "--config-level",
            "debug",
            "--config-log-file",
            "/tmp/test.log",
            "--config-verbose",
            "true",
            "--data-dir",
            "/data",
            "--workers",
            "8",
            "--time-budget",
            "30",
            "--attrition-policy",
            "clamp",
            "config",
        ])
        .to_config_overrides();
        assert_eq!(overrides.level, Some("debug".to_string()));
        assert_eq!(overrides.file, Some("/tmp/test.log".to_string()));
        assert_eq!(overrides.verbose, Some(true));
        assert_eq!(overrides.data_dir, Some("/data".to_string()));
        assert_eq!(overrides.workers, Some(8));
        assert_eq!(overrides.time_budget_secs, Some(30));
        assert_eq!(overrides.attrition_policy, Some(AttritionPolicy::ClampAtZero));
    }

    #[test]
    fn test_short_form_precedence_over_long_form() {
        let overrides = cli(&[
            "--config-data-dir",
            "/long/data",
            "--data-dir",
            "/short/data",
            "--config-reports-dir",
            "/long/out",
            "--reports-dir",
            "/short/out",
            "config",
        ])
        .to_config_overrides();
        assert_eq!(overrides.data_dir, Some("/short/data".to_string()));
        assert_eq!(overrides.reports_dir, Some("/short/out".to_string()));
    }

    #[test]
    fn test_long_form_when_short_form_absent() {
        let overrides = cli(&["--config-data-dir", "/long/data", "config"]).to_config_overrides();
        assert_eq!(overrides.data_dir, Some("/long/data".to_string()));
    }

    #[test]
    fn test_indicator_arguments() {
        let args = cli(&[
            "indicator",
            "retention",
            "--cohort",
            "20241",
            "--program",
            "ISC",
            "--transfer",
            "--terms",
            "-1",
            "-f",
            "json",
        ]);
        let Command::Indicator {
            kind,
            cohort,
            terms,
            output,
            ..
        } = args.command
        else {
            panic!("expected indicator");
        };
        assert_eq!(kind, "retention");
        assert_eq!(cohort.program, "ISC");
        assert_eq!(cohort.filter(), AdmissionFilter::new(false, true));
        assert_eq!(terms, Some(-1));
        assert_eq!(output.format, "json");
    }

    #[test]
    fn test_filter_defaults_to_new_admission() {
        assert_eq!(filter_from(false, false), AdmissionFilter::new(true, false));
        assert_eq!(filter_from(true, true), AdmissionFilter::new(true, true));
    }

    #[test]
    fn test_save_conflicts_with_output() {
        let result = Cli::try_parse_from([
            "cohortes", "cohort", "--cohort", "20241", "--save", "-o", "x.md",
        ]);
        assert!(result.is_err());
    }
}
