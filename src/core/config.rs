//! Configuration for `cohortes`

use crate::core::cohort::AttritionPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default CLI configuration, chosen by build profile.
#[cfg(not(debug_assertions))]
const CONFIG_DEFAULTS: &str = include_str!("../assets/DefaultCLIConfigRelease.toml");

#[cfg(debug_assertions)]
const CONFIG_DEFAULTS: &str = include_str!("../assets/DefaultCLIConfigDebug.toml");

#[cfg(not(debug_assertions))]
const CONFIG_FILE_NAME: &str = "config.toml";

#[cfg(debug_assertions)]
const CONFIG_FILE_NAME: &str = "dconfig.toml";

/// Variable expanded to the config directory inside path values
const DIR_VARIABLE: &str = "$COHORT_ANALYTICS";

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug)
    #[serde(default)]
    pub level: String,
    /// Log file path
    #[serde(default)]
    pub file: String,
    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,
}

/// Where the record dataset lives
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Directory holding the CSV dataset
    #[serde(default)]
    pub dir: String,
}

/// Paths configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory for report output files
    #[serde(default)]
    pub reports_dir: String,
}

/// Defaults for analytics runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Terms walked per cohort, entry included
    #[serde(default = "default_terms")]
    pub terms: i64,
    /// Worker threads for multi-cohort reports
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Wall-clock budget per run in seconds, 0 for none
    #[serde(default)]
    pub time_budget_secs: u64,
    /// How running attrition is accumulated (`signed` or `clamp`)
    #[serde(default)]
    pub attrition_policy: AttritionPolicy,
}

const fn default_terms() -> i64 {
    9
}

const fn default_workers() -> usize {
    4
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            terms: default_terms(),
            workers: default_workers(),
            time_budget_secs: 0,
            attrition_policy: AttritionPolicy::default(),
        }
    }
}

impl AnalyticsConfig {
    /// The time budget, if one is set
    #[must_use]
    pub const fn time_budget(&self) -> Option<Duration> {
        if self.time_budget_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.time_budget_secs))
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Dataset location
    #[serde(default)]
    pub dataset: DatasetConfig,
    /// Path settings
    #[serde(default)]
    pub paths: PathsConfig,
    /// Analytics run defaults
    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

/// Optional CLI overrides for configuration values
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override logging level
    pub level: Option<String>,
    /// Override log file path
    pub file: Option<String>,
    /// Override verbose flag
    pub verbose: Option<bool>,
    /// Override dataset directory
    pub data_dir: Option<String>,
    /// Override reports output directory
    pub reports_dir: Option<String>,
    /// Override worker count
    pub workers: Option<usize>,
    /// Override time budget (seconds)
    pub time_budget_secs: Option<u64>,
    /// Override attrition policy
    pub attrition_policy: Option<AttritionPolicy>,
}

impl Config {
    /// The `$COHORT_ANALYTICS` directory
    ///
    /// - Linux: `~/.config/cohort-analytics`
    /// - macOS: `~/Library/Application Support/cohort-analytics`
    /// - Windows: `%APPDATA%\cohort-analytics`
    #[must_use]
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cohort-analytics")
    }

    /// Fill empty fields from `defaults`.
    ///
    /// Returns `true` if anything changed, so an upgraded binary can persist
    /// newly added keys.
    pub fn merge_defaults(&mut self, defaults: &Self) -> bool {
        let mut changed = false;
        for (value, default) in [
            (&mut self.logging.level, &defaults.logging.level),
            (&mut self.logging.file, &defaults.logging.file),
            (&mut self.dataset.dir, &defaults.dataset.dir),
            (&mut self.paths.reports_dir, &defaults.paths.reports_dir),
        ] {
            if value.is_empty() && !default.is_empty() {
                value.clone_from(default);
                changed = true;
            }
        }
        changed
    }

    /// Apply CLI overrides for this run only
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(level) = &overrides.level {
            self.logging.level.clone_from(level);
        }
        if let Some(file) = &overrides.file {
            self.logging.file.clone_from(file);
        }
        if let Some(verbose) = overrides.verbose {
            self.logging.verbose = verbose;
        }
        if let Some(dir) = &overrides.data_dir {
            self.dataset.dir.clone_from(dir);
        }
        if let Some(reports_dir) = &overrides.reports_dir {
            self.paths.reports_dir.clone_from(reports_dir);
        }
        if let Some(workers) = overrides.workers {
            self.analytics.workers = workers;
        }
        if let Some(secs) = overrides.time_budget_secs {
            self.analytics.time_budget_secs = secs;
        }
        if let Some(policy) = overrides.attrition_policy {
            self.analytics.attrition_policy = policy;
        }
    }

    /// The user config file: `config.toml`, or `dconfig.toml` for debug builds
    #[must_use]
    pub fn config_file_path() -> PathBuf {
        Self::config_dir().join(CONFIG_FILE_NAME)
    }

    fn expand_variables(value: &str) -> String {
        if value.contains(DIR_VARIABLE) {
            let dir = Self::config_dir();
            value.replace(DIR_VARIABLE, dir.to_str().unwrap_or("."))
        } else {
            value.to_string()
        }
    }

    /// Parse a TOML string, expanding `$COHORT_ANALYTICS` in path values.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML cannot be parsed or doesn't match the schema
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        let mut config: Self = toml::from_str(toml_str)?;
        config.logging.file = Self::expand_variables(&config.logging.file);
        config.dataset.dir = Self::expand_variables(&config.dataset.dir);
        config.paths.reports_dir = Self::expand_variables(&config.paths.reports_dir);
        Ok(config)
    }

    /// The compiled-in defaults for this build profile
    #[must_use]
    pub fn from_defaults() -> Self {
        Self::from_toml(CONFIG_DEFAULTS).unwrap_or_default()
    }

    /// Load the user config file, creating it from defaults on first run.
    ///
    /// Falls back to defaults when the file cannot be read or parsed.
    #[must_use]
    pub fn load() -> Self {
        let config_file = Self::config_file_path();
        if !config_file.exists() {
            let defaults = Self::from_defaults();
            let _ = defaults.save_to(&config_file);
            return defaults;
        }
        Self::load_from(&config_file).unwrap_or_else(|_| Self::from_defaults())
    }

    /// Load a config file and fill missing keys from defaults, saving the
    /// file back if keys were added.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load_from(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let mut config = Self::from_toml(&content)?;
        if config.merge_defaults(&Self::from_defaults()) {
            config.save_to(path)?;
        }
        Ok(config)
    }

    /// Save to the user config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file written
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.save_to(&Self::config_file_path())
    }

    /// Save to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file written
    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Get a value by key.
    ///
    /// Keys: `level`, `file`, `verbose`, `data_dir`, `reports_dir`, `terms`,
    /// `workers`, `time_budget_secs`, `attrition_policy`. Dashes work in
    /// place of underscores.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        match key.replace('-', "_").as_str() {
            "level" => Some(self.logging.level.clone()),
            "file" => Some(self.logging.file.clone()),
            "verbose" => Some(self.logging.verbose.to_string()),
            "data_dir" => Some(self.dataset.dir.clone()),
            "reports_dir" => Some(self.paths.reports_dir.clone()),
            "terms" => Some(self.analytics.terms.to_string()),
            "workers" => Some(self.analytics.workers.to_string()),
            "time_budget_secs" => Some(self.analytics.time_budget_secs.to_string()),
            "attrition_policy" => Some(self.analytics.attrition_policy.to_string()),
            _ => None,
        }
    }

    /// Set a value by key. Call [`save`](Self::save) to persist.
    ///
    /// # Errors
    ///
    /// Unknown key, or a value that does not parse for the key
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        fn parsed<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, String> {
            value
                .parse()
                .map_err(|_| format!("Invalid value for '{key}': '{value}'"))
        }

        match key.replace('-', "_").as_str() {
            "level" => self.logging.level = value.to_string(),
            "file" => self.logging.file = value.to_string(),
            "verbose" => self.logging.verbose = parsed(key, value)?,
            "data_dir" => self.dataset.dir = value.to_string(),
            "reports_dir" => self.paths.reports_dir = value.to_string(),
            "terms" => {
                let terms: i64 = parsed(key, value)?;
                if terms < 0 {
                    return Err(format!("'{key}' must be zero or positive, got {terms}"));
                }
                self.analytics.terms = terms;
            }
            "workers" => self.analytics.workers = parsed(key, value)?,
            "time_budget_secs" => self.analytics.time_budget_secs = parsed(key, value)?,
            "attrition_policy" => self.analytics.attrition_policy = parsed(key, value)?,
            _ => return Err(format!("Unknown config key: '{key}'")),
        }
        Ok(())
    }

    /// Reset one key to its value in `defaults`. Call [`save`](Self::save)
    /// to persist.
    ///
    /// # Errors
    ///
    /// Unknown key
    pub fn unset(&mut self, key: &str, defaults: &Self) -> Result<(), String> {
        match key.replace('-', "_").as_str() {
            "level" => self.logging.level.clone_from(&defaults.logging.level),
            "file" => self.logging.file.clone_from(&defaults.logging.file),
            "verbose" => self.logging.verbose = defaults.logging.verbose,
            "data_dir" => self.dataset.dir.clone_from(&defaults.dataset.dir),
            "reports_dir" => self
                .paths
                .reports_dir
                .clone_from(&defaults.paths.reports_dir),
            "terms" => self.analytics.terms = defaults.analytics.terms,
            "workers" => self.analytics.workers = defaults.analytics.workers,
            "time_budget_secs" => {
                self.analytics.time_budget_secs = defaults.analytics.time_budget_secs;
            }
            "attrition_policy" => {
                self.analytics.attrition_policy = defaults.analytics.attrition_policy;
            }
            _ => return Err(format!("Unknown config key: '{key}'")),
        }
        Ok(())
    }

    /// Delete the user config file; the next [`load`](Self::load) recreates it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be deleted
    pub fn reset() -> Result<(), std::io::Error> {
        let config_file = Self::config_file_path();
        if config_file.exists() {
            fs::remove_file(config_file)?;
        }
        Ok(())
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[logging]")?;
        writeln!(f, "  level = \"{}\"", self.logging.level)?;
        writeln!(f, "  file = \"{}\"", self.logging.file)?;
        writeln!(f, "  verbose = {}", self.logging.verbose)?;

        writeln!(f, "\n[dataset]")?;
        writeln!(f, "  dir = \"{}\"", self.dataset.dir)?;

        writeln!(f, "\n[paths]")?;
        writeln!(f, "  reports_dir = \"{}\"", self.paths.reports_dir)?;

        writeln!(f, "\n[analytics]")?;
        writeln!(f, "  terms = {}", self.analytics.terms)?;
        writeln!(f, "  workers = {}", self.analytics.workers)?;
        writeln!(f, "  time_budget_secs = {}", self.analytics.time_budget_secs)?;
        writeln!(
            f,
            "  attrition_policy = \"{}\"",
            self.analytics.attrition_policy
        )?;

        Ok(())
    }
}
