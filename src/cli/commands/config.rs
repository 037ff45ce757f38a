//! Config command handler

use super::fail;
use crate::args::ConfigSubcommand;
use cohort_analytics::config::Config;
use cohort_analytics::{info, warn};
use std::io::{self, Write};
use std::path::Path;

/// Dispatch config subcommands
pub fn run(subcommand: Option<ConfigSubcommand>, config: &mut Config, defaults: &Config) {
    let result = match subcommand {
        None => {
            show(config);
            Ok(())
        }
        Some(ConfigSubcommand::Get { key: None }) => {
            show(config);
            Ok(())
        }
        Some(ConfigSubcommand::Get { key: Some(key) }) => get(config, &key),
        Some(ConfigSubcommand::Set { key, value }) => set(config, &key, &value),
        Some(ConfigSubcommand::Unset { key }) => unset(config, defaults, &key),
        Some(ConfigSubcommand::Reset) => reset(),
    };
    if let Err(e) = result {
        fail("config", &e);
        std::process::exit(1);
    }
}

fn show(config: &Config) {
    println!("\n=== Configuration ({}) ===\n", Config::config_file_path().display());
    print!("{config}");
}

fn get(config: &Config, key: &str) -> Result<(), String> {
    let value = config
        .get(key)
        .ok_or_else(|| format!("✗ Unknown config key: '{key}'"))?;
    println!("{value}");
    Ok(())
}

fn set(config: &mut Config, key: &str, value: &str) -> Result<(), String> {
    config.set(key, value).map_err(|e| format!("✗ {e}"))?;

    // A missing dataset directory is allowed, it may be mounted later
    if matches!(key, "data_dir" | "data-dir") && !Path::new(&config.dataset.dir).is_dir() {
        warn!("Dataset directory does not exist yet: {}", config.dataset.dir);
    }

    config
        .save()
        .map_err(|e| format!("✗ Failed to save config: {e}"))?;
    info!("Config key {key} set to {value}");
    println!("✓ Set {key} = {value}");
    Ok(())
}

fn unset(config: &mut Config, defaults: &Config, key: &str) -> Result<(), String> {
    config.unset(key, defaults).map_err(|e| format!("✗ {e}"))?;
    config
        .save()
        .map_err(|e| format!("✗ Failed to save config: {e}"))?;
    let restored = config.get(key).unwrap_or_default();
    println!("✓ Reset {key} to default ({restored})");
    Ok(())
}

fn reset() -> Result<(), String> {
    let path = Config::config_file_path();
    if !path.exists() {
        println!("✓ Config is already at defaults");
        return Ok(());
    }

    print!("Remove {} and return to defaults? (y/n): ", path.display());
    io::stdout().flush().ok();

    let mut response = String::new();
    io::stdin().read_line(&mut response).ok();
    let answer = response.trim();

    if answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes") {
        Config::reset().map_err(|e| format!("✗ Failed to remove config file: {e}"))?;
        println!("✓ Config reset to defaults");
    } else {
        println!("✗ Reset cancelled");
    }
    Ok(())
}
