//! Dataset command handler

use cohort_analytics::config::Config;
use cohort_analytics::core::store::load_dataset;
use cohort_analytics::{error, info};
use std::path::Path;

/// Load the configured dataset and print its record counts.
pub fn run(config: &Config, show_issues: bool) {
    let dir = Path::new(&config.dataset.dir);
    let loaded = match load_dataset(dir) {
        Ok(loaded) => loaded,
        Err(e) => {
            error!("Failed to load dataset {}: {e}", dir.display());
            eprintln!("✗ Failed to load dataset {}: {e}", dir.display());
            return;
        }
    };
    info!("Dataset loaded: {}", dir.display());

    let counts = loaded.store.counts();
    println!("\n=== Dataset: {} ===\n", dir.display());
    println!("Programs:     {}", counts.programs);
    println!("Students:     {}", counts.students);
    println!("Persons:      {}", counts.persons);
    println!("Admissions:   {}", counts.admissions);
    println!("Graduations:  {}", counts.graduations);
    println!("Degrees:      {}", counts.degrees);
    println!("Waivers:      {}", counts.waivers);

    let dangling = loaded.store.dangling_references();
    if !dangling.is_empty() {
        println!("\n⚠️  {} dangling reference(s)", dangling.len());
    }

    if loaded.issues.is_empty() {
        println!("\n✓ No rejected rows");
    } else {
        println!("\n⚠️  {} rejected row(s)", loaded.issues.len());
        if show_issues {
            for issue in &loaded.issues {
                println!("  {issue}");
            }
            for reference in &dangling {
                println!("  {reference}");
            }
        }
    }
}
