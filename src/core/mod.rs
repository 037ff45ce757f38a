//! Cohort analytics core: record model, store, tracking engine and reports

pub mod cohort;
pub mod config;
pub mod error;
pub mod indices;
pub mod models;
pub mod report;
pub mod store;

/// Returns the current version of the `cohort-analytics` crate
#[must_use]
pub const fn get_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
