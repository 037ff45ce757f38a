//! Cohort population-tracking engine
//!
//! A cohort is selected once ([`selector`]), then walked forward term by term
//! ([`tracker`]). At each term the engine takes a [`snapshot`] of the active,
//! graduated and degree populations and classifies the roster change
//! ([`attrition`]). Rates come from [`rate`]; logging, cancellation and
//! diagnostics travel in a [`RunContext`].

pub mod attrition;
pub mod context;
pub mod rate;
pub mod selector;
pub mod snapshot;
pub mod tracker;

pub use attrition::{attrition, classify, AttritionCounts, AttritionPolicy, Transition};
pub use context::{CancellationToken, RunContext};
pub use rate::{count_rate, rate, Rate};
pub use selector::{select, select_cohort, validate_scope, Cohort, CohortKey};
pub use snapshot::{snapshot, GenderCounts, PopulationSnapshot};
pub use tracker::{CohortTrack, CohortTracker, CumulativeRates, TermOutcome, TermRow};
