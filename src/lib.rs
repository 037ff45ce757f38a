//! Cohort tracking statistics for student records
//!
//! Retention, graduation, degree-completion and attrition rates of entry
//! cohorts, split by program, gender and term, plus the generational,
//! accreditation and population tables built on the same engine.

pub mod core;
pub mod logger;

pub use crate::core::config;
pub use crate::core::get_version;
