//! Per-term population snapshot of a cohort

use super::{Cohort, RunContext};
use crate::core::error::{AnalyticsError, AnalyticsResult};
use crate::core::models::{continuing_types, Gender, Period, StudentSet};
use crate::core::store::RecordStore;
use serde::Serialize;
use std::ops::{Add, AddAssign};

/// A count split by gender. Signed so attrition can go negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GenderCounts {
    /// Male count
    pub male: i64,
    /// Female count
    pub female: i64,
}

impl GenderCounts {
    /// Build from both parts
    #[must_use]
    pub const fn new(male: i64, female: i64) -> Self {
        Self { male, female }
    }

    /// Sum of both parts
    #[must_use]
    pub const fn total(&self) -> i64 {
        self.male + self.female
    }

    /// Add `delta` to the bucket for `gender`
    pub fn bump(&mut self, gender: Gender, delta: i64) {
        match gender {
            Gender::Male => self.male += delta,
            Gender::Female => self.female += delta,
        }
    }

    /// Both parts clamped at zero
    #[must_use]
    pub fn clamped(self) -> Self {
        Self::new(self.male.max(0), self.female.max(0))
    }
}

impl Add for GenderCounts {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.male + rhs.male, self.female + rhs.female)
    }
}

impl AddAssign for GenderCounts {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// Cohort population at one term
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopulationSnapshot {
    /// Term observed
    pub period: Period,
    /// Members active at the term, including those without a resolvable gender
    pub active_count: usize,
    /// Active members by gender
    pub active: GenderCounts,
    /// Members graduating exactly at this term
    pub graduated: GenderCounts,
    /// Members receiving their degree exactly at this term
    pub degrees: GenderCounts,
    /// The active roster itself
    #[serde(skip)]
    pub roster: StudentSet,
    /// Members graduating at this term
    #[serde(skip)]
    pub graduates: StudentSet,
    /// Members receiving their degree at this term
    #[serde(skip)]
    pub degreed: StudentSet,
}

/// The active roster of a cohort at `term`.
///
/// At the entry term a member is active through its entry admission; at any
/// later term through a re-enrollment record.
///
/// # Errors
///
/// Propagates store failures.
pub fn active_roster(
    store: &dyn RecordStore,
    cohort: &Cohort,
    term: Period,
) -> AnalyticsResult<StudentSet> {
    let types = if term == cohort.key.entry {
        cohort.key.types.clone()
    } else {
        continuing_types()
    };
    store.continuing(&types, term, &cohort.members, &cohort.key.scope)
}

/// Count students by gender.
///
/// Students whose gender cannot be resolved are reported on the context as
/// dangling references (tagged with `source`) and left out of the split.
pub fn count_by_gender(
    store: &dyn RecordStore,
    ctx: &RunContext,
    students: &StudentSet,
    source: &str,
) -> GenderCounts {
    let mut counts = GenderCounts::default();
    for student in students {
        match store.gender_of(student) {
            Ok(gender) => counts.bump(gender, 1),
            Err(AnalyticsError::DanglingStudentReference { student, .. }) => {
                ctx.report_issue(AnalyticsError::dangling(student, source));
            }
            Err(other) => ctx.report_issue(other),
        }
    }
    counts
}

/// Snapshot of a cohort at `term`.
///
/// Graduation and degree counts are for records exactly at `term`, never
/// cumulative.
///
/// # Errors
///
/// Propagates store failures. Unresolvable genders are not errors.
pub fn snapshot(
    store: &dyn RecordStore,
    ctx: &RunContext,
    cohort: &Cohort,
    term: Period,
) -> AnalyticsResult<PopulationSnapshot> {
    let roster = active_roster(store, cohort, term)?;
    let graduates = store.graduated(&cohort.members, term)?;
    let degreed = store.degreed(&cohort.members, term)?;

    Ok(PopulationSnapshot {
        period: term,
        active_count: roster.len(),
        active: count_by_gender(store, ctx, &roster, "admission"),
        graduated: count_by_gender(store, ctx, &graduates, "graduation"),
        degrees: count_by_gender(store, ctx, &degreed, "degree"),
        roster,
        graduates,
        degreed,
    })
}
