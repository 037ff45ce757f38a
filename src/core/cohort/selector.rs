//! Cohort selection

use crate::core::error::{AnalyticsError, AnalyticsResult};
use crate::core::models::{AdmissionTypeSet, Period, ProgramScope, StudentSet};
use crate::core::store::RecordStore;
use serde::Serialize;

/// What defines a cohort: entry term, admission types and program scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CohortKey {
    /// Entry term
    pub entry: Period,
    /// Admission types that count as entry
    pub types: AdmissionTypeSet,
    /// Program scope
    pub scope: ProgramScope,
}

impl CohortKey {
    /// Create a cohort key
    #[must_use]
    pub const fn new(entry: Period, types: AdmissionTypeSet, scope: ProgramScope) -> Self {
        Self {
            entry,
            types,
            scope,
        }
    }
}

/// A selected cohort: its key plus the fixed member set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cohort {
    /// Defining key
    pub key: CohortKey,
    /// Members, fixed at selection
    pub members: StudentSet,
}

impl Cohort {
    /// Number of members; the denominator for every cohort rate
    #[must_use]
    pub fn size(&self) -> usize {
        self.members.len()
    }

    /// Whether the cohort has no members
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Ensure a program scope names a known program.
///
/// # Errors
///
/// [`AnalyticsError::ProgramNotFound`] for an unknown key.
pub fn validate_scope(store: &dyn RecordStore, scope: &ProgramScope) -> AnalyticsResult<()> {
    match scope {
        ProgramScope::All => Ok(()),
        ProgramScope::Program(key) => store
            .program(key)
            .map(|_| ())
            .ok_or_else(|| AnalyticsError::ProgramNotFound(key.to_string())),
    }
}

/// Every student admitted at `term` with a type in `types`, inside `scope`.
///
/// An empty type set selects nobody.
///
/// # Errors
///
/// Propagates store failures.
pub fn select_cohort(
    store: &dyn RecordStore,
    types: &AdmissionTypeSet,
    term: Period,
    scope: &ProgramScope,
) -> AnalyticsResult<StudentSet> {
    if types.is_empty() {
        return Ok(StudentSet::new());
    }
    store.admissions(types, term, scope)
}

/// Select a cohort for a key.
///
/// # Errors
///
/// Propagates store failures.
pub fn select(store: &dyn RecordStore, key: CohortKey) -> AnalyticsResult<Cohort> {
    let members = select_cohort(store, &key.types, key.entry, &key.scope)?;
    Ok(Cohort { key, members })
}
