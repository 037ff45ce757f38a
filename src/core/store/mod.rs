//! Read-side access to the academic record store
//!
//! The tracking engine only ever reads through [`RecordStore`]. Writers (term
//! cutover, bulk upload) live elsewhere and are never concurrent with a report.

pub mod csv_loader;
pub mod memory;

pub use csv_loader::{load_dataset, LoadIssue, LoadedDataset};
pub use memory::{InMemoryStore, StoreCounts};

use crate::core::error::AnalyticsResult;
use crate::core::models::{
    AdmissionTypeSet, Gender, Period, Person, Program, ProgramKey, ProgramScope, Student, StudentId,
    StudentSet,
};
use std::collections::BTreeMap;

/// Queries the cohort engine needs from the record store.
///
/// Implementations must be shareable across worker threads; every method is a
/// pure read.
pub trait RecordStore: Sync {
    /// All known programs, ordered by key
    fn programs(&self) -> Vec<Program>;

    /// Look up a program by key
    fn program(&self, key: &ProgramKey) -> Option<Program>;

    /// Students with an admission record at `period` whose type is in `types`,
    /// restricted to `scope`
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn admissions(
        &self,
        types: &AdmissionTypeSet,
        period: Period,
        scope: &ProgramScope,
    ) -> AnalyticsResult<StudentSet>;

    /// Like [`admissions`](Self::admissions) but only among `among`
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn continuing(
        &self,
        types: &AdmissionTypeSet,
        period: Period,
        among: &StudentSet,
        scope: &ProgramScope,
    ) -> AnalyticsResult<StudentSet> {
        Ok(self
            .admissions(types, period, scope)?
            .intersection(among)
            .cloned()
            .collect())
    }

    /// Admissions at `period` grouped by the student's program
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn admissions_by_program(
        &self,
        types: &AdmissionTypeSet,
        period: Period,
    ) -> AnalyticsResult<BTreeMap<ProgramKey, StudentSet>>;

    /// Members of `among` with a graduation record exactly at `period`
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn graduated(&self, among: &StudentSet, period: Period) -> AnalyticsResult<StudentSet>;

    /// Members of `among` with a degree record exactly at `period`
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn degreed(&self, among: &StudentSet, period: Period) -> AnalyticsResult<StudentSet>;

    /// Gender of a student, via the linked person record
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::DanglingStudentReference`](crate::core::error::AnalyticsError::DanglingStudentReference)
    /// when the student or its person record is missing.
    fn gender_of(&self, student: &StudentId) -> AnalyticsResult<Gender>;

    /// Student record and linked person, if any
    fn profile(&self, student: &StudentId) -> Option<(Student, Option<Person>)>;
}
