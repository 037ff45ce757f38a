//! Data models for cohort analytics

pub mod period;
pub mod records;
pub mod student;

pub use period::{period_sequence, Period, Semester};
pub use records::{
    continuing_types, AdmissionFilter, AdmissionRecord, AdmissionType, AdmissionTypeSet,
    DegreeRecord, EnglishWaiver, GraduationRecord, Program, ProgramKey, ProgramScope,
    ALL_PROGRAMS,
};
pub use student::{ControlNumber, Curp, DegreeLevel, Gender, Person, Student, StudentId};

/// Ordered set of students; ordering keeps reports deterministic
pub type StudentSet = std::collections::BTreeSet<StudentId>;
