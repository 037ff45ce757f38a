//! Error types for the cohort analytics library

use thiserror::Error;

/// Errors raised by the record model, the tracking engine and the assemblers.
///
/// The enum is `Clone` so a failure can be stored as a per-term marker inside
/// a report while the rest of the report keeps going.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalyticsError {
    /// A term string did not match `YYYYS` with `S` in {1, 3}.
    #[error("Invalid period format: '{0}' (expected YYYYS with S = 1 or 3)")]
    InvalidPeriodFormat(String),

    /// A negative number of terms was requested.
    #[error("Period count must be zero or positive, got {0}")]
    NegativePeriodCount(i64),

    /// A program key that the store does not know.
    #[error("Program not found: '{0}'")]
    ProgramNotFound(String),

    /// A record points at a student (or person) the store cannot resolve.
    #[error("Dangling student reference '{student}' in {source_kind} records")]
    DanglingStudentReference {
        /// Control number found in the record
        student: String,
        /// Which record family referenced it (admission, graduation, degree, ...)
        source_kind: String,
    },

    /// A control number that fails the institutional format.
    #[error("Invalid control number: '{0}'")]
    InvalidControlNumber(String),

    /// A CURP that fails the national ID format.
    #[error("Invalid CURP: '{0}'")]
    InvalidCurp(String),

    /// An admission type outside EX, CO, TR, EQ, RE.
    #[error("Invalid admission type: '{0}'")]
    InvalidAdmissionType(String),

    /// A gender code that is not H/M/male/female.
    #[error("Invalid gender code: '{0}'")]
    InvalidGender(String),

    /// A term sequence would run past the last `YYYYS` term.
    #[error("{count} term(s) from {start} run past the last representable term 29993")]
    PeriodOutOfRange {
        /// First term of the sequence
        start: String,
        /// Terms requested
        count: usize,
    },

    /// The run was cancelled between terms.
    #[error("Run cancelled before {0}")]
    Cancelled(String),

    /// The run exceeded its wall-clock budget.
    #[error("Time budget exceeded before {0}")]
    DeadlineExceeded(String),

    /// The backing record store failed.
    #[error("Record store error: {0}")]
    Store(String),

    /// The worker pool could not be built.
    #[error("Scheduler error: {0}")]
    Scheduler(String),
}

impl AnalyticsError {
    /// Build a dangling-reference error.
    #[must_use]
    pub fn dangling(student: impl Into<String>, source_kind: impl Into<String>) -> Self {
        Self::DanglingStudentReference {
            student: student.into(),
            source_kind: source_kind.into(),
        }
    }

    /// Whether this error marks an interrupted run rather than bad data.
    #[must_use]
    pub const fn is_interruption(&self) -> bool {
        matches!(self, Self::Cancelled(_) | Self::DeadlineExceeded(_))
    }
}

/// Result alias used across the library.
pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

/// Serialize an error through its `Display` text.
///
/// # Errors
///
/// Whatever the serializer reports.
pub fn serialize_display<S: serde::Serializer>(
    error: &AnalyticsError,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}
