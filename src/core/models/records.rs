//! Programs and the append-only academic records (admission, graduation, degree)

use super::{Period, StudentId};
use crate::core::error::AnalyticsError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Sentinel program key meaning "all programs combined"
pub const ALL_PROGRAMS: &str = "TODAS";

/// Program key (`clave`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgramKey(String);

impl ProgramKey {
    /// Create a program key (trimmed, upper-cased)
    #[must_use]
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(key.as_ref().trim().to_uppercase())
    }

    /// Key text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProgramKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An academic program
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Program {
    /// Program key
    pub key: ProgramKey,
    /// Display name
    pub name: String,
}

impl Program {
    /// Create a program
    #[must_use]
    pub fn new(key: impl AsRef<str>, name: impl Into<String>) -> Self {
        Self {
            key: ProgramKey::new(key),
            name: name.into(),
        }
    }
}

/// Which programs a query covers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum ProgramScope {
    /// Every program aggregated together
    All,
    /// A single program
    Program(ProgramKey),
}

impl ProgramScope {
    /// Parse a CLI/API value; empty or `TODAS` means all programs
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") => Self::All,
            Some(v) if v.eq_ignore_ascii_case(ALL_PROGRAMS) => Self::All,
            Some(v) => Self::Program(ProgramKey::new(v)),
        }
    }

    /// Whether a student's program falls inside the scope
    #[must_use]
    pub fn includes(&self, program: &ProgramKey) -> bool {
        match self {
            Self::All => true,
            Self::Program(key) => key == program,
        }
    }
}

impl fmt::Display for ProgramScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str(ALL_PROGRAMS),
            Self::Program(key) => write!(f, "{key}"),
        }
    }
}

/// How a student entered (or continued in) a term
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum AdmissionType {
    /// Entrance exam
    #[serde(rename = "EX")]
    Exam,
    /// Conversion / credit validation
    #[serde(rename = "CO")]
    Conversion,
    /// Transfer from another campus
    #[serde(rename = "TR")]
    Transfer,
    /// Equivalency from another institution
    #[serde(rename = "EQ")]
    Equivalency,
    /// Re-enrollment of a continuing student
    #[serde(rename = "RE")]
    Reenrollment,
}

impl AdmissionType {
    /// Every admission type
    pub const ALL: [Self; 5] = [
        Self::Exam,
        Self::Conversion,
        Self::Transfer,
        Self::Equivalency,
        Self::Reenrollment,
    ];

    /// Two-letter code
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Exam => "EX",
            Self::Conversion => "CO",
            Self::Transfer => "TR",
            Self::Equivalency => "EQ",
            Self::Reenrollment => "RE",
        }
    }

    /// Whether this type marks cohort entry
    #[must_use]
    pub const fn is_initial(self) -> bool {
        !matches!(self, Self::Reenrollment)
    }
}

impl FromStr for AdmissionType {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "EX" => Ok(Self::Exam),
            "CO" => Ok(Self::Conversion),
            "TR" => Ok(Self::Transfer),
            "EQ" => Ok(Self::Equivalency),
            "RE" => Ok(Self::Reenrollment),
            _ => Err(AnalyticsError::InvalidAdmissionType(s.to_string())),
        }
    }
}

impl fmt::Display for AdmissionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A set of admission types used as a query filter
pub type AdmissionTypeSet = BTreeSet<AdmissionType>;

/// The set containing only re-enrollment
#[must_use]
pub fn continuing_types() -> AdmissionTypeSet {
    AdmissionTypeSet::from([AdmissionType::Reenrollment])
}

/// The two admission-class flags exposed to callers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AdmissionFilter {
    /// First-time students: exam or conversion
    pub new_admission: bool,
    /// Students arriving by transfer or equivalency
    pub transfer: bool,
}

impl AdmissionFilter {
    /// Create a filter from the two flags
    #[must_use]
    pub const fn new(new_admission: bool, transfer: bool) -> Self {
        Self {
            new_admission,
            transfer,
        }
    }

    /// Admission types selected by the flags; empty when both are off
    #[must_use]
    pub fn types(&self) -> AdmissionTypeSet {
        let mut types = AdmissionTypeSet::new();
        if self.new_admission {
            types.extend([AdmissionType::Exam, AdmissionType::Conversion]);
        }
        if self.transfer {
            types.extend([AdmissionType::Transfer, AdmissionType::Equivalency]);
        }
        types
    }

    /// Whether neither flag is set
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !self.new_admission && !self.transfer
    }
}

impl fmt::Display for AdmissionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let codes: Vec<&str> = self.types().iter().map(|t| t.code()).collect();
        if codes.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&codes.join(","))
        }
    }
}

/// Admission (ingreso) record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdmissionRecord {
    /// Student admitted
    pub student: StudentId,
    /// Term of the record
    pub period: Period,
    /// Admission type
    pub kind: AdmissionType,
}

/// Graduation (egreso) record: coursework completed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraduationRecord {
    /// Student who graduated
    pub student: StudentId,
    /// Term of graduation
    pub period: Period,
}

/// Degree conferral (titulacion) record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DegreeRecord {
    /// Student who received the degree
    pub student: StudentId,
    /// Term of conferral
    pub period: Period,
    /// Degree option (thesis, exam, ...)
    pub degree_type: String,
}

/// English-requirement waiver (liberacion de ingles)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnglishWaiver {
    /// Student released from the requirement
    pub student: StudentId,
    /// Term of the release
    pub period: Period,
}
