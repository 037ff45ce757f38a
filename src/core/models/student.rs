//! Student, person and identifier models

use super::ProgramKey;
use crate::core::error::{AnalyticsError, AnalyticsResult};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Undergraduate numbers, optionally `C`-prefixed for transfer-in students
static UNDERGRADUATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(C?)(0\d|[1-9]\d)(0[1-9]|[1-9]\d)(000[1-9]|00[1-9]\d|0[1-9]\d\d|[1-9]\d\d\d)$")
        .expect("valid control number regex")
});

/// Graduate (master's) numbers
static GRADUATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(M)(0\d|[1-9]\d)(0[1-9]|[1-9]\d)(000[1-9]|00[1-9]\d|0[1-9]\d\d|[1-9]\d\d\d)$")
        .expect("valid control number regex")
});

static CURP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z]{4}(\d{2})(\d{2})(\d{2})([HM])[A-Z]{5}([0-9A-Z])\d$").expect("valid CURP regex")
});

/// Identifier of a student: the control number as stored.
///
/// Engine set operations compare students by this key only.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(String);

impl StudentId {
    /// Wrap an identifier without validation (upper-cased).
    #[must_use]
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_uppercase())
    }

    /// The identifier text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StudentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Academic level encoded by the control number prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DegreeLevel {
    /// No prefix
    Undergraduate,
    /// `C` prefix: changed program / transferred in
    TransferIn,
    /// `M` prefix: master's student
    Graduate,
}

/// A validated control number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlNumber {
    id: StudentId,
    level: DegreeLevel,
    admission_year: u8,
    entry_semester: u8,
    sequence: u16,
}

impl ControlNumber {
    /// Validate a control number: `YYSSNNNN`, `CYYSSNNNN` or `MYYSSNNNN`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::InvalidControlNumber`] when the value does not match.
    pub fn parse(value: &str) -> AnalyticsResult<Self> {
        let upper = value.trim().to_uppercase();
        let caps = UNDERGRADUATE_PATTERN
            .captures(&upper)
            .or_else(|| GRADUATE_PATTERN.captures(&upper))
            .ok_or_else(|| AnalyticsError::InvalidControlNumber(value.to_string()))?;

        let level = match &caps[1] {
            "C" => DegreeLevel::TransferIn,
            "M" => DegreeLevel::Graduate,
            _ => DegreeLevel::Undergraduate,
        };
        let invalid = || AnalyticsError::InvalidControlNumber(value.to_string());

        Ok(Self {
            admission_year: caps[2].parse().map_err(|_| invalid())?,
            entry_semester: caps[3].parse().map_err(|_| invalid())?,
            sequence: caps[4].parse().map_err(|_| invalid())?,
            level,
            id: StudentId(upper),
        })
    }

    /// The identifier used by records
    #[must_use]
    pub const fn id(&self) -> &StudentId {
        &self.id
    }

    /// Consume into the identifier
    #[must_use]
    pub fn into_id(self) -> StudentId {
        self.id
    }

    /// Level encoded by the prefix
    #[must_use]
    pub const fn level(&self) -> DegreeLevel {
        self.level
    }

    /// Two-digit admission year
    #[must_use]
    pub const fn admission_year(&self) -> u8 {
        self.admission_year
    }

    /// Program-entry semester code
    #[must_use]
    pub const fn entry_semester(&self) -> u8 {
        self.entry_semester
    }

    /// Consecutive number within the entry group
    #[must_use]
    pub const fn sequence(&self) -> u16 {
        self.sequence
    }
}

/// Gender as recorded on the person record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Gender {
    /// `H` (hombre)
    Male,
    /// `M` (mujer)
    Female,
}

impl Gender {
    /// Single-letter code used in tables: `H` or `M`
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Male => "H",
            Self::Female => "M",
        }
    }
}

impl FromStr for Gender {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "h" | "male" | "hombre" => Ok(Self::Male),
            "m" | "female" | "mujer" => Ok(Self::Female),
            _ => Err(AnalyticsError::InvalidGender(s.to_string())),
        }
    }
}

/// A validated CURP (national population registry key)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Curp {
    value: String,
    gender: Gender,
    birth_date: Option<NaiveDate>,
}

impl Curp {
    /// Validate a CURP and derive gender and birth date from it.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::InvalidCurp`] when the value does not match the format.
    pub fn parse(value: &str) -> AnalyticsResult<Self> {
        let upper = value.trim().to_uppercase();
        let caps = CURP_PATTERN
            .captures(&upper)
            .ok_or_else(|| AnalyticsError::InvalidCurp(value.to_string()))?;

        let gender = if &caps[4] == "H" {
            Gender::Male
        } else {
            Gender::Female
        };

        // Homoclave position: digit for births before 2000, letter after
        let century = if caps[5].chars().all(|c| c.is_ascii_digit()) {
            1900
        } else {
            2000
        };
        let yy: i32 = caps[1].parse().unwrap_or(0);
        let month: u32 = caps[2].parse().unwrap_or(0);
        let day: u32 = caps[3].parse().unwrap_or(0);
        let birth_date = NaiveDate::from_ymd_opt(century + yy, month, day);

        Ok(Self {
            value: upper,
            gender,
            birth_date,
        })
    }

    /// The normalized CURP text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Gender encoded at position 11
    #[must_use]
    pub const fn gender(&self) -> Gender {
        self.gender
    }

    /// Birth date encoded at positions 5-10, when it is a real date
    #[must_use]
    pub const fn birth_date(&self) -> Option<NaiveDate> {
        self.birth_date
    }
}

/// Person record linked from a student
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Person {
    /// National ID
    pub curp: String,
    /// Full name, when known
    pub name: Option<String>,
    /// Gender used for every split in the reports
    pub gender: Gender,
    /// Birth date, when derivable
    pub birth_date: Option<NaiveDate>,
}

impl Person {
    /// Build a person from a CURP alone
    #[must_use]
    pub fn from_curp(curp: &Curp) -> Self {
        Self {
            curp: curp.as_str().to_string(),
            name: None,
            gender: curp.gender(),
            birth_date: curp.birth_date(),
        }
    }
}

/// Student record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Student {
    /// Control number
    pub id: StudentId,
    /// Link to the person record
    pub curp: String,
    /// Program the governing plan belongs to
    pub program: ProgramKey,
    /// Curriculum version (plan key)
    pub plan: String,
}

impl Student {
    /// Create a student record
    #[must_use]
    pub fn new(id: StudentId, curp: impl Into<String>, program: ProgramKey, plan: impl Into<String>) -> Self {
        Self {
            id,
            curp: curp.into().trim().to_uppercase(),
            program,
            plan: plan.into(),
        }
    }
}
