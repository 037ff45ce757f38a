//! Academic terms (periods) and the period sequencer
//!
//! A period is written `YYYYS`: a four-digit year followed by the semester
//! code, `1` for January-June and `3` for August-December. Two periods per
//! year, totally ordered by `(year, semester)`. Years run from 1000 to 2999,
//! so every period round-trips through its `YYYYS` form.

use crate::core::error::{AnalyticsError, AnalyticsResult};
use chrono::{Datelike, Local, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// First year a period can carry
pub const MIN_YEAR: u16 = 1000;
/// Last year a period can carry
pub const MAX_YEAR: u16 = 2999;

static PERIOD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([12][0-9]{3})([13])$").expect("valid period regex"));

/// Semester within an academic year
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Semester {
    /// January-June, code `1`
    First,
    /// August-December, code `3`
    Second,
}

impl Semester {
    /// The digit used in the `YYYYS` encoding
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::First => 1,
            Self::Second => 3,
        }
    }
}

/// An academic term
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    year: u16,
    semester: Semester,
}

impl Period {
    /// Create a period from its parts; `None` outside
    /// [`MIN_YEAR`]..=[`MAX_YEAR`]
    #[must_use]
    pub const fn new(year: u16, semester: Semester) -> Option<Self> {
        if year < MIN_YEAR || year > MAX_YEAR {
            return None;
        }
        Some(Self { year, semester })
    }

    /// Calendar year
    #[must_use]
    pub const fn year(&self) -> u16 {
        self.year
    }

    /// Semester within the year
    #[must_use]
    pub const fn semester(&self) -> Semester {
        self.semester
    }

    /// The period immediately after this one; `None` after `29993`
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self.semester {
            Semester::First => Self::new(self.year, Semester::Second),
            Semester::Second => Self::new(self.year + 1, Semester::First),
        }
    }

    /// The period `terms` steps after this one, if representable
    #[must_use]
    pub fn offset(self, terms: usize) -> Option<Self> {
        let ordinal = (usize::from(self.year) * 2 + usize::from(self.semester == Semester::Second))
            .checked_add(terms)?;
        let year = u16::try_from(ordinal / 2).ok()?;
        let semester = if ordinal % 2 == 0 {
            Semester::First
        } else {
            Semester::Second
        };
        Self::new(year, semester)
    }

    /// Iterator starting at (and including) this period, ending at `29993`
    pub fn following(self) -> impl Iterator<Item = Self> {
        std::iter::successors(Some(self), |p| p.next())
    }

    /// The first `count` periods starting at this one.
    ///
    /// # Errors
    ///
    /// [`AnalyticsError::PeriodOutOfRange`] when the sequence would run past
    /// the last representable period.
    pub fn sequence(self, count: usize) -> AnalyticsResult<Vec<Self>> {
        if count > 0 && self.offset(count - 1).is_none() {
            return Err(AnalyticsError::PeriodOutOfRange {
                start: self.to_string(),
                count,
            });
        }
        Ok(self.following().take(count).collect())
    }

    /// The period that contains a calendar date
    #[must_use]
    pub fn containing(date: NaiveDate) -> Self {
        let semester = if date.month() <= 6 {
            Semester::First
        } else {
            Semester::Second
        };
        let year = date
            .year()
            .clamp(i32::from(MIN_YEAR), i32::from(MAX_YEAR));
        let year = u16::try_from(year).unwrap_or(MAX_YEAR);
        Self { year, semester }
    }

    /// The period running today (local time)
    #[must_use]
    pub fn current() -> Self {
        Self::containing(Local::now().date_naive())
    }

    /// Month-prefixed label used by accreditation tables: `2/20241`, `8/20243`
    #[must_use]
    pub fn accreditation_label(&self) -> String {
        let month = match self.semester {
            Semester::First => 2,
            Semester::Second => 8,
        };
        format!("{month}/{self}")
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{}", self.year, self.semester.code())
    }
}

impl FromStr for Period {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // `2024-1` is accepted and normalized to `20241`
        let normalized = s.trim().replacen('-', "", 1);
        let caps = PERIOD_PATTERN
            .captures(&normalized)
            .ok_or_else(|| AnalyticsError::InvalidPeriodFormat(s.to_string()))?;

        let year = caps[1]
            .parse::<u16>()
            .map_err(|_| AnalyticsError::InvalidPeriodFormat(s.to_string()))?;
        let semester = if &caps[2] == "1" {
            Semester::First
        } else {
            Semester::Second
        };
        Self::new(year, semester).ok_or_else(|| AnalyticsError::InvalidPeriodFormat(s.to_string()))
    }
}

impl TryFrom<String> for Period {
    type Error = AnalyticsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Period> for String {
    fn from(period: Period) -> Self {
        period.to_string()
    }
}

/// Ordered list of `count` terms starting at `start`.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidPeriodFormat`] when `start` is malformed,
/// [`AnalyticsError::NegativePeriodCount`] when `count` is negative and
/// [`AnalyticsError::PeriodOutOfRange`] when the sequence passes `29993`.
pub fn period_sequence(start: &str, count: i64) -> AnalyticsResult<Vec<Period>> {
    let start: Period = start.parse()?;
    let count = usize::try_from(count).map_err(|_| AnalyticsError::NegativePeriodCount(count))?;
    start.sequence(count)
}
