//! Report assemblers built on the cohort engine
//!
//! The four per-cohort indicators (retention, graduation, degree completion
//! and attrition) share one pipeline parameterized by a [`Pipeline`] value.
//! Generational, accreditation and population tables live in the submodules.

pub mod cedulas;
pub mod generational;
pub mod scheduler;
pub mod tables;

use crate::core::cohort::{
    rate, select, validate_scope, AttritionPolicy, CohortKey, CohortTracker, GenderCounts, Rate,
    RunContext, TermOutcome, TermRow,
};
use crate::core::error::{AnalyticsError, AnalyticsResult};
use crate::core::models::{AdmissionFilter, Period, ProgramScope};
use crate::core::report::TabularReport;
use crate::core::store::RecordStore;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

pub use cedulas::{caceca, cacei, CacecaReport, CaceiReport, CedulaRequest};
pub use generational::{generational, GenerationalKind, GenerationalReport, GenerationalRequest};
pub use scheduler::BatchScheduler;
pub use tables::{
    cohort_listing, growth_table, new_admission_table, population_table, CohortListing,
    GrowthTable, NewAdmissionTable, PopulationTable, TableRequest,
};

/// Which population an indicator measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    /// Members still active (permanencia)
    Retention,
    /// Members who completed coursework (egreso)
    Graduation,
    /// Members who received their degree (titulacion)
    DegreeCompletion,
    /// Members lost without graduating (desercion)
    Attrition,
}

impl IndicatorKind {
    /// Human-readable title
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Retention => "Retention",
            Self::Graduation => "Graduation",
            Self::DegreeCompletion => "Degree completion",
            Self::Attrition => "Attrition",
        }
    }

    /// Accumulation used when none is requested
    #[must_use]
    pub const fn default_accumulation(self) -> AccumulationMode {
        match self {
            Self::Retention => AccumulationMode::PointInTime,
            _ => AccumulationMode::Running,
        }
    }

    /// Numerator at a term: (this term alone, running total)
    fn numerators(self, row: &TermRow) -> (i64, i64) {
        let count = |n: usize| i64::try_from(n).unwrap_or(i64::MAX);
        match self {
            Self::Retention => {
                let active = count(row.snapshot.active_count);
                (active, active)
            }
            Self::Graduation => (
                count(row.snapshot.graduates.len()),
                count(row.graduated_total),
            ),
            Self::DegreeCompletion => (count(row.snapshot.degreed.len()), count(row.degree_total)),
            Self::Attrition => (row.attrition.total(), row.attrition_to_date.total()),
        }
    }
}

impl FromStr for IndicatorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "retention" | "permanencia" => Ok(Self::Retention),
            "graduation" | "egreso" => Ok(Self::Graduation),
            "degree" | "degree-completion" | "titulacion" => Ok(Self::DegreeCompletion),
            "attrition" | "desercion" => Ok(Self::Attrition),
            _ => Err(format!("Unknown indicator: {s}")),
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// How per-term values turn into the reported rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccumulationMode {
    /// The term's own value over the cohort size
    PointInTime,
    /// The running total over the cohort size
    Running,
    /// The sum of each term's rounded point-in-time rate
    SummedRates,
}

impl FromStr for AccumulationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "point" | "point-in-time" => Ok(Self::PointInTime),
            "running" => Ok(Self::Running),
            "summed" | "summed-rates" => Ok(Self::SummedRates),
            _ => Err(format!("Unknown accumulation mode: {s}")),
        }
    }
}

/// The indicator pipeline: what to measure and how to accumulate it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pipeline {
    /// Population measured
    pub kind: IndicatorKind,
    /// Accumulation of per-term values
    pub accumulation: AccumulationMode,
}

impl Pipeline {
    /// Pipeline with the kind's default accumulation
    #[must_use]
    pub const fn new(kind: IndicatorKind) -> Self {
        Self {
            kind,
            accumulation: kind.default_accumulation(),
        }
    }

    /// Override the accumulation. Retention is a state, so it always stays
    /// point-in-time.
    #[must_use]
    pub const fn with_accumulation(mut self, accumulation: AccumulationMode) -> Self {
        self.accumulation = match self.kind {
            IndicatorKind::Retention => AccumulationMode::PointInTime,
            _ => accumulation,
        };
        self
    }

    /// Rate per term over the computed rows, in order
    fn rates<'a>(&self, rows: impl Iterator<Item = &'a TermRow>, size: usize) -> Vec<Rate> {
        let denominator = i64::try_from(size).unwrap_or(i64::MAX);
        let mut summed = Rate::ZERO;
        rows.map(|row| {
            let (point, running) = self.kind.numerators(row);
            match self.accumulation {
                AccumulationMode::PointInTime => rate(point, denominator),
                AccumulationMode::Running => rate(running, denominator),
                AccumulationMode::SummedRates => {
                    summed = summed + rate(point, denominator);
                    summed
                }
            }
        })
        .collect()
    }
}

/// Parameters of an indicator run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorRequest {
    /// Entry term
    pub cohort: Period,
    /// Terms to walk, entry included
    pub terms: i64,
    /// Program scope
    pub scope: ProgramScope,
    /// Admission classes that define the cohort
    pub filter: AdmissionFilter,
    /// What to compute
    pub pipeline: Pipeline,
    /// Attrition accumulation policy
    pub policy: AttritionPolicy,
}

/// Convert a requested term count for a walk starting at `start`.
///
/// # Errors
///
/// [`AnalyticsError::NegativePeriodCount`] when negative,
/// [`AnalyticsError::PeriodOutOfRange`] when the walk would pass `29993`.
pub fn term_count(start: Period, terms: i64) -> AnalyticsResult<usize> {
    let count = usize::try_from(terms).map_err(|_| AnalyticsError::NegativePeriodCount(terms))?;
    if count > 0 && start.offset(count - 1).is_none() {
        return Err(AnalyticsError::PeriodOutOfRange {
            start: start.to_string(),
            count,
        });
    }
    Ok(count)
}

/// One row of an indicator report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IndicatorRow {
    /// Computed term
    Computed {
        /// Term
        period: Period,
        /// 1-based semester of the walk
        semester: usize,
        /// Active members (all, including unresolved genders)
        active_count: usize,
        /// Active by gender
        active: GenderCounts,
        /// Graduated at the term
        graduated: GenderCounts,
        /// Degrees at the term
        degrees: GenderCounts,
        /// Attrition of this step
        attrition: GenderCounts,
        /// Indicator rate at this term
        rate: Rate,
    },
    /// Failed term
    Failed {
        /// Term
        period: Period,
        /// Marker text
        error: String,
    },
}

/// An indicator over one cohort
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndicatorReport {
    /// Pipeline used
    pub pipeline: Pipeline,
    /// Cohort definition
    pub cohort: CohortKey,
    /// Admission classes, as requested
    pub filter: String,
    /// Program display name
    pub program: String,
    /// Initial population
    pub size: usize,
    /// Initial population by gender
    pub population: GenderCounts,
    /// One row per term
    pub rows: Vec<IndicatorRow>,
    /// Rate at the last computed term
    pub final_rate: Rate,
    /// Data issues found during the run
    pub issues: Vec<String>,
}

/// Display name of a program scope
pub(crate) fn scope_name(store: &dyn RecordStore, scope: &ProgramScope) -> String {
    match scope {
        ProgramScope::All => "All programs".to_string(),
        ProgramScope::Program(key) => store
            .program(key)
            .map_or_else(|| key.to_string(), |p| format!("{} ({key})", p.name)),
    }
}

/// Run one indicator over one cohort.
///
/// # Errors
///
/// [`AnalyticsError::NegativePeriodCount`] or [`AnalyticsError::ProgramNotFound`]
/// before any query; store failures while selecting the cohort. Failures in
/// individual terms become [`IndicatorRow::Failed`] rows instead.
pub fn run_indicator(
    store: &dyn RecordStore,
    ctx: &RunContext,
    request: &IndicatorRequest,
) -> AnalyticsResult<IndicatorReport> {
    let terms = term_count(request.cohort, request.terms)?;
    validate_scope(store, &request.scope)?;

    let key = CohortKey::new(request.cohort, request.filter.types(), request.scope.clone());
    let cohort = select(store, key)?;
    ctx.logger().info(format_args!(
        "{} for cohort {} ({}): {} member(s), {terms} term(s)",
        request.pipeline.kind,
        request.cohort,
        request.scope,
        cohort.size()
    ));

    let track = CohortTracker::new(store, ctx)
        .with_policy(request.policy)
        .track(&cohort, terms);
    let rates = request.pipeline.rates(track.rows(), track.size);

    let mut rates_iter = rates.iter().copied();
    let rows = track
        .terms
        .iter()
        .map(|outcome| match outcome {
            TermOutcome::Computed(row) => IndicatorRow::Computed {
                period: row.period(),
                semester: row.semester,
                active_count: row.snapshot.active_count,
                active: row.snapshot.active,
                graduated: row.snapshot.graduated,
                degrees: row.snapshot.degrees,
                attrition: row.attrition,
                rate: rates_iter.next().unwrap_or_default(),
            },
            TermOutcome::Failed { period, error } => IndicatorRow::Failed {
                period: *period,
                error: error.to_string(),
            },
        })
        .collect();

    Ok(IndicatorReport {
        pipeline: request.pipeline,
        filter: request.filter.to_string(),
        program: scope_name(store, &request.scope),
        size: track.size,
        population: track.population,
        final_rate: rates.last().copied().unwrap_or_default(),
        issues: ctx.issues().iter().map(ToString::to_string).collect(),
        cohort: track.cohort,
        rows,
    })
}

impl TabularReport for IndicatorReport {
    fn title(&self) -> String {
        format!("{} index", self.pipeline.kind)
    }

    fn metadata(&self) -> Vec<(String, String)> {
        vec![
            ("Cohort".to_string(), self.cohort.entry.to_string()),
            ("Program".to_string(), self.program.clone()),
            ("Admission types".to_string(), self.filter.clone()),
            (
                "Initial population".to_string(),
                format!(
                    "{} ({} H / {} M)",
                    self.size, self.population.male, self.population.female
                ),
            ),
            (
                "Accumulation".to_string(),
                format!("{:?}", self.pipeline.accumulation),
            ),
        ]
    }

    fn header(&self) -> Vec<String> {
        [
            "Period", "Semester", "Active", "Active H", "Active M", "Graduated H", "Graduated M",
            "Degrees H", "Degrees M", "Attrition H", "Attrition M", "Rate",
        ]
        .iter()
        .map(ToString::to_string)
        .collect()
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| match row {
                IndicatorRow::Computed {
                    period,
                    semester,
                    active_count,
                    active,
                    graduated,
                    degrees,
                    attrition,
                    rate,
                } => vec![
                    period.to_string(),
                    semester.to_string(),
                    active_count.to_string(),
                    active.male.to_string(),
                    active.female.to_string(),
                    graduated.male.to_string(),
                    graduated.female.to_string(),
                    degrees.male.to_string(),
                    degrees.female.to_string(),
                    attrition.male.to_string(),
                    attrition.female.to_string(),
                    rate.percent_label(),
                ],
                IndicatorRow::Failed { period, error } => {
                    let mut cells = vec![period.to_string()];
                    cells.extend(std::iter::repeat(String::from("-")).take(10));
                    cells.push(error.clone());
                    cells
                }
            })
            .collect()
    }

    fn notes(&self) -> Vec<String> {
        let mut notes = vec![format!(
            "Final {} rate: {}",
            self.pipeline.kind.title().to_lowercase(),
            self.final_rate.percent_label()
        )];
        if !self.issues.is_empty() {
            notes.push(format!("{} data issue(s):", self.issues.len()));
            notes.extend(self.issues.iter().cloned());
        }
        notes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cohort::test_support::scenario_store;
    use crate::core::models::ProgramKey;

    fn request(kind: IndicatorKind, terms: i64) -> IndicatorRequest {
        IndicatorRequest {
            cohort: "20241".parse().expect("period"),
            terms,
            scope: ProgramScope::Program(ProgramKey::new("P1")),
            filter: AdmissionFilter::new(true, false),
            pipeline: Pipeline::new(kind),
            policy: AttritionPolicy::Signed,
        }
    }

    fn rates(report: &IndicatorReport) -> Vec<String> {
        report
            .rows
            .iter()
            .filter_map(|row| match row {
                IndicatorRow::Computed { rate, .. } => Some(rate.to_string()),
                IndicatorRow::Failed { .. } => None,
            })
            .collect()
    }

    #[test]
    fn retention_is_point_in_time() {
        let store = scenario_store();
        let ctx = RunContext::new("retention");
        let report =
            run_indicator(&store, &ctx, &request(IndicatorKind::Retention, 3)).expect("report");
        assert_eq!(rates(&report), ["100.00", "66.67", "33.33"]);
        assert_eq!(report.final_rate.to_string(), "33.33");
    }

    #[test]
    fn graduation_runs_and_can_sum_rates() {
        let store = scenario_store();
        let ctx = RunContext::new("graduation");
        let report =
            run_indicator(&store, &ctx, &request(IndicatorKind::Graduation, 3)).expect("report");
        assert_eq!(rates(&report), ["0.00", "33.33", "33.33"]);

        let mut summed = request(IndicatorKind::Graduation, 3);
        summed.pipeline = summed
            .pipeline
            .with_accumulation(AccumulationMode::SummedRates);
        let report = run_indicator(&store, &ctx, &summed).expect("report");
        assert_eq!(rates(&report), ["0.00", "33.33", "33.33"]);
    }

    #[test]
    fn degree_and_attrition() {
        let store = scenario_store();
        let ctx = RunContext::new("degree");
        let degree = run_indicator(&store, &ctx, &request(IndicatorKind::DegreeCompletion, 3))
            .expect("report");
        assert_eq!(degree.final_rate.to_string(), "33.33");

        let attrition =
            run_indicator(&store, &ctx, &request(IndicatorKind::Attrition, 3)).expect("report");
        assert_eq!(rates(&attrition), ["0.00", "33.33", "33.33"]);
    }

    #[test]
    fn retention_ignores_accumulation_override() {
        let pipeline =
            Pipeline::new(IndicatorKind::Retention).with_accumulation(AccumulationMode::Running);
        assert_eq!(pipeline.accumulation, AccumulationMode::PointInTime);
    }

    #[test]
    fn walks_past_the_last_term_are_rejected() {
        let start: Period = "20241".parse().expect("period");
        assert_eq!(term_count(start, 1952), Ok(1952));
        assert_eq!(
            term_count(start, 1953),
            Err(AnalyticsError::PeriodOutOfRange {
                start: "20241".into(),
                count: 1953,
            })
        );

        let store = scenario_store();
        let ctx = RunContext::new("long");
        assert!(matches!(
            run_indicator(&store, &ctx, &request(IndicatorKind::Retention, 130_000)),
            Err(AnalyticsError::PeriodOutOfRange { .. })
        ));
    }

    #[test]
    fn rejects_bad_parameters_before_querying() {
        let store = scenario_store();
        let ctx = RunContext::new("bad");
        assert_eq!(
            run_indicator(&store, &ctx, &request(IndicatorKind::Retention, -1)),
            Err(AnalyticsError::NegativePeriodCount(-1))
        );

        let mut unknown = request(IndicatorKind::Retention, 3);
        unknown.scope = ProgramScope::Program(ProgramKey::new("ZZZ"));
        assert_eq!(
            run_indicator(&store, &ctx, &unknown),
            Err(AnalyticsError::ProgramNotFound("ZZZ".into()))
        );
    }

    #[test]
    fn table_has_one_line_per_term() {
        let store = scenario_store();
        let ctx = RunContext::new("table");
        let report =
            run_indicator(&store, &ctx, &request(IndicatorKind::Attrition, 4)).expect("report");
        let rows = report.rows();
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|r| r.len() == report.header().len()));
        assert_eq!(rows[1][10], "1");
        assert!(report.notes()[0].ends_with("66.67 %"));
    }

    #[test]
    fn parses_kind_aliases() {
        assert_eq!(
            "permanencia".parse::<IndicatorKind>(),
            Ok(IndicatorKind::Retention)
        );
        assert_eq!(
            "titulacion".parse::<IndicatorKind>(),
            Ok(IndicatorKind::DegreeCompletion)
        );
        assert!("other".parse::<IndicatorKind>().is_err());
    }
}
