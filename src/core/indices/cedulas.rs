//! Accreditation tables (CACEI and CACECA)
//!
//! Both follow consecutive entry generations of one program through a
//! nine-term window. A generation whose window has any failed term is
//! reported as failed: its figures depend on the roster at the window end.

use super::{scope_name, BatchScheduler};
use crate::core::cohort::{
    count_rate, select, validate_scope, CohortKey, CohortTrack, CohortTracker, Rate, RunContext,
};
use crate::core::error::{serialize_display, AnalyticsError, AnalyticsResult};
use crate::core::models::{AdmissionFilter, Period, ProgramKey, ProgramScope};
use crate::core::report::TabularReport;
use crate::core::store::RecordStore;
use serde::Serialize;

/// Terms in the window of every generation, entry term included
pub const WINDOW_TERMS: usize = 9;
/// Generations in a CACEI table unless asked otherwise
pub const CACEI_GENERATIONS: usize = 10;
/// Generations in a CACECA table
pub const CACECA_GENERATIONS: usize = 3;

/// Parameters shared by both tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CedulaRequest {
    /// Entry term of the first generation
    pub cohort: Period,
    /// Program the table describes
    pub program: ProgramKey,
    /// Admission classes that define each generation
    pub filter: AdmissionFilter,
    /// Generations to include (CACEI only)
    pub generations: usize,
}

impl CedulaRequest {
    /// Request with the default generation count
    #[must_use]
    pub const fn new(cohort: Period, program: ProgramKey, filter: AdmissionFilter) -> Self {
        Self {
            cohort,
            program,
            filter,
            generations: CACEI_GENERATIONS,
        }
    }

    fn scope(&self) -> ProgramScope {
        ProgramScope::Program(self.program.clone())
    }
}

/// A generation that could not be computed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedGeneration {
    /// Entry term
    pub entry: Period,
    /// First window term that failed; `None` when selection itself failed
    pub term: Option<Period>,
    /// Why
    #[serde(serialize_with = "serialize_display")]
    pub error: AnalyticsError,
}

/// One CACEI generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaceiGeneration {
    /// Window label, `2/20201 - 2/20241`
    pub label: String,
    /// Entry term
    pub entry: Period,
    /// Admissions of the selected classes across every program
    pub total_population: usize,
    /// Admissions into this program
    pub population: usize,
    /// Program population over total population
    pub share: Rate,
    /// Graduates inside the window
    pub graduates: usize,
    /// Graduates over program population
    pub graduation_rate: Rate,
    /// Degrees inside the window
    pub degrees: usize,
    /// Degrees over program population
    pub degree_rate: Rate,
}

/// One CACECA generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacecaGeneration {
    /// Window label, `20201 - 20241`
    pub label: String,
    /// Entry term
    pub entry: Period,
    /// Members at entry
    pub initial: usize,
    /// Members still enrolled at the end of the window
    pub active: usize,
    /// Graduates inside the window
    pub graduates: usize,
    /// Degrees inside the window
    pub degrees: usize,
    /// Members lost without graduating
    pub attrition: usize,
    /// Members neither graduated nor lost
    pub lagging: usize,
    /// Graduates over initial
    pub graduation_rate: Rate,
    /// Degrees over initial
    pub degree_rate: Rate,
    /// Attrition over initial
    pub attrition_rate: Rate,
    /// Lagging over initial
    pub lagging_rate: Rate,
}

/// One generation of an accreditation table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Generation<T> {
    /// Computed generation
    Computed(T),
    /// Failed generation
    Failed(FailedGeneration),
}

/// CACEI table for one program
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaceiReport {
    /// Program
    pub program: String,
    /// Admission classes
    pub filter: String,
    /// Generations, oldest first
    pub generations: Vec<Generation<CaceiGeneration>>,
    /// Data issues found during the run
    pub issues: Vec<String>,
}

/// CACECA table for one program
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacecaReport {
    /// Program
    pub program: String,
    /// Admission classes
    pub filter: String,
    /// Generations, oldest first
    pub generations: Vec<Generation<CacecaGeneration>>,
    /// Data issues found during the run
    pub issues: Vec<String>,
}

fn window(entry: Period) -> AnalyticsResult<(Period, Period)> {
    let end = entry.offset(WINDOW_TERMS - 1).ok_or_else(|| AnalyticsError::PeriodOutOfRange {
        start: entry.to_string(),
        count: WINDOW_TERMS,
    })?;
    Ok((entry, end))
}

/// Track one generation of `request.program` through its window
fn track_generation(
    store: &dyn RecordStore,
    ctx: &RunContext,
    request: &CedulaRequest,
    entry: Period,
) -> AnalyticsResult<CohortTrack> {
    let ctx = ctx.child(&entry.to_string());
    let key = CohortKey::new(entry, request.filter.types(), request.scope());
    let cohort = select(store, key)?;
    Ok(CohortTracker::new(store, &ctx).track(&cohort, WINDOW_TERMS))
}

/// Entry terms of `count` generations, checking the last window stays
/// representable
fn entries(request: &CedulaRequest, count: usize) -> AnalyticsResult<Vec<Period>> {
    let entries = request.cohort.sequence(count)?;
    if let Some(&last) = entries.last() {
        window(last)?;
    }
    Ok(entries)
}

fn run_generations<T, F>(
    store: &dyn RecordStore,
    ctx: &RunContext,
    scheduler: &BatchScheduler,
    request: &CedulaRequest,
    count: usize,
    build: F,
) -> AnalyticsResult<Vec<Generation<T>>>
where
    T: Send,
    F: Fn(Period, &CohortTrack) -> AnalyticsResult<T> + Sync + Send,
{
    let generations = entries(request, count)?;
    Ok(scheduler.map(generations, |entry| {
        let outcome = match track_generation(store, ctx, request, entry) {
            Ok(track) => match track.first_failure() {
                Some((term, error)) => Err((Some(term), error.clone())),
                None => build(entry, &track).map_err(|e| (None, e)),
            },
            Err(error) => Err((None, error)),
        };
        match outcome {
            Ok(generation) => Generation::Computed(generation),
            Err((term, error)) => {
                ctx.logger()
                    .error(format_args!("generation {entry}: {error}"));
                Generation::Failed(FailedGeneration { entry, term, error })
            }
        }
    }))
}

/// CACEI table: `request.generations` consecutive generations.
///
/// # Errors
///
/// [`AnalyticsError::ProgramNotFound`] for an unknown program,
/// [`AnalyticsError::PeriodOutOfRange`] when a window runs past the last
/// representable term.
pub fn cacei(
    store: &dyn RecordStore,
    ctx: &RunContext,
    scheduler: &BatchScheduler,
    request: &CedulaRequest,
) -> AnalyticsResult<CaceiReport> {
    let scope = request.scope();
    validate_scope(store, &scope)?;
    ctx.logger().info(format_args!(
        "CACEI table for {} from {}, {} generation(s)",
        request.program, request.cohort, request.generations
    ));
    let types = request.filter.types();

    let generations = run_generations(
        store,
        ctx,
        scheduler,
        request,
        request.generations,
        |entry, track| {
            let (start, end) = window(entry)?;
            let total_population = store.admissions(&types, entry, &ProgramScope::All)?.len();
            let (graduates, degrees) = track
                .last_row()
                .map_or((0, 0), |row| (row.graduated_total, row.degree_total));
            Ok(CaceiGeneration {
                label: format!(
                    "{} - {}",
                    start.accreditation_label(),
                    end.accreditation_label()
                ),
                entry,
                total_population,
                population: track.size,
                share: count_rate(track.size, total_population),
                graduates,
                graduation_rate: count_rate(graduates, track.size),
                degrees,
                degree_rate: count_rate(degrees, track.size),
            })
        },
    )?;

    Ok(CaceiReport {
        program: scope_name(store, &scope),
        filter: request.filter.to_string(),
        generations,
        issues: ctx.issues().iter().map(ToString::to_string).collect(),
    })
}

/// CACECA table: three consecutive generations.
///
/// # Errors
///
/// [`AnalyticsError::ProgramNotFound`] for an unknown program,
/// [`AnalyticsError::PeriodOutOfRange`] when a window runs past the last
/// representable term.
pub fn caceca(
    store: &dyn RecordStore,
    ctx: &RunContext,
    scheduler: &BatchScheduler,
    request: &CedulaRequest,
) -> AnalyticsResult<CacecaReport> {
    let scope = request.scope();
    validate_scope(store, &scope)?;
    ctx.logger().info(format_args!(
        "CACECA table for {} from {}",
        request.program, request.cohort
    ));

    let generations = run_generations(
        store,
        ctx,
        scheduler,
        request,
        CACECA_GENERATIONS,
        |entry, track| {
            let (start, end) = window(entry)?;
            let initial = track.size;
            let (active, graduates, degrees) = track.last_row().map_or((0, 0, 0), |row| {
                (
                    row.snapshot.active_count,
                    row.graduated_total,
                    row.degree_total,
                )
            });
            let attrition = initial.saturating_sub(active + graduates);
            let lagging = initial.saturating_sub(graduates + attrition);
            Ok(CacecaGeneration {
                label: format!("{start} - {end}"),
                entry,
                initial,
                active,
                graduates,
                degrees,
                attrition,
                lagging,
                graduation_rate: count_rate(graduates, initial),
                degree_rate: count_rate(degrees, initial),
                attrition_rate: count_rate(attrition, initial),
                lagging_rate: count_rate(lagging, initial),
            })
        },
    )?;

    Ok(CacecaReport {
        program: scope_name(store, &scope),
        filter: request.filter.to_string(),
        generations,
        issues: ctx.issues().iter().map(ToString::to_string).collect(),
    })
}

fn failed_row(failed: &FailedGeneration, width: usize) -> Vec<String> {
    let reason = match failed.term {
        Some(term) => format!("{term}: {}", failed.error),
        None => failed.error.to_string(),
    };
    let mut cells = vec![failed.entry.to_string(), reason];
    cells.resize(width, "-".to_string());
    cells
}

impl TabularReport for CaceiReport {
    fn title(&self) -> String {
        "CACEI graduation and degree table".to_string()
    }

    fn metadata(&self) -> Vec<(String, String)> {
        vec![
            ("Program".to_string(), self.program.clone()),
            ("Admission types".to_string(), self.filter.clone()),
        ]
    }

    fn header(&self) -> Vec<String> {
        [
            "Generation",
            "Total population",
            "Population",
            "Share",
            "Graduates",
            "Graduation rate",
            "Degrees",
            "Degree rate",
        ]
        .map(String::from)
        .to_vec()
    }

    fn rows(&self) -> Vec<Vec<String>> {
        let width = self.header().len();
        self.generations
            .iter()
            .map(|generation| match generation {
                Generation::Computed(g) => vec![
                    g.label.clone(),
                    g.total_population.to_string(),
                    g.population.to_string(),
                    g.share.percent_label(),
                    g.graduates.to_string(),
                    g.graduation_rate.percent_label(),
                    g.degrees.to_string(),
                    g.degree_rate.percent_label(),
                ],
                Generation::Failed(failed) => failed_row(failed, width),
            })
            .collect()
    }

    fn notes(&self) -> Vec<String> {
        self.issues.clone()
    }
}

impl TabularReport for CacecaReport {
    fn title(&self) -> String {
        "CACECA retention and graduation table".to_string()
    }

    fn metadata(&self) -> Vec<(String, String)> {
        vec![
            ("Program".to_string(), self.program.clone()),
            ("Admission types".to_string(), self.filter.clone()),
        ]
    }

    fn header(&self) -> Vec<String> {
        [
            "Generation",
            "Initial",
            "Active",
            "Graduates",
            "Graduation rate",
            "Degrees",
            "Degree rate",
            "Attrition",
            "Attrition rate",
            "Lagging",
            "Lagging rate",
        ]
        .map(String::from)
        .to_vec()
    }

    fn rows(&self) -> Vec<Vec<String>> {
        let width = self.header().len();
        self.generations
            .iter()
            .map(|generation| match generation {
                Generation::Computed(g) => vec![
                    g.label.clone(),
                    g.initial.to_string(),
                    g.active.to_string(),
                    g.graduates.to_string(),
                    g.graduation_rate.percent_label(),
                    g.degrees.to_string(),
                    g.degree_rate.percent_label(),
                    g.attrition.to_string(),
                    g.attrition_rate.percent_label(),
                    g.lagging.to_string(),
                    g.lagging_rate.percent_label(),
                ],
                Generation::Failed(failed) => failed_row(failed, width),
            })
            .collect()
    }

    fn notes(&self) -> Vec<String> {
        self.issues.clone()
    }
}
