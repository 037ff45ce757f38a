//! Generational reports: graduation or degree counts per program for one
//! entry generation, by semester of the walk

use super::{scope_name, term_count, BatchScheduler};
use crate::core::cohort::{
    count_rate, select, AttritionPolicy, CohortKey, CohortTrack, CohortTracker, GenderCounts, Rate,
    RunContext, TermRow,
};
use crate::core::error::{serialize_display, AnalyticsError, AnalyticsResult};
use crate::core::models::{AdmissionFilter, Period, ProgramKey, ProgramScope};
use crate::core::report::TabularReport;
use crate::core::store::RecordStore;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// First semester of the main window
pub const WINDOW_START: usize = 8;
/// Last semester of the main window
pub const WINDOW_END: usize = 12;

/// What a generational report counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationalKind {
    /// Graduation records
    Graduation,
    /// Degree records
    Degree,
}

impl GenerationalKind {
    fn counts(self, row: &TermRow) -> (GenderCounts, usize) {
        match self {
            Self::Graduation => (row.snapshot.graduated, row.snapshot.graduates.len()),
            Self::Degree => (row.snapshot.degrees, row.snapshot.degreed.len()),
        }
    }
}

impl FromStr for GenerationalKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "graduation" | "egreso" => Ok(Self::Graduation),
            "degree" | "titulacion" => Ok(Self::Degree),
            _ => Err(format!("Unknown generational report: {s}")),
        }
    }
}

impl fmt::Display for GenerationalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Graduation => f.write_str("Graduation"),
            Self::Degree => f.write_str("Degree"),
        }
    }
}

/// Counts at one semester of the window
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SemesterCount {
    /// 1-based semester of the walk
    pub semester: usize,
    /// Term of that semester
    pub period: Period,
    /// Count by gender
    pub counts: GenderCounts,
}

/// Window past semester 12
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LateWindow {
    /// Count by gender over semesters 13 and later
    pub counts: GenderCounts,
    /// Total over semesters 13 and later
    pub total: usize,
    /// Both windows together over the initial population
    pub cumulative_rate: Rate,
}

/// One program of a generational report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProgramGeneration {
    /// Computed program
    Computed {
        /// Program key
        program: ProgramKey,
        /// Program display name
        name: String,
        /// Initial population
        population: usize,
        /// Initial population by gender
        population_by_gender: GenderCounts,
        /// Semesters 8 to 12 that fall inside the walk
        semesters: Vec<SemesterCount>,
        /// Total over the main window
        total: usize,
        /// Main window total over the initial population
        rate: Rate,
        /// Present when more than 12 semesters were walked
        late: Option<LateWindow>,
        /// Terms that could not be computed
        failed_terms: usize,
    },
    /// Program whose cohort could not be selected
    Failed {
        /// Program key
        program: ProgramKey,
        /// Why
        #[serde(serialize_with = "serialize_display")]
        error: AnalyticsError,
    },
}

/// Parameters of a generational report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationalRequest {
    /// Entry term of the generation
    pub cohort: Period,
    /// Semesters to walk, entry included
    pub terms: i64,
    /// Admission classes that define the generation
    pub filter: AdmissionFilter,
    /// What to count
    pub kind: GenerationalKind,
}

/// Generational report over every program
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationalReport {
    /// What is counted
    pub kind: GenerationalKind,
    /// Entry term
    pub cohort: Period,
    /// Semesters walked
    pub terms: usize,
    /// Admission classes
    pub filter: String,
    /// One entry per program, ordered by key
    pub programs: Vec<ProgramGeneration>,
    /// Data issues found during the run
    pub issues: Vec<String>,
}

fn summarize(
    kind: GenerationalKind,
    program: ProgramKey,
    name: String,
    track: &CohortTrack,
) -> ProgramGeneration {
    let mut semesters = Vec::new();
    let mut total = 0;
    let mut late_counts = GenderCounts::default();
    let mut late_total = 0;

    for row in track.rows() {
        let (counts, count) = kind.counts(row);
        match row.semester {
            s if (WINDOW_START..=WINDOW_END).contains(&s) => {
                semesters.push(SemesterCount {
                    semester: s,
                    period: row.period(),
                    counts,
                });
                total += count;
            }
            s if s > WINDOW_END => {
                late_counts += counts;
                late_total += count;
            }
            _ => {}
        }
    }

    let late = (track.terms.len() > WINDOW_END).then(|| LateWindow {
        counts: late_counts,
        total: late_total,
        cumulative_rate: count_rate(total + late_total, track.size),
    });

    ProgramGeneration::Computed {
        program,
        name,
        population: track.size,
        population_by_gender: track.population,
        semesters,
        total,
        rate: count_rate(total, track.size),
        late,
        failed_terms: track.failed_terms(),
    }
}

/// Generational report for every program, programs run in parallel.
///
/// # Errors
///
/// [`AnalyticsError::NegativePeriodCount`] before any query. Per-program
/// failures become [`ProgramGeneration::Failed`] entries.
pub fn generational(
    store: &dyn RecordStore,
    ctx: &RunContext,
    scheduler: &BatchScheduler,
    request: &GenerationalRequest,
) -> AnalyticsResult<GenerationalReport> {
    let terms = term_count(request.cohort, request.terms)?;
    let types = request.filter.types();
    let programs = store.programs();
    ctx.logger().info(format_args!(
        "{} generational report for {} over {} program(s)",
        request.kind,
        request.cohort,
        programs.len()
    ));

    let entries = scheduler.map(programs, |program| {
        let child = ctx.child(program.key.as_str());
        let scope = ProgramScope::Program(program.key.clone());
        let key = CohortKey::new(request.cohort, types.clone(), scope.clone());
        match select(store, key) {
            Ok(cohort) => {
                let track = CohortTracker::new(store, &child)
                    .with_policy(AttritionPolicy::Signed)
                    .track(&cohort, terms);
                summarize(request.kind, program.key, scope_name(store, &scope), &track)
            }
            Err(error) => {
                child.logger().error(format_args!("{error}"));
                ProgramGeneration::Failed {
                    program: program.key,
                    error,
                }
            }
        }
    });

    Ok(GenerationalReport {
        kind: request.kind,
        cohort: request.cohort,
        terms,
        filter: request.filter.to_string(),
        programs: entries,
        issues: ctx.issues().iter().map(ToString::to_string).collect(),
    })
}

impl GenerationalReport {
    fn window_semesters(&self) -> Vec<usize> {
        (WINDOW_START..=WINDOW_END.min(self.terms)).collect()
    }

    fn has_late_window(&self) -> bool {
        self.terms > WINDOW_END
    }
}

impl TabularReport for GenerationalReport {
    fn title(&self) -> String {
        format!("{} by generation", self.kind)
    }

    fn metadata(&self) -> Vec<(String, String)> {
        vec![
            ("Cohort".to_string(), self.cohort.to_string()),
            ("Semesters".to_string(), self.terms.to_string()),
            ("Admission types".to_string(), self.filter.clone()),
        ]
    }

    fn header(&self) -> Vec<String> {
        let mut header = vec![
            "Program".to_string(),
            "Population".to_string(),
            "H".to_string(),
            "M".to_string(),
        ];
        for semester in self.window_semesters() {
            header.push(format!("S{semester} H"));
            header.push(format!("S{semester} M"));
        }
        header.push("Total".to_string());
        header.push("Rate".to_string());
        if self.has_late_window() {
            header.push(format!("S{}+ H", WINDOW_END + 1));
            header.push(format!("S{}+ M", WINDOW_END + 1));
            header.push("Cumulative rate".to_string());
        }
        header
    }

    fn rows(&self) -> Vec<Vec<String>> {
        let width = self.header().len();
        self.programs
            .iter()
            .map(|entry| match entry {
                ProgramGeneration::Computed {
                    name,
                    population,
                    population_by_gender,
                    semesters,
                    total,
                    rate,
                    late,
                    ..
                } => {
                    let mut cells = vec![
                        name.clone(),
                        population.to_string(),
                        population_by_gender.male.to_string(),
                        population_by_gender.female.to_string(),
                    ];
                    for semester in self.window_semesters() {
                        let counts = semesters
                            .iter()
                            .find(|s| s.semester == semester)
                            .map(|s| s.counts)
                            .unwrap_or_default();
                        cells.push(counts.male.to_string());
                        cells.push(counts.female.to_string());
                    }
                    cells.push(total.to_string());
                    cells.push(rate.percent_label());
                    if let Some(late) = late {
                        cells.push(late.counts.male.to_string());
                        cells.push(late.counts.female.to_string());
                        cells.push(late.cumulative_rate.percent_label());
                    }
                    cells
                }
                ProgramGeneration::Failed { program, error } => {
                    let mut cells = vec![program.to_string(), error.to_string()];
                    cells.resize(width, "-".to_string());
                    cells
                }
            })
            .collect()
    }

    fn notes(&self) -> Vec<String> {
        self.issues.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cohort::test_support::gendered_store;
    use crate::core::models::AdmissionType;
    use crate::core::store::InMemoryStore;

    /// P1 cohort 20201 of two: one graduates at semester 9 (20251), the other
    /// at semester 14 (20273) and receives the degree at semester 15
    fn long_store() -> InMemoryStore {
        let mut store = gendered_store();
        let start: Period = "20201".parse().expect("period");
        store.add_admission("24010001".into(), start, AdmissionType::Exam);
        store.add_admission("24010003".into(), start, AdmissionType::Exam);
        let terms = start.sequence(16).expect("sequence");
        for term in &terms[1..9] {
            store.add_admission("24010001".into(), *term, AdmissionType::Reenrollment);
        }
        for term in &terms[1..14] {
            store.add_admission("24010003".into(), *term, AdmissionType::Reenrollment);
        }
        store.add_graduation("24010001".into(), terms[8]);
        store.add_graduation("24010003".into(), terms[13]);
        store.add_degree("24010003".into(), terms[14], "exam");
        store
    }

    fn request(kind: GenerationalKind, terms: i64) -> GenerationalRequest {
        GenerationalRequest {
            cohort: "20201".parse().expect("period"),
            terms,
            filter: AdmissionFilter::new(true, false),
            kind,
        }
    }

    fn p1(report: &GenerationalReport) -> &ProgramGeneration {
        &report.programs[0]
    }

    #[test]
    fn main_window_counts_semesters_8_to_12() {
        let store = long_store();
        let ctx = RunContext::new("gen");
        let scheduler = BatchScheduler::new(2).expect("pool");
        let report = generational(&store, &ctx, &scheduler, &request(GenerationalKind::Graduation, 12))
            .expect("report");

        assert_eq!(report.programs.len(), 2);
        let ProgramGeneration::Computed {
            population,
            semesters,
            total,
            rate,
            late,
            ..
        } = p1(&report)
        else {
            panic!("P1 should compute");
        };
        assert_eq!(*population, 2);
        assert_eq!(semesters.len(), 5);
        assert_eq!(semesters[1].semester, 9);
        assert_eq!(semesters[1].counts, GenderCounts::new(1, 0));
        assert_eq!(*total, 1);
        assert_eq!(rate.to_string(), "50.00");
        assert!(late.is_none());
    }

    #[test]
    fn late_window_adds_cumulative_rate() {
        let store = long_store();
        let ctx = RunContext::new("gen");
        let scheduler = BatchScheduler::new(2).expect("pool");
        let report = generational(&store, &ctx, &scheduler, &request(GenerationalKind::Graduation, 16))
            .expect("report");

        let ProgramGeneration::Computed { late, .. } = p1(&report) else {
            panic!("P1 should compute");
        };
        let late = late.as_ref().expect("late window");
        assert_eq!(late.counts, GenderCounts::new(0, 1));
        assert_eq!(late.cumulative_rate.to_string(), "100.00");

        let header = report.header();
        assert_eq!(header.last().map(String::as_str), Some("Cumulative rate"));
        assert!(report.rows().iter().all(|r| r.len() == header.len()));
    }

    #[test]
    fn degree_report_counts_degrees() {
        let store = long_store();
        let ctx = RunContext::new("gen");
        let scheduler = BatchScheduler::new(1).expect("pool");
        let report = generational(&store, &ctx, &scheduler, &request(GenerationalKind::Degree, 16))
            .expect("report");
        let ProgramGeneration::Computed { total, late, .. } = p1(&report) else {
            panic!("P1 should compute");
        };
        assert_eq!(*total, 0);
        assert_eq!(late.as_ref().map(|l| l.total), Some(1));
    }

    #[test]
    fn short_walk_has_empty_window() {
        let store = long_store();
        let ctx = RunContext::new("gen");
        let scheduler = BatchScheduler::new(1).expect("pool");
        let report = generational(&store, &ctx, &scheduler, &request(GenerationalKind::Graduation, 6))
            .expect("report");
        let rows = report.rows();
        assert_eq!(report.header().len(), 6);
        assert_eq!(rows[0][4], "0");
    }
}
