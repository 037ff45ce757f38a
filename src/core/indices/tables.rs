//! Population tables and the cohort member listing

use super::{scope_name, term_count};
use crate::core::cohort::snapshot::count_by_gender;
use crate::core::cohort::{select, validate_scope, CohortKey, GenderCounts, RunContext};
use crate::core::error::{AnalyticsError, AnalyticsResult};
use crate::core::models::{
    AdmissionFilter, AdmissionType, AdmissionTypeSet, Gender, Period, ProgramKey, ProgramScope,
    StudentSet,
};
use crate::core::report::TabularReport;
use crate::core::store::RecordStore;
use serde::Serialize;
use std::collections::BTreeMap;

/// Parameters shared by the population tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRequest {
    /// First term
    pub start: Period,
    /// Number of terms
    pub terms: i64,
    /// Admission classes counted (population and new-admission tables)
    pub filter: AdmissionFilter,
    /// Program scope (growth table)
    pub scope: ProgramScope,
}

/// Student count with its gender split
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Headcount {
    /// Students counted, including those without a resolvable gender
    pub students: usize,
    /// Split by gender
    pub by_gender: GenderCounts,
}

impl Headcount {
    fn of(store: &dyn RecordStore, ctx: &RunContext, students: &StudentSet) -> Self {
        Self {
            students: students.len(),
            by_gender: count_by_gender(store, ctx, students, "admission"),
        }
    }
}

impl std::ops::AddAssign for Headcount {
    fn add_assign(&mut self, other: Self) {
        self.students += other.students;
        self.by_gender += other.by_gender;
    }
}

fn terms_of(request: &TableRequest, ctx: &RunContext) -> AnalyticsResult<Vec<Period>> {
    let terms = request
        .start
        .sequence(term_count(request.start, request.terms)?)?;
    ctx.logger().debug(format_args!("{} term(s) from {}", terms.len(), request.start));
    Ok(terms)
}

/// Admissions by program at one term
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopulationTerm {
    /// Term
    pub period: Period,
    /// Per program, only programs with admissions
    pub programs: BTreeMap<ProgramKey, Headcount>,
    /// Across programs
    pub total: Headcount,
}

/// Admissions of the selected classes per term and program
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopulationTable {
    /// Admission classes
    pub filter: String,
    /// Every program, in column order
    pub programs: Vec<ProgramKey>,
    /// One entry per term
    pub terms: Vec<PopulationTerm>,
    /// Data issues found during the run
    pub issues: Vec<String>,
}

/// Population table over `request.terms` terms.
///
/// # Errors
///
/// [`AnalyticsError::NegativePeriodCount`],
/// store failures, or an interrupted run.
pub fn population_table(
    store: &dyn RecordStore,
    ctx: &RunContext,
    request: &TableRequest,
) -> AnalyticsResult<PopulationTable> {
    let types = request.filter.types();
    let mut terms = Vec::new();
    for period in terms_of(request, ctx)? {
        ctx.checkpoint(&period.to_string())?;
        let mut total = Headcount::default();
        let programs: BTreeMap<ProgramKey, Headcount> = store
            .admissions_by_program(&types, period)?
            .into_iter()
            .map(|(program, students)| {
                let count = Headcount::of(store, ctx, &students);
                total += count;
                (program, count)
            })
            .collect();
        terms.push(PopulationTerm {
            period,
            programs,
            total,
        });
    }

    Ok(PopulationTable {
        filter: request.filter.to_string(),
        programs: store.programs().into_iter().map(|p| p.key).collect(),
        terms,
        issues: ctx.issues().iter().map(ToString::to_string).collect(),
    })
}

impl TabularReport for PopulationTable {
    fn title(&self) -> String {
        "Population by program".to_string()
    }

    fn metadata(&self) -> Vec<(String, String)> {
        vec![("Admission types".to_string(), self.filter.clone())]
    }

    fn header(&self) -> Vec<String> {
        let mut header = vec!["Period".to_string()];
        for program in &self.programs {
            header.push(format!("{program} H"));
            header.push(format!("{program} M"));
        }
        header.push("Total H".to_string());
        header.push("Total M".to_string());
        header.push("Total".to_string());
        header
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.terms
            .iter()
            .map(|term| {
                let mut cells = vec![term.period.to_string()];
                for program in &self.programs {
                    let count = term.programs.get(program).copied().unwrap_or_default();
                    cells.push(count.by_gender.male.to_string());
                    cells.push(count.by_gender.female.to_string());
                }
                cells.push(term.total.by_gender.male.to_string());
                cells.push(term.total.by_gender.female.to_string());
                cells.push(term.total.students.to_string());
                cells
            })
            .collect()
    }

    fn notes(&self) -> Vec<String> {
        self.issues.clone()
    }
}

/// Enrolled population at one term
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrowthRow {
    /// Term
    pub period: Period,
    /// Students with any admission record at the term
    pub population: Headcount,
    /// Difference with the previous term, zero for the first
    pub change: i64,
}

/// Term-by-term enrolled population of a scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrowthTable {
    /// Scope display name
    pub program: String,
    /// One entry per term
    pub rows: Vec<GrowthRow>,
    /// Data issues found during the run
    pub issues: Vec<String>,
}

/// Growth table: every admission type counts as enrolled.
///
/// # Errors
///
/// Unknown program, negative term count, store failures, or an interrupted
/// run.
pub fn growth_table(
    store: &dyn RecordStore,
    ctx: &RunContext,
    request: &TableRequest,
) -> AnalyticsResult<GrowthTable> {
    validate_scope(store, &request.scope)?;
    let every_type: AdmissionTypeSet = AdmissionType::ALL.into_iter().collect();
    let mut rows: Vec<GrowthRow> = Vec::new();
    for period in terms_of(request, ctx)? {
        ctx.checkpoint(&period.to_string())?;
        let students = store.admissions(&every_type, period, &request.scope)?;
        let population = Headcount::of(store, ctx, &students);
        let change = rows.last().map_or(0, |prev| {
            i64::try_from(population.students).unwrap_or(i64::MAX)
                - i64::try_from(prev.population.students).unwrap_or(i64::MAX)
        });
        rows.push(GrowthRow {
            period,
            population,
            change,
        });
    }

    Ok(GrowthTable {
        program: scope_name(store, &request.scope),
        rows,
        issues: ctx.issues().iter().map(ToString::to_string).collect(),
    })
}

impl TabularReport for GrowthTable {
    fn title(&self) -> String {
        "Population growth".to_string()
    }

    fn metadata(&self) -> Vec<(String, String)> {
        vec![("Program".to_string(), self.program.clone())]
    }

    fn header(&self) -> Vec<String> {
        ["Period", "H", "M", "Population", "Change"]
            .map(String::from)
            .to_vec()
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                vec![
                    row.period.to_string(),
                    row.population.by_gender.male.to_string(),
                    row.population.by_gender.female.to_string(),
                    row.population.students.to_string(),
                    format!("{:+}", row.change),
                ]
            })
            .collect()
    }

    fn notes(&self) -> Vec<String> {
        self.issues.clone()
    }
}

/// New admissions of one program across the requested terms
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewAdmissionProgram {
    /// Program key
    pub program: ProgramKey,
    /// Program display name
    pub name: String,
    /// One count per requested term, in term order
    pub terms: Vec<Headcount>,
    /// Over every term
    pub total: Headcount,
}

/// New admissions per program and term
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewAdmissionTable {
    /// Admission classes
    pub filter: String,
    /// Requested terms, in column order
    pub periods: Vec<Period>,
    /// One entry per program, ordered by key
    pub programs: Vec<NewAdmissionProgram>,
    /// Data issues found during the run
    pub issues: Vec<String>,
}

/// New-admission table over every program.
///
/// # Errors
///
/// Negative term count, store failures, or an interrupted run.
pub fn new_admission_table(
    store: &dyn RecordStore,
    ctx: &RunContext,
    request: &TableRequest,
) -> AnalyticsResult<NewAdmissionTable> {
    let types = request.filter.types();
    let periods = terms_of(request, ctx)?;
    let mut programs: Vec<NewAdmissionProgram> = store
        .programs()
        .into_iter()
        .map(|p| NewAdmissionProgram {
            program: p.key,
            name: p.name,
            terms: Vec::with_capacity(periods.len()),
            total: Headcount::default(),
        })
        .collect();

    for period in &periods {
        ctx.checkpoint(&period.to_string())?;
        let grouped = store.admissions_by_program(&types, *period)?;
        for entry in &mut programs {
            let count = grouped
                .get(&entry.program)
                .map(|students| Headcount::of(store, ctx, students))
                .unwrap_or_default();
            entry.total += count;
            entry.terms.push(count);
        }
    }

    Ok(NewAdmissionTable {
        filter: request.filter.to_string(),
        periods,
        programs,
        issues: ctx.issues().iter().map(ToString::to_string).collect(),
    })
}

impl TabularReport for NewAdmissionTable {
    fn title(&self) -> String {
        "New admissions by program".to_string()
    }

    fn metadata(&self) -> Vec<(String, String)> {
        vec![("Admission types".to_string(), self.filter.clone())]
    }

    fn header(&self) -> Vec<String> {
        let mut header = vec!["Program".to_string()];
        for period in &self.periods {
            header.push(format!("{period} H"));
            header.push(format!("{period} M"));
        }
        header.push("Total".to_string());
        header
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.programs
            .iter()
            .map(|entry| {
                let mut cells = vec![format!("{} ({})", entry.name, entry.program)];
                for count in &entry.terms {
                    cells.push(count.by_gender.male.to_string());
                    cells.push(count.by_gender.female.to_string());
                }
                cells.push(entry.total.students.to_string());
                cells
            })
            .collect()
    }

    fn notes(&self) -> Vec<String> {
        self.issues.clone()
    }
}

/// One cohort member in a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListedStudent {
    /// Control number
    pub control_number: String,
    /// Program key, when the student record resolves
    pub program: Option<ProgramKey>,
    /// Curriculum version
    pub plan: Option<String>,
    /// Person name, when known
    pub name: Option<String>,
    /// Gender, when the person record resolves
    pub gender: Option<Gender>,
}

/// The members of one cohort
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CohortListing {
    /// Cohort definition
    pub cohort: CohortKey,
    /// Scope display name
    pub program: String,
    /// Members ordered by control number
    pub students: Vec<ListedStudent>,
    /// Data issues found during the run
    pub issues: Vec<String>,
}

/// List the members of a cohort.
///
/// # Errors
///
/// Unknown program or store failures.
pub fn cohort_listing(
    store: &dyn RecordStore,
    ctx: &RunContext,
    entry: Period,
    filter: AdmissionFilter,
    scope: ProgramScope,
) -> AnalyticsResult<CohortListing> {
    validate_scope(store, &scope)?;
    let program = scope_name(store, &scope);
    let cohort = select(store, CohortKey::new(entry, filter.types(), scope))?;

    let students = cohort
        .members
        .iter()
        .map(|id| match store.profile(id) {
            Some((student, person)) => ListedStudent {
                control_number: id.to_string(),
                program: Some(student.program),
                plan: Some(student.plan),
                name: person.as_ref().and_then(|p| p.name.clone()),
                gender: person.map(|p| p.gender),
            },
            None => {
                ctx.report_issue(AnalyticsError::dangling(id.as_str(), "admission"));
                ListedStudent {
                    control_number: id.to_string(),
                    program: None,
                    plan: None,
                    name: None,
                    gender: None,
                }
            }
        })
        .collect();

    Ok(CohortListing {
        cohort: cohort.key,
        program,
        students,
        issues: ctx.issues().iter().map(ToString::to_string).collect(),
    })
}

impl TabularReport for CohortListing {
    fn title(&self) -> String {
        format!("Cohort {}", self.cohort.entry)
    }

    fn metadata(&self) -> Vec<(String, String)> {
        let types: Vec<&str> = self.cohort.types.iter().map(|t| t.code()).collect();
        vec![
            ("Program".to_string(), self.program.clone()),
            ("Admission types".to_string(), types.join(",")),
            ("Members".to_string(), self.students.len().to_string()),
        ]
    }

    fn header(&self) -> Vec<String> {
        ["Control number", "Program", "Plan", "Name", "Gender"]
            .map(String::from)
            .to_vec()
    }

    fn rows(&self) -> Vec<Vec<String>> {
        let or_dash = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());
        self.students
            .iter()
            .map(|s| {
                vec![
                    s.control_number.clone(),
                    or_dash(s.program.as_ref().map(ToString::to_string)),
                    or_dash(s.plan.clone()),
                    or_dash(s.name.clone()),
                    or_dash(s.gender.map(|g| g.code().to_string())),
                ]
            })
            .collect()
    }

    fn notes(&self) -> Vec<String> {
        self.issues.clone()
    }
}
