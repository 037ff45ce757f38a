//! CSV dataset loader
//!
//! A dataset is a directory of CSV files, one per record family:
//!
//! | File | Columns | Required |
//! |---|---|---|
//! | `programs.csv` | `clave,nombre` | yes |
//! | `persons.csv` | `curp,nombre,genero,fecha_nacimiento` | no |
//! | `students.csv` | `no_control,curp,carrera,plan` | yes |
//! | `ingresos.csv` | `no_control,periodo,tipo` | yes |
//! | `egresos.csv` | `no_control,periodo` | yes |
//! | `titulaciones.csv` | `no_control,periodo,tipo` | yes |
//! | `liberaciones.csv` | `no_control,periodo` | no |
//!
//! Invalid rows are skipped and reported as [`LoadIssue`]s; the rest of the
//! file keeps loading.

use super::InMemoryStore;
use crate::core::error::{AnalyticsError, AnalyticsResult};
use crate::core::models::{
    AdmissionType, ControlNumber, Curp, Gender, Period, Person, Program, ProgramKey, Student,
    StudentId,
};
use crate::{debug, info};
use chrono::NaiveDate;
use csv::{ReaderBuilder, Trim};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// A row that could not be loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadIssue {
    /// File name inside the dataset directory
    pub file: String,
    /// 1-based row number; the header is row 1
    pub row: usize,
    /// Why the row was skipped
    pub reason: String,
}

impl fmt::Display for LoadIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.file, self.row, self.reason)
    }
}

/// Result of loading a dataset directory
#[derive(Debug, Clone, Default)]
pub struct LoadedDataset {
    /// Every valid record
    pub store: InMemoryStore,
    /// Rows that were skipped
    pub issues: Vec<LoadIssue>,
}

#[derive(Debug, Deserialize)]
struct ProgramRow {
    clave: String,
    nombre: String,
}

#[derive(Debug, Deserialize)]
struct PersonRow {
    curp: String,
    #[serde(default)]
    nombre: Option<String>,
    #[serde(default)]
    genero: Option<String>,
    #[serde(default)]
    fecha_nacimiento: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StudentRow {
    no_control: String,
    curp: String,
    carrera: String,
    #[serde(default)]
    plan: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TypedRecordRow {
    no_control: String,
    periodo: String,
    tipo: String,
}

#[derive(Debug, Deserialize)]
struct RecordRow {
    no_control: String,
    periodo: String,
}

/// Load every CSV file of a dataset directory into an [`InMemoryStore`].
///
/// # Errors
///
/// Returns [`AnalyticsError::Store`] when the directory or a required file
/// is missing or unreadable. Bad rows never fail the load.
pub fn load_dataset(dir: &Path) -> AnalyticsResult<LoadedDataset> {
    if !dir.is_dir() {
        return Err(AnalyticsError::Store(format!(
            "dataset directory not found: {}",
            dir.display()
        )));
    }
    info!("Loading dataset from {}", dir.display());

    let mut loader = Loader {
        dir,
        dataset: LoadedDataset::default(),
    };

    loader.read::<ProgramRow>("programs.csv", true, |store, row| {
        if row.clave.is_empty() {
            return Err("empty program key".to_string());
        }
        store.add_program(Program::new(&row.clave, row.nombre));
        Ok(())
    })?;

    loader.read::<PersonRow>("persons.csv", false, |store, row| {
        store.add_person(person_from_row(row)?);
        Ok(())
    })?;

    loader.read::<StudentRow>("students.csv", true, add_student)?;

    loader.read::<TypedRecordRow>("ingresos.csv", true, |store, row| {
        let student = known_student(store, &row.no_control)?;
        let period = parse_period(&row.periodo)?;
        let kind: AdmissionType = row.tipo.parse().map_err(|e: AnalyticsError| e.to_string())?;
        store.add_admission(student, period, kind);
        Ok(())
    })?;

    loader.read::<RecordRow>("egresos.csv", true, |store, row| {
        let student = known_student(store, &row.no_control)?;
        store.add_graduation(student, parse_period(&row.periodo)?);
        Ok(())
    })?;

    loader.read::<TypedRecordRow>("titulaciones.csv", true, |store, row| {
        let student = known_student(store, &row.no_control)?;
        store.add_degree(student, parse_period(&row.periodo)?, row.tipo);
        Ok(())
    })?;

    loader.read::<RecordRow>("liberaciones.csv", false, |store, row| {
        let student = known_student(store, &row.no_control)?;
        store.add_waiver(student, parse_period(&row.periodo)?);
        Ok(())
    })?;

    let dataset = loader.dataset;
    info!(
        "Dataset loaded: {} students, {} issue(s)",
        dataset.store.counts().students,
        dataset.issues.len()
    );
    Ok(dataset)
}

struct Loader<'a> {
    dir: &'a Path,
    dataset: LoadedDataset,
}

impl Loader<'_> {
    fn read<R: DeserializeOwned>(
        &mut self,
        file: &str,
        required: bool,
        mut apply: impl FnMut(&mut InMemoryStore, R) -> Result<(), String>,
    ) -> AnalyticsResult<()> {
        let path = self.dir.join(file);
        if !path.exists() {
            if required {
                return Err(AnalyticsError::Store(format!(
                    "missing required file: {}",
                    path.display()
                )));
            }
            debug!("Optional file {file} not present, skipping");
            return Ok(());
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .flexible(true)
            .from_path(&path)
            .map_err(|e| AnalyticsError::Store(format!("{}: {e}", path.display())))?;

        let mut loaded = 0usize;
        for (index, result) in reader.deserialize::<R>().enumerate() {
            // +2: 1-based rows plus the header
            let row = index + 2;
            let outcome = result
                .map_err(|e| e.to_string())
                .and_then(|record| apply(&mut self.dataset.store, record));
            match outcome {
                Ok(()) => loaded += 1,
                Err(reason) => self.dataset.issues.push(LoadIssue {
                    file: file.to_string(),
                    row,
                    reason,
                }),
            }
        }
        debug!("{file}: {loaded} row(s) loaded");
        Ok(())
    }
}

fn add_student(store: &mut InMemoryStore, row: StudentRow) -> Result<(), String> {
    let id = ControlNumber::parse(&row.no_control)
        .map_err(|e| e.to_string())?
        .into_id();
    let program = ProgramKey::new(&row.carrera);
    if !store.has_program(&program) {
        return Err(AnalyticsError::ProgramNotFound(row.carrera).to_string());
    }

    let curp = row.curp.trim().to_uppercase();
    if !store.has_person(&curp) {
        // A student with an unusable CURP is still loaded; its gender stays
        // unresolved and surfaces as a dangling reference during tracking.
        if let Ok(parsed) = Curp::parse(&curp) {
            store.add_person(Person::from_curp(&parsed));
        }
    }

    let plan = row.plan.unwrap_or_default();
    if !store.add_student(Student::new(id.clone(), curp, program, plan)) {
        return Err(format!("duplicate control number {id}"));
    }
    Ok(())
}

fn person_from_row(row: PersonRow) -> Result<Person, String> {
    let parsed = Curp::parse(&row.curp);
    let gender = match row.genero.as_deref().map(str::trim) {
        Some(code) if !code.is_empty() => code.parse::<Gender>().map_err(|e| e.to_string())?,
        _ => parsed.as_ref().map_err(ToString::to_string)?.gender(),
    };
    let birth_date = match row.fecha_nacimiento.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => Some(
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .map_err(|e| format!("invalid birth date '{text}': {e}"))?,
        ),
        _ => parsed.ok().and_then(|c| c.birth_date()),
    };

    Ok(Person {
        curp: row.curp.trim().to_uppercase(),
        name: row.nombre.filter(|n| !n.trim().is_empty()),
        gender,
        birth_date,
    })
}

fn known_student(store: &InMemoryStore, control_number: &str) -> Result<StudentId, String> {
    let id = StudentId::new(control_number);
    if store.has_student(&id) {
        Ok(id)
    } else {
        Err(format!("no student with control number {id}"))
    }
}

fn parse_period(value: &str) -> Result<Period, String> {
    value.parse::<Period>().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{AdmissionTypeSet, ProgramScope};
    use crate::core::store::RecordStore;
    use std::fs;

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).expect("write csv");
    }

    fn minimal_dataset(dir: &Path) {
        write(dir, "programs.csv", "clave,nombre\nISC,Sistemas\n");
        write(
            dir,
            "students.csv",
            "no_control,curp,carrera,plan\n\
             24010001,GOMJ040512HDFRRNA9,ISC,ISC-2010\n\
             BAD,GOMJ040512HDFRRNA9,ISC,ISC-2010\n\
             24010002,LOPM980301MDFPRR03,XYZ,XYZ-2010\n",
        );
        write(
            dir,
            "ingresos.csv",
            "no_control,periodo,tipo\n24010001,20241,EX\n24010001,2024-3,RE\n24010001,20242,RE\n",
        );
        write(dir, "egresos.csv", "no_control,periodo\n99999999,20243\n");
        write(dir, "titulaciones.csv", "no_control,periodo,tipo\n");
    }

    #[test]
    fn loads_valid_rows_and_reports_bad_ones() {
        let dir = tempfile::tempdir().expect("tempdir");
        minimal_dataset(dir.path());

        let dataset = load_dataset(dir.path()).expect("load");
        let counts = dataset.store.counts();
        assert_eq!(counts.students, 1);
        assert_eq!(counts.admissions, 2);
        assert_eq!(counts.persons, 1);

        let rows: Vec<(&str, usize)> = dataset
            .issues
            .iter()
            .map(|i| (i.file.as_str(), i.row))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("students.csv", 3),
                ("students.csv", 4),
                ("ingresos.csv", 4),
                ("egresos.csv", 2),
            ]
        );

        let entry = dataset
            .store
            .admissions(
                &AdmissionTypeSet::from([AdmissionType::Exam]),
                "20241".parse().expect("period"),
                &ProgramScope::All,
            )
            .expect("query");
        assert_eq!(entry.len(), 1);
    }

    #[test]
    fn missing_required_file_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "programs.csv", "clave,nombre\nISC,Sistemas\n");
        let err = load_dataset(dir.path()).expect_err("students.csv is required");
        assert!(matches!(err, AnalyticsError::Store(_)));
    }

    #[test]
    fn explicit_person_gender_wins_over_curp() {
        let dir = tempfile::tempdir().expect("tempdir");
        minimal_dataset(dir.path());
        write(
            dir.path(),
            "persons.csv",
            "curp,nombre,genero,fecha_nacimiento\nGOMJ040512HDFRRNA9,Jo Gomez,M,\n",
        );

        let dataset = load_dataset(dir.path()).expect("load");
        assert_eq!(
            dataset.store.gender_of(&StudentId::new("24010001")),
            Ok(Gender::Female)
        );
    }

    #[test]
    fn issue_display_names_file_and_row() {
        let issue = LoadIssue {
            file: "egresos.csv".into(),
            row: 7,
            reason: "no student".into(),
        };
        assert_eq!(issue.to_string(), "egresos.csv:7: no student");
    }
}
