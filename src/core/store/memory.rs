//! In-memory record store indexed by term

use super::RecordStore;
use crate::core::error::{AnalyticsError, AnalyticsResult};
use crate::core::models::{
    AdmissionRecord, AdmissionType, AdmissionTypeSet, DegreeRecord, EnglishWaiver, Gender,
    Period, Person, Program, ProgramKey, ProgramScope, Student, StudentId,
    StudentSet,
};
use std::collections::{BTreeMap, HashMap};

/// Record store held entirely in memory.
///
/// Records are append-only: the `add_*` methods are used while loading, after
/// which the store is shared read-only across tracking runs.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    programs: BTreeMap<ProgramKey, Program>,
    students: HashMap<StudentId, Student>,
    persons: HashMap<String, Person>,
    admissions: HashMap<Period, Vec<AdmissionRecord>>,
    graduations: HashMap<Period, StudentSet>,
    degrees: HashMap<Period, Vec<DegreeRecord>>,
    waivers: Vec<EnglishWaiver>,
}

/// Record totals, for dataset summaries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    /// Programs
    pub programs: usize,
    /// Students
    pub students: usize,
    /// Person records
    pub persons: usize,
    /// Admission records
    pub admissions: usize,
    /// Graduation records
    pub graduations: usize,
    /// Degree records
    pub degrees: usize,
    /// English waivers
    pub waivers: usize,
}

impl InMemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a program
    pub fn add_program(&mut self, program: Program) {
        self.programs.insert(program.key.clone(), program);
    }

    /// Register a person record keyed by CURP
    pub fn add_person(&mut self, person: Person) {
        self.persons.insert(person.curp.clone(), person);
    }

    /// Register a student; returns `false` if the control number was already present
    pub fn add_student(&mut self, student: Student) -> bool {
        self.students.insert(student.id.clone(), student).is_none()
    }

    /// Append an admission record
    pub fn add_admission(&mut self, student: StudentId, period: Period, kind: AdmissionType) {
        self.admissions
            .entry(period)
            .or_default()
            .push(AdmissionRecord {
                student,
                period,
                kind,
            });
    }

    /// Append a graduation record
    pub fn add_graduation(&mut self, student: StudentId, period: Period) {
        self.graduations.entry(period).or_default().insert(student);
    }

    /// Append a degree record
    pub fn add_degree(&mut self, student: StudentId, period: Period, degree_type: impl Into<String>) {
        self.degrees.entry(period).or_default().push(DegreeRecord {
            student,
            period,
            degree_type: degree_type.into(),
        });
    }

    /// Append an English waiver
    pub fn add_waiver(&mut self, student: StudentId, period: Period) {
        self.waivers.push(EnglishWaiver { student, period });
    }

    /// Look up a student
    #[must_use]
    pub fn student(&self, id: &StudentId) -> Option<&Student> {
        self.students.get(id)
    }

    /// Whether a student exists
    #[must_use]
    pub fn has_student(&self, id: &StudentId) -> bool {
        self.students.contains_key(id)
    }

    /// Whether a person record exists for a CURP
    #[must_use]
    pub fn has_person(&self, curp: &str) -> bool {
        self.persons.contains_key(curp)
    }

    /// Whether a program key is registered
    #[must_use]
    pub fn has_program(&self, key: &ProgramKey) -> bool {
        self.programs.contains_key(key)
    }

    /// English waivers in load order
    #[must_use]
    pub fn waivers(&self) -> &[EnglishWaiver] {
        &self.waivers
    }

    /// Record totals
    #[must_use]
    pub fn counts(&self) -> StoreCounts {
        StoreCounts {
            programs: self.programs.len(),
            students: self.students.len(),
            persons: self.persons.len(),
            admissions: self.admissions.values().map(Vec::len).sum(),
            graduations: self.graduations.values().map(StudentSet::len).sum(),
            degrees: self.degrees.values().map(Vec::len).sum(),
            waivers: self.waivers.len(),
        }
    }

    /// Every record that points at an unknown student.
    ///
    /// Graduation and degree records are checked first since those indicate
    /// upstream corruption; admissions follow.
    #[must_use]
    pub fn dangling_references(&self) -> Vec<AnalyticsError> {
        let mut found = Vec::new();
        let mut check = |student: &StudentId, kind: &str| {
            if !self.students.contains_key(student) {
                found.push(AnalyticsError::dangling(student.as_str(), kind));
            }
        };

        for period in sorted_keys(&self.graduations) {
            for student in &self.graduations[&period] {
                check(student, "graduation");
            }
        }
        for period in sorted_keys(&self.degrees) {
            for record in &self.degrees[&period] {
                check(&record.student, "degree");
            }
        }
        for period in sorted_keys(&self.admissions) {
            for record in &self.admissions[&period] {
                check(&record.student, "admission");
            }
        }
        found
    }

    fn in_scope(&self, student: &StudentId, scope: &ProgramScope) -> bool {
        match scope {
            ProgramScope::All => true,
            ProgramScope::Program(key) => self
                .students
                .get(student)
                .is_some_and(|s| &s.program == key),
        }
    }
}

fn sorted_keys<V>(map: &HashMap<Period, V>) -> Vec<Period> {
    let mut keys: Vec<Period> = map.keys().copied().collect();
    keys.sort_unstable();
    keys
}

impl RecordStore for InMemoryStore {
    fn programs(&self) -> Vec<Program> {
        self.programs.values().cloned().collect()
    }

    fn program(&self, key: &ProgramKey) -> Option<Program> {
        self.programs.get(key).cloned()
    }

    fn admissions(
        &self,
        types: &AdmissionTypeSet,
        period: Period,
        scope: &ProgramScope,
    ) -> AnalyticsResult<StudentSet> {
        Ok(self
            .admissions
            .get(&period)
            .into_iter()
            .flatten()
            .filter(|r| types.contains(&r.kind) && self.in_scope(&r.student, scope))
            .map(|r| r.student.clone())
            .collect())
    }

    fn continuing(
        &self,
        types: &AdmissionTypeSet,
        period: Period,
        among: &StudentSet,
        scope: &ProgramScope,
    ) -> AnalyticsResult<StudentSet> {
        Ok(self
            .admissions
            .get(&period)
            .into_iter()
            .flatten()
            .filter(|r| {
                types.contains(&r.kind)
                    && among.contains(&r.student)
                    && self.in_scope(&r.student, scope)
            })
            .map(|r| r.student.clone())
            .collect())
    }

    fn admissions_by_program(
        &self,
        types: &AdmissionTypeSet,
        period: Period,
    ) -> AnalyticsResult<BTreeMap<ProgramKey, StudentSet>> {
        let mut grouped: BTreeMap<ProgramKey, StudentSet> = BTreeMap::new();
        for record in self.admissions.get(&period).into_iter().flatten() {
            if !types.contains(&record.kind) {
                continue;
            }
            if let Some(student) = self.students.get(&record.student) {
                grouped
                    .entry(student.program.clone())
                    .or_default()
                    .insert(record.student.clone());
            }
        }
        Ok(grouped)
    }

    fn graduated(&self, among: &StudentSet, period: Period) -> AnalyticsResult<StudentSet> {
        Ok(self
            .graduations
            .get(&period)
            .map(|graduates| graduates.intersection(among).cloned().collect())
            .unwrap_or_default())
    }

    fn degreed(&self, among: &StudentSet, period: Period) -> AnalyticsResult<StudentSet> {
        Ok(self
            .degrees
            .get(&period)
            .into_iter()
            .flatten()
            .filter(|r| among.contains(&r.student))
            .map(|r| r.student.clone())
            .collect())
    }

    fn gender_of(&self, student: &StudentId) -> AnalyticsResult<Gender> {
        let record = self
            .students
            .get(student)
            .ok_or_else(|| AnalyticsError::dangling(student.as_str(), "student"))?;
        self.persons
            .get(&record.curp)
            .map(|p| p.gender)
            .ok_or_else(|| AnalyticsError::dangling(student.as_str(), "person"))
    }

    fn profile(&self, student: &StudentId) -> Option<(Student, Option<Person>)> {
        let record = self.students.get(student)?;
        Some((record.clone(), self.persons.get(&record.curp).cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::Curp;

    fn period(s: &str) -> Period {
        s.parse().expect("period")
    }

    fn sample_store() -> InMemoryStore {
        let mut store = InMemoryStore::new();
        store.add_program(Program::new("ISC", "Ingenieria en Sistemas"));
        store.add_program(Program::new("IND", "Ingenieria Industrial"));

        let curp = Curp::parse("GOMJ040512HDFRRNA9").expect("curp");
        store.add_person(Person::from_curp(&curp));
        store.add_student(Student::new(
            "24010001".into(),
            curp.as_str(),
            ProgramKey::new("ISC"),
            "ISC-2010",
        ));
        store.add_student(Student::new(
            "24010002".into(),
            "LOPM980301MDFPRR03",
            ProgramKey::new("IND"),
            "IND-2010",
        ));
        store.add_admission("24010001".into(), period("20241"), AdmissionType::Exam);
        store.add_admission("24010002".into(), period("20241"), AdmissionType::Conversion);
        store.add_admission("24010001".into(), period("20243"), AdmissionType::Reenrollment);
        store.add_graduation("99010001".into(), period("20243"));
        store
    }

    #[test]
    fn admissions_respect_scope_and_types() {
        let store = sample_store();
        let types = AdmissionTypeSet::from([AdmissionType::Exam, AdmissionType::Conversion]);

        let all = store
            .admissions(&types, period("20241"), &ProgramScope::All)
            .expect("query");
        assert_eq!(all.len(), 2);

        let isc = store
            .admissions(
                &types,
                period("20241"),
                &ProgramScope::Program(ProgramKey::new("ISC")),
            )
            .expect("query");
        assert_eq!(isc, StudentSet::from(["24010001".into()]));

        let none = store
            .admissions(&AdmissionTypeSet::new(), period("20241"), &ProgramScope::All)
            .expect("query");
        assert!(none.is_empty());
    }

    #[test]
    fn groups_admissions_by_program() {
        let store = sample_store();
        let types = AdmissionTypeSet::from([AdmissionType::Exam, AdmissionType::Conversion]);
        let grouped = store
            .admissions_by_program(&types, period("20241"))
            .expect("query");
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[&ProgramKey::new("IND")].len(), 1);
    }

    #[test]
    fn missing_person_is_dangling() {
        let store = sample_store();
        assert_eq!(store.gender_of(&"24010001".into()), Ok(Gender::Male));
        assert_eq!(
            store.gender_of(&"24010002".into()),
            Err(AnalyticsError::dangling("24010002", "person"))
        );
        assert_eq!(
            store.gender_of(&"11010001".into()),
            Err(AnalyticsError::dangling("11010001", "student"))
        );
    }

    #[test]
    fn reports_dangling_graduations() {
        let store = sample_store();
        assert_eq!(
            store.dangling_references(),
            vec![AnalyticsError::dangling("99010001", "graduation")]
        );
    }
}
