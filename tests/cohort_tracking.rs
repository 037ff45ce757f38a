//! End-to-end tracking over the sample dataset

mod common;

use cohort_analytics::core::cohort::{
    select, CancellationToken, CohortKey, CohortTracker, GenderCounts, RunContext,
};
use cohort_analytics::core::indices::cedulas::Generation;
use cohort_analytics::core::indices::generational::ProgramGeneration;
use cohort_analytics::core::indices::{
    caceca, cacei, cohort_listing, generational, growth_table, population_table, run_indicator,
    AccumulationMode, BatchScheduler, CedulaRequest, GenerationalKind, GenerationalRequest,
    IndicatorKind, IndicatorRow, Pipeline, TableRequest,
};
use cohort_analytics::core::models::{AdmissionFilter, Period, ProgramKey, ProgramScope};
use cohort_analytics::core::report::TabularReport;
use common::{isc_request, sample_store};

fn period(s: &str) -> Period {
    s.parse().expect("period")
}

fn active_counts(rows: &[IndicatorRow]) -> Vec<usize> {
    rows.iter()
        .filter_map(|row| match row {
            IndicatorRow::Computed { active_count, .. } => Some(*active_count),
            IndicatorRow::Failed { .. } => None,
        })
        .collect()
}

#[test]
fn retention_follows_the_isc_cohort() {
    let report = common::retention_report();
    assert_eq!(report.size, 5);
    assert_eq!(report.population, GenderCounts::new(3, 2));
    assert_eq!(active_counts(&report.rows), [5, 5, 4, 4, 4, 4, 4, 4, 2]);
    assert_eq!(report.final_rate.to_string(), "40.00");
}

#[test]
fn cumulative_indicators_over_nine_terms() {
    let store = sample_store();
    let ctx = RunContext::new("indicators");
    let final_rate = |kind| {
        run_indicator(&store, &ctx, &isc_request(kind))
            .expect("indicator")
            .final_rate
            .to_string()
    };
    assert_eq!(final_rate(IndicatorKind::Graduation), "40.00");
    assert_eq!(final_rate(IndicatorKind::DegreeCompletion), "20.00");
    assert_eq!(final_rate(IndicatorKind::Attrition), "20.00");
}

#[test]
fn returning_student_nets_out_of_attrition() {
    let store = sample_store();
    let ctx = RunContext::new("attrition");
    let cohort = select(
        &store,
        CohortKey::new(
            period("20201"),
            AdmissionFilter::new(true, false).types(),
            ProgramScope::parse(Some("ISC")),
        ),
    )
    .expect("select");
    let track = CohortTracker::new(&store, &ctx).track(&cohort, 9);

    let steps: Vec<GenderCounts> = track.rows().map(|row| row.attrition).collect();
    // 20010004 leaves at 20211 and returns at 20213 while 20010002 drops out
    assert_eq!(steps[2], GenderCounts::new(0, 1));
    assert_eq!(steps[3], GenderCounts::new(1, -1));
    // Graduates of 20233 are not losses at 20241
    assert_eq!(steps[8], GenderCounts::default());
    let last = track.last_row().expect("rows");
    assert_eq!(last.attrition_to_date, GenderCounts::new(1, 0));
    assert_eq!(ctx.issue_count(), 0);
}

#[test]
fn summed_rates_match_running_when_nobody_returns() {
    let store = sample_store();
    let ctx = RunContext::new("graduation");
    let mut request = isc_request(IndicatorKind::Graduation);
    request.pipeline = Pipeline::new(IndicatorKind::Graduation)
        .with_accumulation(AccumulationMode::SummedRates);
    let report = run_indicator(&store, &ctx, &request).expect("indicator");
    assert_eq!(report.final_rate.to_string(), "40.00");
}

#[test]
fn transfer_cohort_is_separate() {
    let store = sample_store();
    let ctx = RunContext::new("transfer");
    let mut request = isc_request(IndicatorKind::Retention);
    request.filter = AdmissionFilter::new(false, true);
    let report = run_indicator(&store, &ctx, &request).expect("indicator");
    assert_eq!(report.size, 1);
    assert_eq!(report.population, GenderCounts::new(0, 1));
    assert_eq!(&active_counts(&report.rows)[..3], [1, 1, 0]);
}

#[test]
fn cancelled_run_marks_every_term() {
    let store = sample_store();
    let token = CancellationToken::new();
    token.cancel();
    let ctx = RunContext::new("cancelled").with_cancellation(token);
    let report =
        run_indicator(&store, &ctx, &isc_request(IndicatorKind::Retention)).expect("indicator");
    assert_eq!(report.rows.len(), 9);
    assert!(report
        .rows
        .iter()
        .all(|row| matches!(row, IndicatorRow::Failed { .. })));
}

#[test]
fn generational_graduation_per_program() {
    let store = sample_store();
    let ctx = RunContext::new("generational");
    let scheduler = BatchScheduler::new(2).expect("pool");
    let request = GenerationalRequest {
        cohort: period("20201"),
        terms: 12,
        filter: AdmissionFilter::new(true, false),
        kind: GenerationalKind::Graduation,
    };
    let report = generational(&store, &ctx, &scheduler, &request).expect("report");

    // Programs come back ordered by key: IND, ISC
    let rates: Vec<(String, usize, String)> = report
        .programs
        .iter()
        .map(|entry| match entry {
            ProgramGeneration::Computed {
                program,
                total,
                rate,
                ..
            } => (program.to_string(), *total, rate.to_string()),
            ProgramGeneration::Failed { program, .. } => (program.to_string(), 0, "-".into()),
        })
        .collect();
    assert_eq!(
        rates,
        [
            ("IND".to_string(), 1, "50.00".to_string()),
            ("ISC".to_string(), 2, "40.00".to_string()),
        ]
    );
}

#[test]
fn cacei_table_for_isc() {
    let store = sample_store();
    let ctx = RunContext::new("cacei");
    let scheduler = BatchScheduler::new(3).expect("pool");
    let mut request = CedulaRequest::new(
        period("20201"),
        ProgramKey::new("ISC"),
        AdmissionFilter::new(true, false),
    );
    request.generations = 2;
    let report = cacei(&store, &ctx, &scheduler, &request).expect("report");

    let Generation::Computed(first) = &report.generations[0] else {
        panic!("first generation should compute");
    };
    assert_eq!(first.label, "2/20201 - 2/20241");
    assert_eq!(first.total_population, 7);
    assert_eq!(first.population, 5);
    assert_eq!(first.share.to_string(), "71.43");
    assert_eq!(first.graduation_rate.to_string(), "40.00");
    assert_eq!(first.degree_rate.to_string(), "20.00");

    let Generation::Computed(second) = &report.generations[1] else {
        panic!("second generation should compute");
    };
    assert_eq!(second.population, 1);
    assert_eq!(second.share.to_string(), "100.00");
}

#[test]
fn caceca_table_for_isc() {
    let store = sample_store();
    let ctx = RunContext::new("caceca");
    let scheduler = BatchScheduler::new(2).expect("pool");
    let request = CedulaRequest::new(
        period("20201"),
        ProgramKey::new("ISC"),
        AdmissionFilter::new(true, false),
    );
    let report = caceca(&store, &ctx, &scheduler, &request).expect("report");

    let Generation::Computed(first) = &report.generations[0] else {
        panic!("first generation should compute");
    };
    assert_eq!(first.label, "20201 - 20241");
    assert_eq!(
        (first.initial, first.active, first.graduates, first.attrition, first.lagging),
        (5, 2, 2, 1, 2)
    );
    assert_eq!(first.lagging_rate.to_string(), "40.00");
}

#[test]
fn population_and_growth_tables() {
    let store = sample_store();
    let ctx = RunContext::new("tables");
    let request = TableRequest {
        start: period("20201"),
        terms: 3,
        filter: AdmissionFilter::new(true, false),
        scope: ProgramScope::parse(Some("ISC")),
    };

    let population = population_table(&store, &ctx, &request).expect("population");
    assert_eq!(population.terms[0].total.students, 7);
    assert_eq!(
        population.terms[0].programs[&ProgramKey::new("ISC")].by_gender,
        GenderCounts::new(3, 2)
    );
    assert_eq!(population.terms[1].total.students, 1);

    let growth = growth_table(&store, &ctx, &request).expect("growth");
    let changes: Vec<i64> = growth.rows.iter().map(|row| row.change).collect();
    assert_eq!(changes, [0, 1, -2]);
    assert_eq!(growth.rows()[1][3], "7");
}

#[test]
fn listing_names_cohort_members() {
    let store = sample_store();
    let ctx = RunContext::new("cohort");
    let listing = cohort_listing(
        &store,
        &ctx,
        period("20201"),
        AdmissionFilter::new(true, false),
        ProgramScope::parse(Some("ISC")),
    )
    .expect("listing");
    assert_eq!(listing.students.len(), 5);
    assert_eq!(listing.students[0].name.as_deref(), Some("Jorge Gomez Moreno"));
    assert!(listing
        .students
        .iter()
        .all(|s| s.control_number != "C20010008"));
}
