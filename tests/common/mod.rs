//! Helpers shared by the integration tests

#![allow(dead_code)]

use cohort_analytics::core::cohort::{AttritionPolicy, RunContext};
use cohort_analytics::core::indices::{
    run_indicator, IndicatorKind, IndicatorReport, IndicatorRequest, Pipeline,
};
use cohort_analytics::core::models::{AdmissionFilter, ProgramScope};
use cohort_analytics::core::store::{load_dataset, InMemoryStore, LoadedDataset};
use std::path::PathBuf;

/// The dataset shipped under `samples/dataset`
pub fn sample_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("samples")
        .join("dataset")
}

pub fn sample_dataset() -> LoadedDataset {
    load_dataset(&sample_dir()).expect("sample dataset loads")
}

pub fn sample_store() -> InMemoryStore {
    sample_dataset().store
}

/// ISC cohort 20201, new admissions, nine terms
pub fn isc_request(kind: IndicatorKind) -> IndicatorRequest {
    IndicatorRequest {
        cohort: "20201".parse().expect("period"),
        terms: 9,
        scope: ProgramScope::parse(Some("ISC")),
        filter: AdmissionFilter::new(true, false),
        pipeline: Pipeline::new(kind),
        policy: AttritionPolicy::Signed,
    }
}

pub fn retention_report() -> IndicatorReport {
    let store = sample_store();
    let ctx = RunContext::new("retention 20201 ISC");
    run_indicator(&store, &ctx, &isc_request(IndicatorKind::Retention)).expect("indicator")
}
