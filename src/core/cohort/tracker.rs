//! Cohort tracker: walks a cohort term by term
//!
//! Each term's attrition depends on the roster of the term before, so the
//! walk is strictly sequential. Independent cohorts run in parallel through
//! [`BatchScheduler`](crate::core::indices::scheduler::BatchScheduler).

use super::attrition::{attrition, AttritionCounts, AttritionPolicy};
use super::rate::{count_rate, rate, Rate};
use super::snapshot::{count_by_gender, snapshot, GenderCounts, PopulationSnapshot};
use super::{Cohort, CohortKey, RunContext};
use crate::core::error::{serialize_display, AnalyticsError, AnalyticsResult};
use crate::core::models::{Period, StudentSet};
use crate::core::store::RecordStore;
use serde::Serialize;

/// One successfully computed term
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermRow {
    /// 1-based position in the walk; the entry term is semester 1
    pub semester: usize,
    /// Population observed at the term
    #[serde(flatten)]
    pub snapshot: PopulationSnapshot,
    /// Attrition for this step alone
    pub attrition: AttritionCounts,
    /// Graduates up to and including this term, by gender
    pub graduated_to_date: GenderCounts,
    /// Degrees up to and including this term, by gender
    pub degrees_to_date: GenderCounts,
    /// Running attrition after applying the policy
    pub attrition_to_date: AttritionCounts,
    /// Graduates up to this term, including unresolved genders
    pub graduated_total: usize,
    /// Degrees up to this term, including unresolved genders
    pub degree_total: usize,
}

impl TermRow {
    /// Term of the row
    #[must_use]
    pub const fn period(&self) -> Period {
        self.snapshot.period
    }
}

/// Result of one term: computed, or failed with a marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TermOutcome {
    /// The term was computed
    Computed(TermRow),
    /// The term could not be computed; the walk continued past it
    Failed {
        /// Term that failed
        period: Period,
        /// Why
        #[serde(serialize_with = "serialize_display")]
        error: AnalyticsError,
    },
}

impl TermOutcome {
    /// Term of the outcome
    #[must_use]
    pub const fn period(&self) -> Period {
        match self {
            Self::Computed(row) => row.snapshot.period,
            Self::Failed { period, .. } => *period,
        }
    }

    /// The computed row, if any
    #[must_use]
    pub const fn row(&self) -> Option<&TermRow> {
        match self {
            Self::Computed(row) => Some(row),
            Self::Failed { .. } => None,
        }
    }
}

/// Rates at the end of the walk, all over the cohort size.
///
/// Retention, graduation and degree count every member. Attrition is the
/// signed gender split, so a member whose gender cannot be resolved never
/// counts as a loss or a return; the four rates need not add up to 100%
/// when such members leave. Each of them is reported once on the context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CumulativeRates {
    /// Active at the last computed term
    pub retention: Rate,
    /// Graduated over the window
    pub graduation: Rate,
    /// Degree received over the window
    pub degree: Rate,
    /// Net attrition over the window
    pub attrition: Rate,
}

/// A full cohort walk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CohortTrack {
    /// Cohort definition
    pub cohort: CohortKey,
    /// Initial population
    pub size: usize,
    /// Initial population by gender
    pub population: GenderCounts,
    /// One outcome per requested term, in order
    pub terms: Vec<TermOutcome>,
    /// Rates after the last computed term
    pub totals: CumulativeRates,
}

impl CohortTrack {
    /// Computed rows only
    pub fn rows(&self) -> impl Iterator<Item = &TermRow> {
        self.terms.iter().filter_map(TermOutcome::row)
    }

    /// Last computed row
    #[must_use]
    pub fn last_row(&self) -> Option<&TermRow> {
        self.rows().last()
    }

    /// Number of failed terms
    #[must_use]
    pub fn failed_terms(&self) -> usize {
        self.terms.len() - self.rows().count()
    }

    /// Earliest failed term and its marker
    #[must_use]
    pub fn first_failure(&self) -> Option<(Period, &AnalyticsError)> {
        self.terms.iter().find_map(|outcome| match outcome {
            TermOutcome::Failed { period, error } => Some((*period, error)),
            TermOutcome::Computed(_) => None,
        })
    }
}

/// Walks cohorts through consecutive terms
#[derive(Clone, Copy)]
pub struct CohortTracker<'a> {
    store: &'a dyn RecordStore,
    ctx: &'a RunContext,
    policy: AttritionPolicy,
}

#[derive(Default)]
struct WalkState {
    roster: StudentSet,
    graduates: StudentSet,
    graduated: GenderCounts,
    degrees: GenderCounts,
    attrition: AttritionCounts,
    graduated_total: usize,
    degree_total: usize,
}

impl<'a> CohortTracker<'a> {
    /// Tracker over a store, reporting through `ctx`
    #[must_use]
    pub fn new(store: &'a dyn RecordStore, ctx: &'a RunContext) -> Self {
        Self {
            store,
            ctx,
            policy: AttritionPolicy::default(),
        }
    }

    /// Use a specific attrition policy
    #[must_use]
    pub const fn with_policy(mut self, policy: AttritionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Walk `terms` consecutive terms starting at the cohort's entry term.
    ///
    /// Rosters are always taken among the cohort members, so a student who
    /// skips a term is counted once as a loss and once as a return. A failed
    /// term is marked and skipped: the next term is compared against the last
    /// roster that was computed. Once the run is cancelled or out of time,
    /// every remaining term carries the interruption marker.
    ///
    /// The walk never passes `29993`; request builders reject longer walks
    /// with [`term_count`](crate::core::indices::term_count).
    #[must_use]
    pub fn track(&self, cohort: &Cohort, terms: usize) -> CohortTrack {
        let logger = self.ctx.logger();
        logger.debug(format_args!(
            "tracking {} members from {} over {terms} term(s)",
            cohort.size(),
            cohort.key.entry
        ));

        let mut state = WalkState {
            roster: cohort.members.clone(),
            ..WalkState::default()
        };
        let sequence: Vec<Period> = cohort.key.entry.following().take(terms).collect();
        let mut outcomes = Vec::with_capacity(sequence.len());

        for (index, period) in sequence.iter().copied().enumerate() {
            if let Err(interruption) = self.ctx.checkpoint(&period.to_string()) {
                logger.warn(format_args!("{interruption}"));
                outcomes.extend(
                    sequence[index..]
                        .iter()
                        .map(|&p| interrupted(&interruption, p)),
                );
                break;
            }

            match self.step(cohort, period, index + 1, &mut state) {
                Ok(row) => outcomes.push(TermOutcome::Computed(row)),
                Err(error) => {
                    logger.error(format_args!("term {period} failed: {error}"));
                    outcomes.push(TermOutcome::Failed { period, error });
                }
            }
        }

        let size = cohort.size();
        let totals = outcomes
            .iter()
            .filter_map(TermOutcome::row)
            .last()
            .map(|last| CumulativeRates {
                retention: count_rate(last.snapshot.active_count, size),
                graduation: count_rate(last.graduated_total, size),
                degree: count_rate(last.degree_total, size),
                attrition: rate(
                    last.attrition_to_date.total(),
                    i64::try_from(size).unwrap_or(i64::MAX),
                ),
            })
            .unwrap_or_default();

        CohortTrack {
            cohort: cohort.key.clone(),
            size,
            population: count_by_gender(self.store, self.ctx, &cohort.members, "admission"),
            terms: outcomes,
            totals,
        }
    }

    fn step(
        &self,
        cohort: &Cohort,
        period: Period,
        semester: usize,
        state: &mut WalkState,
    ) -> AnalyticsResult<TermRow> {
        let snap = snapshot(self.store, self.ctx, cohort, period)?;
        let step = attrition(
            self.store,
            self.ctx,
            &state.roster,
            &snap.roster,
            &state.graduates,
        );

        state.graduated += snap.graduated;
        state.degrees += snap.degrees;
        state.attrition = self.policy.accumulate(state.attrition, step);
        state.graduated_total += snap.graduates.len();
        state.degree_total += snap.degreed.len();
        state.roster.clone_from(&snap.roster);
        state.graduates.clone_from(&snap.graduates);

        Ok(TermRow {
            semester,
            attrition: step,
            graduated_to_date: state.graduated,
            degrees_to_date: state.degrees,
            attrition_to_date: state.attrition,
            graduated_total: state.graduated_total,
            degree_total: state.degree_total,
            snapshot: snap,
        })
    }
}

fn interrupted(cause: &AnalyticsError, period: Period) -> TermOutcome {
    let label = period.to_string();
    let error = match cause {
        AnalyticsError::DeadlineExceeded(_) => AnalyticsError::DeadlineExceeded(label),
        _ => AnalyticsError::Cancelled(label),
    };
    TermOutcome::Failed { period, error }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cohort::attrition::classify;
    use crate::core::cohort::test_support::{
        gendered_store, members, p1_cohort, scenario_store, FlakyStore,
    };
    use crate::core::cohort::{select, CancellationToken};
    use crate::core::models::{AdmissionType, AdmissionTypeSet, ProgramScope};
    use std::time::Instant;

    fn period(s: &str) -> Period {
        s.parse().expect("period")
    }

    #[test]
    fn scenario_walk() {
        let store = scenario_store();
        let ctx = RunContext::new("scenario");
        let cohort = p1_cohort(&store);

        let track = CohortTracker::new(&store, &ctx).track(&cohort, 3);
        let periods: Vec<String> = track.terms.iter().map(|t| t.period().to_string()).collect();
        assert_eq!(periods, ["20241", "20243", "20251"]);
        assert_eq!(track.size, 3);
        assert_eq!(track.population, GenderCounts::new(2, 1));

        let second = track.terms[1].row().expect("computed");
        assert_eq!(second.snapshot.active_count, 2);
        assert_eq!(second.snapshot.graduated, GenderCounts::new(1, 0));
        assert_eq!(second.attrition, AttritionCounts::new(0, 1));

        // The graduate leaves at 20251 without counting as attrition
        let third = track.terms[2].row().expect("computed");
        assert_eq!(third.attrition, AttritionCounts::default());
        assert_eq!(third.attrition_to_date, AttritionCounts::new(0, 1));

        assert_eq!(track.totals.graduation.to_string(), "33.33");
        assert_eq!(track.totals.attrition.to_string(), "33.33");
        assert_eq!(track.totals.retention.to_string(), "33.33");
        assert_eq!(track.failed_terms(), 0);
    }

    #[test]
    fn readmission_is_not_double_counted() {
        let mut store = gendered_store();
        store.add_admission("24010001".into(), period("20241"), AdmissionType::Exam);
        store.add_admission("24010001".into(), period("20251"), AdmissionType::Reenrollment);
        let ctx = RunContext::new("readmission");
        let cohort = select(
            &store,
            CohortKey::new(
                period("20241"),
                AdmissionTypeSet::from([AdmissionType::Exam]),
                ProgramScope::All,
            ),
        )
        .expect("select");

        let track = CohortTracker::new(&store, &ctx).track(&cohort, 3);
        let steps: Vec<i64> = track.rows().map(|r| r.attrition.total()).collect();
        assert_eq!(steps, [0, 1, -1]);
        let last = track.last_row().expect("computed");
        assert_eq!(last.attrition_to_date.total(), 0);
        assert_eq!(track.totals.attrition, Rate::ZERO);
    }

    #[test]
    fn returning_graduate_goes_negative_unless_clamped() {
        // Graduates at entry, skips 20243 as a graduate exit, re-enrolls at 20251
        let mut store = gendered_store();
        store.add_admission("24010001".into(), period("20241"), AdmissionType::Exam);
        store.add_graduation("24010001".into(), period("20241"));
        store.add_admission("24010001".into(), period("20251"), AdmissionType::Reenrollment);
        let ctx = RunContext::new("returning");
        let cohort = Cohort {
            key: CohortKey::new(
                period("20241"),
                AdmissionTypeSet::from([AdmissionType::Exam]),
                ProgramScope::All,
            ),
            members: members(&["24010001"]),
        };
        let tracker = CohortTracker::new(&store, &ctx);

        let signed = tracker.track(&cohort, 3);
        let steps: Vec<i64> = signed.rows().map(|r| r.attrition.total()).collect();
        assert_eq!(steps, [0, 0, -1]);
        assert_eq!(signed.totals.attrition.to_string(), "-100.00");

        let clamped = tracker
            .with_policy(AttritionPolicy::ClampAtZero)
            .track(&cohort, 3);
        assert_eq!(
            clamped.last_row().map(|r| r.attrition_to_date),
            Some(AttritionCounts::default())
        );
        assert_eq!(clamped.totals.attrition, Rate::ZERO);
    }

    #[test]
    fn empty_cohort_yields_zero_rates() {
        let store = scenario_store();
        let ctx = RunContext::new("empty");
        let cohort = select(
            &store,
            CohortKey::new(period("20241"), AdmissionTypeSet::new(), ProgramScope::All),
        )
        .expect("select");

        let track = CohortTracker::new(&store, &ctx).track(&cohort, 4);
        assert_eq!(track.size, 0);
        assert_eq!(track.terms.len(), 4);
        assert_eq!(track.totals, CumulativeRates::default());
        assert_eq!(ctx.issue_count(), 0);
    }

    #[test]
    fn zero_terms_yields_empty_walk() {
        let store = scenario_store();
        let ctx = RunContext::new("zero");
        let track = CohortTracker::new(&store, &ctx).track(&p1_cohort(&store), 0);
        assert!(track.terms.is_empty());
        assert_eq!(track.totals, CumulativeRates::default());
    }

    #[test]
    fn every_transition_conserves_population() {
        let store = scenario_store();
        let ctx = RunContext::new("conservation");
        let cohort = p1_cohort(&store);
        let track = CohortTracker::new(&store, &ctx).track(&cohort, 4);

        let mut previous = cohort.members.clone();
        let mut graduated = StudentSet::new();
        for row in track.rows() {
            let transition = classify(&previous, &row.snapshot.roster, &graduated);
            assert!(transition.conserves(&previous, &row.snapshot.roster));
            previous.clone_from(&row.snapshot.roster);
            graduated.clone_from(&row.snapshot.graduates);
        }
    }

    #[test]
    fn cancellation_marks_remaining_terms() {
        let store = scenario_store();
        let token = CancellationToken::new();
        token.cancel();
        let ctx = RunContext::new("cancelled").with_cancellation(token);

        let track = CohortTracker::new(&store, &ctx).track(&p1_cohort(&store), 3);
        assert_eq!(track.terms.len(), 3);
        assert_eq!(track.failed_terms(), 3);
        assert_eq!(
            track.terms[2],
            TermOutcome::Failed {
                period: period("20251"),
                error: AnalyticsError::Cancelled("20251".into()),
            }
        );
    }

    #[test]
    fn deadline_marks_remaining_terms() {
        let store = scenario_store();
        let ctx = RunContext::new("late").with_deadline(Instant::now());
        let track = CohortTracker::new(&store, &ctx).track(&p1_cohort(&store), 2);
        assert!(track.terms.iter().all(|t| matches!(
            t,
            TermOutcome::Failed {
                error: AnalyticsError::DeadlineExceeded(_),
                ..
            }
        )));
    }

    #[test]
    fn failed_term_does_not_abort_the_walk() {
        let inner = scenario_store();
        let cohort = p1_cohort(&inner);
        let store = FlakyStore {
            inner,
            broken: period("20243"),
        };
        let ctx = RunContext::new("flaky");
        let track = CohortTracker::new(&store, &ctx).track(&cohort, 3);

        assert!(matches!(track.terms[1], TermOutcome::Failed { .. }));
        let last = track.terms[2].row().expect("walk resumed");
        // Compared against the entry roster, so the 20243 graduate counts as
        // a loss alongside the dropout
        assert_eq!(last.snapshot.active_count, 1);
        assert_eq!(last.attrition, AttritionCounts::new(1, 1));
    }

    #[test]
    fn unresolved_members_count_toward_graduation_but_not_attrition() {
        let mut store = scenario_store();
        for (id, curp) in [("24010009", "NOPERSON"), ("24010010", "NOBODY")] {
            store.add_student(crate::core::models::Student::new(
                id.into(),
                curp,
                crate::core::models::ProgramKey::new("P1"),
                "P1-2020",
            ));
            store.add_admission(id.into(), period("20241"), AdmissionType::Exam);
        }
        // 24010009 drops out after entry, 24010010 graduates at 20243
        store.add_admission("24010010".into(), period("20243"), AdmissionType::Reenrollment);
        store.add_graduation("24010010".into(), period("20243"));
        let ctx = RunContext::new("unresolved");
        let cohort = p1_cohort(&store);

        let track = CohortTracker::new(&store, &ctx).track(&cohort, 3);
        assert_eq!(track.size, 5);
        assert_eq!(track.population, GenderCounts::new(2, 1));

        let second = track.terms[1].row().expect("computed");
        assert_eq!(second.snapshot.active_count, 3);
        assert_eq!(second.attrition, AttritionCounts::new(0, 1));

        let last = track.last_row().expect("rows");
        assert_eq!(last.graduated_to_date, GenderCounts::new(1, 0));
        assert_eq!(last.graduated_total, 2);
        assert_eq!(track.totals.graduation.to_string(), "40.00");
        assert_eq!(track.totals.attrition.to_string(), "20.00");
        assert_eq!(track.totals.retention.to_string(), "20.00");

        // Each unresolved reference is listed once however many terms see it
        assert_eq!(
            ctx.issues(),
            vec![
                AnalyticsError::dangling("24010009", "admission"),
                AnalyticsError::dangling("24010010", "admission"),
                AnalyticsError::dangling("24010010", "graduation"),
            ]
        );
    }
}
