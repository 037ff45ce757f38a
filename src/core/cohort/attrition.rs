//! Attrition between two consecutive rosters

use super::snapshot::{count_by_gender, GenderCounts};
use super::RunContext;
use crate::core::models::StudentSet;
use crate::core::store::RecordStore;
use serde::{Deserialize, Serialize};

/// How consecutive rosters differ
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transition {
    /// Left the roster without having graduated the term before
    pub left: StudentSet,
    /// Came back after being absent from the previous roster
    pub reentered: StudentSet,
    /// Left the roster after graduating the term before
    pub graduated_exits: StudentSet,
}

impl Transition {
    /// Whether `|previous| = |current| + |left| - |reentered| + |graduated_exits|`
    #[must_use]
    pub fn conserves(&self, previous: &StudentSet, current: &StudentSet) -> bool {
        previous.len() + self.reentered.len()
            == current.len() + self.left.len() + self.graduated_exits.len()
    }
}

/// Signed attrition for one step, by gender
pub type AttritionCounts = GenderCounts;

/// How the running attrition total treats re-admissions that were never
/// counted as losses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttritionPolicy {
    /// Keep the signed total, which may go negative
    #[default]
    #[serde(rename = "signed")]
    Signed,
    /// Clamp the running total at zero per gender
    #[serde(rename = "clamp", alias = "clamp-at-zero", alias = "clamp_at_zero")]
    ClampAtZero,
}

impl AttritionPolicy {
    /// Fold one step into a running total
    #[must_use]
    pub fn accumulate(self, running: AttritionCounts, step: AttritionCounts) -> AttritionCounts {
        let next = running + step;
        match self {
            Self::Signed => next,
            Self::ClampAtZero => next.clamped(),
        }
    }
}

impl std::str::FromStr for AttritionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "signed" => Ok(Self::Signed),
            "clamp" | "clamp-at-zero" | "clamp_at_zero" => Ok(Self::ClampAtZero),
            other => Err(format!("Unknown attrition policy: {other} (use signed or clamp)")),
        }
    }
}

impl std::fmt::Display for AttritionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Signed => f.write_str("signed"),
            Self::ClampAtZero => f.write_str("clamp"),
        }
    }
}

/// Split a roster change into leavers, returners and graduate exits
#[must_use]
pub fn classify(
    previous: &StudentSet,
    current: &StudentSet,
    graduated_prior: &StudentSet,
) -> Transition {
    let (graduated_exits, left): (StudentSet, StudentSet) = previous
        .difference(current)
        .cloned()
        .partition(|s| graduated_prior.contains(s));
    Transition {
        left,
        reentered: current.difference(previous).cloned().collect(),
        graduated_exits,
    }
}

/// Signed attrition between two rosters: +1 per leaver, -1 per returner.
///
/// Leavers and returners with no resolvable gender are reported on the
/// context and not counted, while graduation totals still include them (see
/// [`CumulativeRates`](super::CumulativeRates)).
pub fn attrition(
    store: &dyn RecordStore,
    ctx: &RunContext,
    previous: &StudentSet,
    current: &StudentSet,
    graduated_prior: &StudentSet,
) -> AttritionCounts {
    let transition = classify(previous, current, graduated_prior);
    let left = count_by_gender(store, ctx, &transition.left, "admission");
    let reentered = count_by_gender(store, ctx, &transition.reentered, "admission");
    AttritionCounts::new(left.male - reentered.male, left.female - reentered.female)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cohort::test_support::scenario_store;
    use crate::core::models::StudentId;

    fn set(ids: &[&str]) -> StudentSet {
        ids.iter().map(|id| StudentId::new(id)).collect()
    }

    #[test]
    fn leaver_counts_and_graduate_does_not() {
        let store = scenario_store();
        let ctx = RunContext::new("test");
        // 24010001 (M) graduated, 24010003 (F) dropped out
        let previous = set(&["24010001", "24010002", "24010003"]);
        let current = set(&["24010002"]);
        let graduated = set(&["24010001"]);

        let counts = attrition(&store, &ctx, &previous, &current, &graduated);
        assert_eq!(counts, AttritionCounts::new(0, 1));
    }

    #[test]
    fn reentry_decrements() {
        let store = scenario_store();
        let ctx = RunContext::new("test");
        let counts = attrition(
            &store,
            &ctx,
            &set(&[]),
            &set(&["24010002"]),
            &set(&[]),
        );
        assert_eq!(counts, AttritionCounts::new(-1, 0));
    }

    #[test]
    fn classification_conserves_population() {
        let previous = set(&["A", "B", "C", "D"]);
        let current = set(&["B", "E"]);
        let graduated = set(&["C", "E"]);

        let transition = classify(&previous, &current, &graduated);
        assert_eq!(transition.left, set(&["A", "D"]));
        assert_eq!(transition.reentered, set(&["E"]));
        assert_eq!(transition.graduated_exits, set(&["C"]));
        assert!(transition.conserves(&previous, &current));
    }

    #[test]
    fn attrition_is_idempotent() {
        let store = scenario_store();
        let ctx = RunContext::new("test");
        let previous = set(&["24010001", "24010002", "24010003"]);
        let current = set(&["24010001"]);
        let first = attrition(&store, &ctx, &previous, &current, &set(&[]));
        let second = attrition(&store, &ctx, &previous, &current, &set(&[]));
        assert_eq!(first, second);
        assert_eq!(first, AttritionCounts::new(1, 1));
    }

    #[test]
    fn clamp_policy_floors_running_total() {
        let step = AttritionCounts::new(-1, 2);
        assert_eq!(
            AttritionPolicy::Signed.accumulate(AttritionCounts::default(), step),
            AttritionCounts::new(-1, 2)
        );
        assert_eq!(
            AttritionPolicy::ClampAtZero.accumulate(AttritionCounts::default(), step),
            AttritionCounts::new(0, 2)
        );
        assert_eq!(
            "clamp".parse::<AttritionPolicy>(),
            Ok(AttritionPolicy::ClampAtZero)
        );
        assert!("nope".parse::<AttritionPolicy>().is_err());
    }
}
