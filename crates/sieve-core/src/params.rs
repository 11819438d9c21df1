//! Tuning parameters for the planner and the search hand-off.

use serde::{Deserialize, Serialize};

/// Candidate counts below this go to brute-force distance evaluation;
/// everything above goes to graph search constrained by a membership test.
pub const PREFILTER_CARDINALITY_THRESHOLD: u64 = 1_000;

/// Extra candidate-fetch slack (percent) handed to the search stage so that
/// post-filtered results still fill the requested `k`.
pub const FILTER_BOOST_PERCENTAGE: u64 = 30;

/// Per-instance tuning knobs. The defaults mirror the module constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterParams {
    /// Below this candidate count the search stage brute-forces exact
    /// distances over the candidate set.
    pub prefilter_threshold: u64,
    /// Percentage added to the downstream fetch limit.
    pub boost_percentage: u64,
    /// Running-estimate budget for the intersected predicate prefix;
    /// predicates past the budget are deferred to post-filtering. The
    /// cheapest predicate is always intersected.
    pub intersect_budget: u64,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            prefilter_threshold: PREFILTER_CARDINALITY_THRESHOLD,
            boost_percentage: FILTER_BOOST_PERCENTAGE,
            intersect_budget: u64::MAX,
        }
    }
}
