//! Hand-off contract between the filter and the vector-search stage.
//!
//! The filter produces a candidate bitmap; how the search stage consumes
//! it depends on selectivity. A highly selective filter leaves few enough
//! candidates that exact brute-force distance evaluation is cheaper than
//! graph traversal; a loose filter keeps the graph index and constrains it
//! with a membership callback instead.

use sieve_core::{FilterParams, IdBitmap, IdInt};

use crate::predicate::Predicate;

// ─────────────────────────────────────────────
// SearchStrategy
// ─────────────────────────────────────────────

/// How the search stage should consume the candidate set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStrategy {
    /// Few candidates: compute exact distances over exactly these IDs.
    BruteForce,
    /// Many candidates: run graph search restricted by
    /// [`SearchPlan::contains`].
    Graph,
}

// ─────────────────────────────────────────────
// SearchPlan
// ─────────────────────────────────────────────

/// The filter's result, packaged for the search stage.
#[derive(Debug)]
pub struct SearchPlan {
    /// IDs surviving the intersected predicate prefix.
    pub candidates: IdBitmap,
    pub strategy: SearchStrategy,
    /// Predicates the planner deferred; the search stage post-verifies
    /// results against them via per-ID checks.
    pub deferred: Vec<Predicate>,
    boost_percentage: u64,
}

impl SearchPlan {
    pub fn new(candidates: IdBitmap, deferred: Vec<Predicate>, params: &FilterParams) -> Self {
        let strategy = if candidates.len() < params.prefilter_threshold {
            SearchStrategy::BruteForce
        } else {
            SearchStrategy::Graph
        };
        Self {
            candidates,
            strategy,
            deferred,
            boost_percentage: params.boost_percentage,
        }
    }

    /// Membership callback for graph search.
    pub fn contains(&self, id: IdInt) -> bool {
        self.candidates.contains(id)
    }

    pub fn candidate_count(&self) -> u64 {
        self.candidates.len()
    }

    /// Whether every predicate was intersected; when false, results need
    /// post-verification against [`SearchPlan::deferred`].
    pub fn is_fully_filtered(&self) -> bool {
        self.deferred.is_empty()
    }

    /// Fetch limit for the search stage: the requested `k` inflated by the
    /// configured slack so post-filtering still fills `k` results.
    pub fn boosted_limit(&self, k: usize) -> usize {
        k + k * self.boost_percentage as usize / 100
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
