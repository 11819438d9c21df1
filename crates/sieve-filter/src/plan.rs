//! Cardinality-driven planning and execution of predicate conjunctions.
//!
//! Every predicate gets an upper-bound cardinality estimate from its index
//! (exact popcounts for postings, bucket-count sums for ranges). The
//! conjunction is then evaluated cheapest-first: the running bitmap can
//! only shrink, so starting small keeps every intersection cheap, and an
//! empty intermediate result short-circuits the rest of the plan.

use tracing::debug;

use sieve_core::{FilterParams, IdBitmap, IdInt};
use sieve_store::{FilterStore, StoreTxn};

use crate::error::FilterError;
use crate::inverted::InvertedIndex;
use crate::numeric::NumericIndex;
use crate::predicate::{FieldValue, Predicate};
use crate::schema::{FieldType, SchemaRegistry};

// ─────────────────────────────────────────────
// Planned predicates
// ─────────────────────────────────────────────

/// A predicate with its planner estimate.
#[derive(Debug, Clone)]
pub struct PlannedPredicate {
    pub predicate: Predicate,
    /// Upper bound on the predicate's result cardinality.
    pub estimate: u64,
}

/// The ordered conjunction split into the intersected prefix and the
/// predicates deferred to post-filtering.
#[derive(Debug)]
pub struct QueryPlan {
    pub intersect: Vec<PlannedPredicate>,
    pub deferred: Vec<PlannedPredicate>,
}

/// Estimate every predicate and order the conjunction cheapest-first.
pub fn order_tx(
    store: &FilterStore,
    txn: &StoreTxn<'_>,
    predicates: Vec<Predicate>,
) -> Result<Vec<PlannedPredicate>, FilterError> {
    let mut planned = Vec::with_capacity(predicates.len());
    for predicate in predicates {
        let estimate = estimate_tx(store, txn, &predicate)?;
        planned.push(PlannedPredicate {
            predicate,
            estimate,
        });
    }
    planned.sort_by_key(|p| p.estimate);
    Ok(planned)
}

/// Split an ordered conjunction at the configured estimate budget. The
/// cheapest predicate is always intersected; each further predicate joins
/// the prefix while the running combined estimate stays within budget.
pub fn partition(planned: Vec<PlannedPredicate>, params: &FilterParams) -> QueryPlan {
    let mut intersect = Vec::new();
    let mut deferred = Vec::new();
    let mut combined: u64 = 0;

    for p in planned {
        if intersect.is_empty() || combined.saturating_add(p.estimate) <= params.intersect_budget {
            combined = combined.saturating_add(p.estimate);
            intersect.push(p);
        } else {
            deferred.push(p);
        }
    }
    QueryPlan {
        intersect,
        deferred,
    }
}

// ─────────────────────────────────────────────
// Execution
// ─────────────────────────────────────────────

/// Intersect an ordered conjunction, stopping at the first empty result.
/// An empty plan yields the empty set.
pub fn execute_tx(
    store: &FilterStore,
    txn: &StoreTxn<'_>,
    planned: &[PlannedPredicate],
) -> Result<IdBitmap, FilterError> {
    let mut result: Option<IdBitmap> = None;

    for (i, p) in planned.iter().enumerate() {
        let bm = execute_predicate_tx(store, txn, &p.predicate)?;
        let acc = match result.take() {
            None => bm,
            Some(mut acc) => {
                acc &= bm;
                acc
            }
        };
        if acc.is_empty() {
            debug!(
                field = p.predicate.field(),
                step = i + 1,
                of = planned.len(),
                "conjunction emptied; short-circuiting"
            );
            return Ok(IdBitmap::new());
        }
        result = Some(acc);
    }
    Ok(result.unwrap_or_default())
}

/// Evaluate one predicate to a full bitmap.
pub fn execute_predicate_tx(
    store: &FilterStore,
    txn: &StoreTxn<'_>,
    predicate: &Predicate,
) -> Result<IdBitmap, FilterError> {
    if matches!(predicate, Predicate::In { values, .. } if values.is_empty()) {
        return Ok(IdBitmap::new());
    }
    let Some(bound) = resolve_tx(store, txn, predicate)? else {
        // a field nothing was ever written to matches nothing
        return Ok(IdBitmap::new());
    };

    match predicate {
        Predicate::Eq { field, value } => match bound {
            FieldType::Numeric => {
                let s = sortable_of(value)?;
                NumericIndex::range_tx(store, txn, field, s, s)
            }
            _ => InvertedIndex::get_tx(store, txn, field, posting_of(value)?),
        },
        Predicate::In { field, values } => match bound {
            FieldType::Numeric => {
                let mut result = IdBitmap::new();
                for value in values {
                    let s = sortable_of(value)?;
                    result |= NumericIndex::range_tx(store, txn, field, s, s)?;
                }
                Ok(result)
            }
            _ => {
                let postings = values
                    .iter()
                    .map(posting_of)
                    .collect::<Result<Vec<_>, _>>()?;
                InvertedIndex::any_of_tx(store, txn, field, &postings)
            }
        },
        Predicate::Range { field, lo, hi } => {
            NumericIndex::range_tx(store, txn, field, sortable_of(lo)?, sortable_of(hi)?)
        }
    }
}

/// Upper-bound cardinality for one predicate. Unknown fields estimate to
/// zero, which sorts them first and empties the conjunction immediately.
pub fn estimate_tx(
    store: &FilterStore,
    txn: &StoreTxn<'_>,
    predicate: &Predicate,
) -> Result<u64, FilterError> {
    if matches!(predicate, Predicate::In { values, .. } if values.is_empty()) {
        return Ok(0);
    }
    let Some(bound) = resolve_tx(store, txn, predicate)? else {
        return Ok(0);
    };

    match predicate {
        Predicate::Eq { field, value } => match bound {
            FieldType::Numeric => {
                let s = sortable_of(value)?;
                NumericIndex::cardinality_estimate_tx(store, txn, field, s, s)
            }
            _ => InvertedIndex::cardinality_tx(store, txn, field, posting_of(value)?),
        },
        Predicate::In { field, values } => {
            let mut total: u64 = 0;
            for value in values {
                total += match bound {
                    FieldType::Numeric => {
                        let s = sortable_of(value)?;
                        NumericIndex::cardinality_estimate_tx(store, txn, field, s, s)?
                    }
                    _ => InvertedIndex::cardinality_tx(store, txn, field, posting_of(value)?)?,
                };
            }
            Ok(total)
        }
        Predicate::Range { field, lo, hi } => NumericIndex::cardinality_estimate_tx(
            store,
            txn,
            field,
            sortable_of(lo)?,
            sortable_of(hi)?,
        ),
    }
}

/// Check one predicate against a single ID using forward data only: the
/// numeric forward entry for ranges, a single posting load for categories.
pub fn check_predicate_tx(
    store: &FilterStore,
    txn: &StoreTxn<'_>,
    id: IdInt,
    predicate: &Predicate,
) -> Result<bool, FilterError> {
    if matches!(predicate, Predicate::In { values, .. } if values.is_empty()) {
        return Ok(false);
    }
    let Some(bound) = resolve_tx(store, txn, predicate)? else {
        return Ok(false);
    };

    match predicate {
        Predicate::Eq { field, value } => match bound {
            FieldType::Numeric => {
                let s = sortable_of(value)?;
                NumericIndex::check_range_tx(store, txn, field, id, s, s)
            }
            _ => Ok(InvertedIndex::get_tx(store, txn, field, posting_of(value)?)?.contains(id)),
        },
        Predicate::In { field, values } => {
            for value in values {
                let hit = match bound {
                    FieldType::Numeric => {
                        let s = sortable_of(value)?;
                        NumericIndex::check_range_tx(store, txn, field, id, s, s)?
                    }
                    _ => InvertedIndex::get_tx(store, txn, field, posting_of(value)?)?.contains(id),
                };
                if hit {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Predicate::Range { field, lo, hi } => NumericIndex::check_range_tx(
            store,
            txn,
            field,
            id,
            sortable_of(lo)?,
            sortable_of(hi)?,
        ),
    }
}

// ─────────────────────────────────────────────
// Resolution helpers
// ─────────────────────────────────────────────

/// Resolve the predicate's field against the registry. `None` means the
/// field was never written; a binding that disagrees with the predicate's
/// value types is a caller error.
fn resolve_tx(
    store: &FilterStore,
    txn: &StoreTxn<'_>,
    predicate: &Predicate,
) -> Result<Option<FieldType>, FilterError> {
    let required = predicate.required_type()?;
    let Some(bound) = SchemaRegistry::get_tx(store, txn, predicate.field())? else {
        return Ok(None);
    };
    if bound != required {
        return Err(FilterError::TypeMismatch {
            field: predicate.field().to_string(),
            bound,
            got: required,
        });
    }
    Ok(Some(bound))
}

fn sortable_of(value: &FieldValue) -> Result<u32, FilterError> {
    value
        .sortable()
        .ok_or_else(|| FilterError::InvalidQuery("expected a numeric operand".into()))
}

fn posting_of(value: &FieldValue) -> Result<&str, FilterError> {
    value
        .as_posting()
        .ok_or_else(|| FilterError::InvalidQuery("expected a category or boolean operand".into()))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
