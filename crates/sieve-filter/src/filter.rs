//! The `Filter` facade: typed and JSON mutation surfaces plus the query
//! entry points.
//!
//! Every mutation runs in one transaction — a JSON object with several
//! fields commits atomically or not at all, and the schema binding for a
//! field's first write shares that transaction with the data write. Every
//! query runs in a read transaction that is dropped at the end.

use std::path::Path;

use tracing::debug;

use sieve_core::{to_sorted_ids, FilterParams, IdBitmap, IdInt};
use sieve_store::{FilterStore, StoreTxn};

use crate::error::FilterError;
use crate::inverted::InvertedIndex;
use crate::numeric::NumericIndex;
use crate::plan::{self, PlannedPredicate};
use crate::predicate::{parse_query, FieldValue};
use crate::schema::SchemaRegistry;
use crate::search::SearchPlan;
use crate::sortable::{float_to_sortable, int_to_sortable};

// ─────────────────────────────────────────────
// Filter
// ─────────────────────────────────────────────

/// Persistent metadata filter over one store directory.
pub struct Filter {
    store: FilterStore,
    params: FilterParams,
}

impl Filter {
    /// Open (or create) a filter at `path` with default tuning.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FilterError> {
        Self::open_with_params(path, FilterParams::default())
    }

    /// Open with explicit tuning parameters.
    pub fn open_with_params(
        path: impl AsRef<Path>,
        params: FilterParams,
    ) -> Result<Self, FilterError> {
        let store = FilterStore::open(path)?;
        Ok(Self { store, params })
    }

    pub fn params(&self) -> &FilterParams {
        &self.params
    }

    /// The underlying store, for callers composing their own transactions.
    pub fn store(&self) -> &FilterStore {
        &self.store
    }

    // ── Mutations ─────────────────────────────────────

    /// Add one typed attribute for `id`.
    pub fn add_to_filter(
        &self,
        field: &str,
        value: &FieldValue,
        id: IdInt,
    ) -> Result<(), FilterError> {
        SchemaRegistry::validate_field_name(field)?;
        let txn = self.store.begin();
        self.add_value_tx(&txn, field, value, id)?;
        txn.commit().map_err(FilterError::from)
    }

    /// Add every attribute of a JSON object for `id`, atomically.
    pub fn add_filters_from_json(
        &self,
        id: IdInt,
        attributes: &serde_json::Value,
    ) -> Result<(), FilterError> {
        let obj = attributes
            .as_object()
            .ok_or_else(|| FilterError::InvalidQuery("attributes must be a JSON object".into()))?;

        let txn = self.store.begin();
        for (field, value) in obj {
            SchemaRegistry::validate_field_name(field)?;
            let value = FieldValue::from_json(value)?;
            self.add_value_tx(&txn, field, &value, id)?;
        }
        txn.commit().map_err(FilterError::from)
    }

    /// Remove one typed attribute for `id`. Silent no-op when absent.
    pub fn remove_from_filter(
        &self,
        field: &str,
        value: &FieldValue,
        id: IdInt,
    ) -> Result<(), FilterError> {
        SchemaRegistry::validate_field_name(field)?;
        let txn = self.store.begin();
        self.remove_value_tx(&txn, field, value, id)?;
        txn.commit().map_err(FilterError::from)
    }

    /// Remove every attribute of a JSON object for `id`, atomically.
    pub fn remove_filters_from_json(
        &self,
        id: IdInt,
        attributes: &serde_json::Value,
    ) -> Result<(), FilterError> {
        let obj = attributes
            .as_object()
            .ok_or_else(|| FilterError::InvalidQuery("attributes must be a JSON object".into()))?;

        let txn = self.store.begin();
        for (field, value) in obj {
            SchemaRegistry::validate_field_name(field)?;
            let value = FieldValue::from_json(value)?;
            self.remove_value_tx(&txn, field, &value, id)?;
        }
        txn.commit().map_err(FilterError::from)
    }

    fn add_value_tx(
        &self,
        txn: &StoreTxn<'_>,
        field: &str,
        value: &FieldValue,
        id: IdInt,
    ) -> Result<(), FilterError> {
        SchemaRegistry::bind_tx(&self.store, txn, field, value.field_type())?;
        match value {
            FieldValue::Int(i) => {
                NumericIndex::put_tx(&self.store, txn, field, id, int_to_sortable(*i))
            }
            FieldValue::Float(f) => {
                NumericIndex::put_tx(&self.store, txn, field, id, float_to_sortable(*f))
            }
            FieldValue::Category(s) => InvertedIndex::add_tx(&self.store, txn, field, s, id),
            FieldValue::Bool(b) => {
                InvertedIndex::add_tx(&self.store, txn, field, if *b { "1" } else { "0" }, id)
            }
        }
    }

    fn remove_value_tx(
        &self,
        txn: &StoreTxn<'_>,
        field: &str,
        value: &FieldValue,
        id: IdInt,
    ) -> Result<(), FilterError> {
        // a field that was never written has nothing to remove; a field
        // bound to another type signals caller confusion
        let Some(bound) = SchemaRegistry::get_tx(&self.store, txn, field)? else {
            return Ok(());
        };
        if bound != value.field_type() {
            return Err(FilterError::TypeMismatch {
                field: field.to_string(),
                bound,
                got: value.field_type(),
            });
        }
        match value {
            FieldValue::Int(_) | FieldValue::Float(_) => {
                NumericIndex::remove_tx(&self.store, txn, field, id)
            }
            FieldValue::Category(s) => InvertedIndex::remove_tx(&self.store, txn, field, s, id),
            FieldValue::Bool(b) => {
                InvertedIndex::remove_tx(&self.store, txn, field, if *b { "1" } else { "0" }, id)
            }
        }
    }

    // ── Queries ───────────────────────────────────────

    /// IDs matching every predicate, ascending.
    pub fn ids_matching_filter(&self, query: &serde_json::Value) -> Result<Vec<IdInt>, FilterError> {
        Ok(to_sorted_ids(&self.matching_bitmap(query)?))
    }

    /// Number of IDs matching every predicate.
    pub fn count_matching_filter(&self, query: &serde_json::Value) -> Result<u64, FilterError> {
        Ok(self.matching_bitmap(query)?.len())
    }

    /// The matching set as a bitmap. Evaluates the full conjunction; the
    /// deferral budget only applies to search hand-offs.
    pub fn matching_bitmap(&self, query: &serde_json::Value) -> Result<IdBitmap, FilterError> {
        let predicates = parse_query(query)?;
        let txn = self.store.begin();
        let planned = plan::order_tx(&self.store, &txn, predicates)?;
        plan::execute_tx(&self.store, &txn, &planned)
    }

    /// Point check: does `id` satisfy every predicate? Uses forward data
    /// only — no range scans — so it is safe for per-result verification.
    pub fn check_id_matches(
        &self,
        id: IdInt,
        query: &serde_json::Value,
    ) -> Result<bool, FilterError> {
        let predicates = parse_query(query)?;
        let txn = self.store.begin();
        for predicate in &predicates {
            if !plan::check_predicate_tx(&self.store, &txn, id, predicate)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Plan a filtered search: intersect the cheap prefix of the
    /// conjunction, defer the rest, and choose the downstream strategy
    /// from the surviving cardinality.
    pub fn plan_search(&self, query: &serde_json::Value) -> Result<SearchPlan, FilterError> {
        let predicates = parse_query(query)?;
        let txn = self.store.begin();
        let planned = plan::order_tx(&self.store, &txn, predicates)?;
        let query_plan = plan::partition(planned, &self.params);
        let candidates = plan::execute_tx(&self.store, &txn, &query_plan.intersect)?;
        let deferred = query_plan
            .deferred
            .into_iter()
            .map(|p: PlannedPredicate| p.predicate)
            .collect::<Vec<_>>();

        let plan = SearchPlan::new(candidates, deferred, &self.params);
        debug!(
            candidates = plan.candidate_count(),
            deferred = plan.deferred.len(),
            strategy = ?plan.strategy,
            "search plan built"
        );
        Ok(plan)
    }
}
