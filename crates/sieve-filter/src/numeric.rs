//! Bucketed numeric index over the ordered store.
//!
//! Two column families cooperate:
//! - `numeric_forward`: `<field>:<id>` → the 4-byte sortable value, used to
//!   replace or delete an ID without scanning buckets and to answer per-ID
//!   range checks.
//! - `numeric_inverted`: `<field>:<be_base>` → bucket payload, walked by
//!   range scans in ascending numeric order.
//!
//! A value's owning bucket is the last same-field bucket keyed at or below
//! it. Inserts that land outside every bucket's window open a new bucket
//! keyed at the value itself; inserts that overflow a bucket trigger the
//! sliding split. Adjacent buckets of one field never overlap.
//!
//! Every operation has a `*_tx` form taking a caller-owned transaction so
//! the facade can commit several fields atomically; the plain forms wrap
//! one operation in its own transaction.

use tracing::{debug, warn};

use sieve_core::{IdBitmap, IdInt};
use sieve_store::{
    bucket_key, bucket_key_base, field_prefix, forward_key, seek_floor, seek_range_start,
    FilterStore, StoreTxn, CF_NUMERIC_FORWARD, CF_NUMERIC_INVERTED,
};

use crate::bucket::{Bucket, BUCKET_MAX_DELTA};
use crate::error::FilterError;

pub struct NumericIndex;

impl NumericIndex {
    // ── Mutations ─────────────────────────────────────

    /// Upsert `(field, id) -> value` in its own transaction.
    pub fn put(
        store: &FilterStore,
        field: &str,
        id: IdInt,
        value: u32,
    ) -> Result<(), FilterError> {
        let txn = store.begin();
        Self::put_tx(store, &txn, field, id, value)?;
        txn.commit().map_err(FilterError::from)
    }

    /// Upsert inside a caller-owned transaction.
    ///
    /// A repeated put of the same value is a no-op; a changed value is
    /// removed from its old bucket before the new value is inserted, so at
    /// most one bucket ever holds the ID.
    pub fn put_tx(
        store: &FilterStore,
        txn: &StoreTxn<'_>,
        field: &str,
        id: IdInt,
        value: u32,
    ) -> Result<(), FilterError> {
        let fwd_cf = store.cf(CF_NUMERIC_FORWARD)?;
        let key = forward_key(field, id);

        if let Some(bytes) = txn.get_cf(fwd_cf, &key)? {
            let old = decode_forward(&bytes)?;
            if old == value {
                return Ok(());
            }
            Self::remove_from_buckets(store, txn, field, old, id)?;
        }

        txn.put_cf(fwd_cf, &key, value.to_le_bytes())?;
        Self::add_to_buckets(store, txn, field, value, id)
    }

    /// Remove the field's value for `id` in its own transaction.
    /// Silent no-op when absent.
    pub fn remove(store: &FilterStore, field: &str, id: IdInt) -> Result<(), FilterError> {
        let txn = store.begin();
        Self::remove_tx(store, &txn, field, id)?;
        txn.commit().map_err(FilterError::from)
    }

    /// Remove inside a caller-owned transaction.
    pub fn remove_tx(
        store: &FilterStore,
        txn: &StoreTxn<'_>,
        field: &str,
        id: IdInt,
    ) -> Result<(), FilterError> {
        let fwd_cf = store.cf(CF_NUMERIC_FORWARD)?;
        let key = forward_key(field, id);

        if let Some(bytes) = txn.get_cf(fwd_cf, &key)? {
            let old = decode_forward(&bytes)?;
            Self::remove_from_buckets(store, txn, field, old, id)?;
            txn.delete_cf(fwd_cf, &key)?;
        }
        Ok(())
    }

    fn remove_from_buckets(
        store: &FilterStore,
        txn: &StoreTxn<'_>,
        field: &str,
        value: u32,
        id: IdInt,
    ) -> Result<(), FilterError> {
        let inv_cf = store.cf(CF_NUMERIC_INVERTED)?;
        let prefix = field_prefix(field);
        let target = bucket_key(field, value);

        let entry = {
            let mut it = txn.raw_iterator_cf(inv_cf);
            seek_floor(&mut it, &target, &prefix)
        };
        let Some((key, payload)) = entry else {
            return Ok(());
        };

        let mut bucket = Bucket::deserialize(&payload, bucket_key_base(&key))?;
        if bucket.remove(id) {
            if bucket.is_empty() {
                txn.delete_cf(inv_cf, &key)?;
            } else {
                txn.put_cf(inv_cf, &key, bucket.serialize()?)?;
            }
        }
        Ok(())
    }

    fn add_to_buckets(
        store: &FilterStore,
        txn: &StoreTxn<'_>,
        field: &str,
        value: u32,
        id: IdInt,
    ) -> Result<(), FilterError> {
        let inv_cf = store.cf(CF_NUMERIC_INVERTED)?;
        let prefix = field_prefix(field);
        let target = bucket_key(field, value);

        let candidate = {
            let mut it = txn.raw_iterator_cf(inv_cf);
            seek_floor(&mut it, &target, &prefix)
        };
        // the floor bucket owns the value only if its window reaches it
        let owning =
            candidate.filter(|(key, _)| value - bucket_key_base(key) <= BUCKET_MAX_DELTA);

        let Some((key, payload)) = owning else {
            let mut bucket = Bucket::new(value);
            bucket.insert(value, id)?;
            txn.put_cf(inv_cf, &target, bucket.serialize()?)?;
            return Ok(());
        };

        let mut bucket = Bucket::deserialize(&payload, bucket_key_base(&key))?;
        if bucket.is_full() {
            return Self::split_and_insert(store, txn, field, bucket, &key, value, id);
        }
        bucket.insert(value, id)?;
        txn.put_cf(inv_cf, &key, bucket.serialize()?)?;
        Ok(())
    }

    fn split_and_insert(
        store: &FilterStore,
        txn: &StoreTxn<'_>,
        field: &str,
        mut left: Bucket,
        left_key: &[u8],
        value: u32,
        id: IdInt,
    ) -> Result<(), FilterError> {
        let inv_cf = store.cf(CF_NUMERIC_INVERTED)?;

        let Some(at) = left.slide_split_point() else {
            // every entry shares one delta: a value-based split would place
            // both halves at the same key, so the bucket absorbs the
            // newcomer and runs past its nominal capacity
            warn!(
                field,
                base = left.base_value,
                len = left.len(),
                "bucket holds a single value run; growing past capacity"
            );
            left.insert(value, id)?;
            txn.put_cf(inv_cf, left_key, left.serialize()?)?;
            return Ok(());
        };

        let mut right = left.split_off(at)?;
        if value >= right.base_value {
            right.insert(value, id)?;
        } else {
            left.insert(value, id)?;
        }

        debug!(
            field,
            left_base = left.base_value,
            right_base = right.base_value,
            left_len = left.len(),
            right_len = right.len(),
            "bucket split"
        );

        txn.put_cf(inv_cf, left_key, left.serialize()?)?;
        txn.put_cf(
            inv_cf,
            bucket_key(field, right.base_value),
            right.serialize()?,
        )?;
        Ok(())
    }

    // ── Queries ───────────────────────────────────────

    /// All IDs whose value lies in `[min_val, max_val]` (inclusive, in
    /// sortable space). Runs in its own read transaction.
    pub fn range(
        store: &FilterStore,
        field: &str,
        min_val: u32,
        max_val: u32,
    ) -> Result<IdBitmap, FilterError> {
        let txn = store.begin();
        Self::range_tx(store, &txn, field, min_val, max_val)
    }

    /// Range scan inside a caller-owned transaction.
    ///
    /// Buckets provably inside the window pay a single bitmap union via
    /// the summary peek; edge buckets are filtered entry by entry.
    pub fn range_tx(
        store: &FilterStore,
        txn: &StoreTxn<'_>,
        field: &str,
        min_val: u32,
        max_val: u32,
    ) -> Result<IdBitmap, FilterError> {
        let inv_cf = store.cf(CF_NUMERIC_INVERTED)?;
        let prefix = field_prefix(field);
        let start = bucket_key(field, min_val);

        let mut result = IdBitmap::new();
        let mut it = txn.raw_iterator_cf(inv_cf);
        seek_range_start(&mut it, &start, &prefix);

        while it.valid() {
            let Some(key) = it.key() else { break };
            if !key.starts_with(&prefix) {
                break;
            }
            let base = bucket_key_base(key);
            if base > max_val {
                break;
            }
            let Some(payload) = it.value() else { break };

            if base >= min_val && base.saturating_add(BUCKET_MAX_DELTA) <= max_val {
                // whole window is inside the query: bitmap-only read
                result |= Bucket::peek_summary(payload)?;
            } else {
                let bucket = Bucket::deserialize(payload, base)?;
                if !bucket.is_empty() {
                    let b_min = bucket.value_at(0);
                    let b_max = bucket.value_at(bucket.len() - 1);
                    if b_min >= min_val && b_max <= max_val {
                        result |= &bucket.summary;
                    } else {
                        for i in 0..bucket.len() {
                            let v = bucket.value_at(i);
                            if v >= min_val && v <= max_val {
                                result.insert(bucket.ids[i]);
                            }
                        }
                    }
                }
            }
            it.next();
        }
        Ok(result)
    }

    /// Per-ID point check via the forward entry.
    pub fn check_range(
        store: &FilterStore,
        field: &str,
        id: IdInt,
        min_val: u32,
        max_val: u32,
    ) -> Result<bool, FilterError> {
        let txn = store.begin();
        Self::check_range_tx(store, &txn, field, id, min_val, max_val)
    }

    /// Point check inside a caller-owned transaction.
    pub fn check_range_tx(
        store: &FilterStore,
        txn: &StoreTxn<'_>,
        field: &str,
        id: IdInt,
        min_val: u32,
        max_val: u32,
    ) -> Result<bool, FilterError> {
        let fwd_cf = store.cf(CF_NUMERIC_FORWARD)?;
        match txn.get_cf(fwd_cf, forward_key(field, id))? {
            Some(bytes) => {
                let v = decode_forward(&bytes)?;
                Ok(v >= min_val && v <= max_val)
            }
            None => Ok(false),
        }
    }

    /// Upper-bound entry count for `[min_val, max_val]`, for the planner.
    ///
    /// Sums the counts of every touched bucket via the count peek; edge
    /// buckets contribute their full count, so the estimate may exceed the
    /// true cardinality but never falls below it.
    pub fn cardinality_estimate_tx(
        store: &FilterStore,
        txn: &StoreTxn<'_>,
        field: &str,
        min_val: u32,
        max_val: u32,
    ) -> Result<u64, FilterError> {
        let inv_cf = store.cf(CF_NUMERIC_INVERTED)?;
        let prefix = field_prefix(field);
        let start = bucket_key(field, min_val);

        let mut total: u64 = 0;
        let mut it = txn.raw_iterator_cf(inv_cf);
        seek_range_start(&mut it, &start, &prefix);

        while it.valid() {
            let Some(key) = it.key() else { break };
            if !key.starts_with(&prefix) {
                break;
            }
            if bucket_key_base(key) > max_val {
                break;
            }
            let Some(payload) = it.value() else { break };
            total += Bucket::peek_count(payload)? as u64;
            it.next();
        }
        Ok(total)
    }
}

fn decode_forward(bytes: &[u8]) -> Result<u32, FilterError> {
    if bytes.len() < 4 {
        return Err(FilterError::CorruptBucket(
            "numeric forward entry shorter than 4 bytes".into(),
        ));
    }
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[..4]);
    Ok(u32::from_le_bytes(raw))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
