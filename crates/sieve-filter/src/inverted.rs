//! Inverted postings for category and boolean fields.
//!
//! One roaring bitmap per `(field, value)` pair, keyed `<field>:<value>`.
//! Booleans reuse the category machinery with the values `"0"` and `"1"`.
//! Postings delete their key when the last member leaves, so the column
//! family never accumulates empty bitmaps.

use sieve_core::{read_bitmap, write_bitmap, IdBitmap, IdInt};
use sieve_store::{posting_key, FilterStore, StoreError, StoreTxn, CF_INVERTED};

use crate::error::FilterError;

pub struct InvertedIndex;

impl InvertedIndex {
    // ── Mutations ─────────────────────────────────────

    /// Add `id` to the posting for `(field, value)`.
    pub fn add_tx(
        store: &FilterStore,
        txn: &StoreTxn<'_>,
        field: &str,
        value: &str,
        id: IdInt,
    ) -> Result<(), FilterError> {
        let cf = store.cf(CF_INVERTED)?;
        let key = posting_key(field, value);
        let mut bm = match txn.get_cf(cf, &key)? {
            Some(bytes) => decode_posting(&bytes)?,
            None => IdBitmap::new(),
        };
        bm.insert(id);
        txn.put_cf(cf, &key, encode_posting(&mut bm)?)?;
        Ok(())
    }

    /// Remove `id` from the posting; deletes the key when the posting
    /// empties. Silent no-op when the ID or posting is absent.
    pub fn remove_tx(
        store: &FilterStore,
        txn: &StoreTxn<'_>,
        field: &str,
        value: &str,
        id: IdInt,
    ) -> Result<(), FilterError> {
        let cf = store.cf(CF_INVERTED)?;
        let key = posting_key(field, value);
        let Some(bytes) = txn.get_cf(cf, &key)? else {
            return Ok(());
        };
        let mut bm = decode_posting(&bytes)?;
        if bm.remove(id) {
            if bm.is_empty() {
                txn.delete_cf(cf, &key)?;
            } else {
                txn.put_cf(cf, &key, encode_posting(&mut bm)?)?;
            }
        }
        Ok(())
    }

    // ── Queries ───────────────────────────────────────

    /// The posting bitmap, or an empty bitmap when the pair is unknown.
    pub fn get_tx(
        store: &FilterStore,
        txn: &StoreTxn<'_>,
        field: &str,
        value: &str,
    ) -> Result<IdBitmap, FilterError> {
        let cf = store.cf(CF_INVERTED)?;
        match txn.get_cf(cf, posting_key(field, value))? {
            Some(bytes) => decode_posting(&bytes),
            None => Ok(IdBitmap::new()),
        }
    }

    /// Union of the postings for several values of one field. Order is
    /// irrelevant and duplicate values are idempotent.
    pub fn any_of_tx(
        store: &FilterStore,
        txn: &StoreTxn<'_>,
        field: &str,
        values: &[&str],
    ) -> Result<IdBitmap, FilterError> {
        let mut result = IdBitmap::new();
        for value in values {
            result |= Self::get_tx(store, txn, field, value)?;
        }
        Ok(result)
    }

    /// Posting popcount, exact.
    pub fn cardinality_tx(
        store: &FilterStore,
        txn: &StoreTxn<'_>,
        field: &str,
        value: &str,
    ) -> Result<u64, FilterError> {
        Ok(Self::get_tx(store, txn, field, value)?.len())
    }
}

fn decode_posting(bytes: &[u8]) -> Result<IdBitmap, FilterError> {
    read_bitmap(bytes).map_err(|e| StoreError::Bitmap(e.to_string()).into())
}

/// Run-optimize and serialize a posting for storage.
fn encode_posting(bm: &mut IdBitmap) -> Result<Vec<u8>, FilterError> {
    bm.optimize();
    write_bitmap(bm).map_err(|e| StoreError::Bitmap(e.to_string()).into())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use sieve_core::to_sorted_ids;
    use tempfile::TempDir;

    fn open_temp() -> (FilterStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = FilterStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn add(store: &FilterStore, field: &str, value: &str, id: IdInt) {
        let txn = store.begin();
        InvertedIndex::add_tx(store, &txn, field, value, id).unwrap();
        txn.commit().unwrap();
    }

    #[test]
    fn add_and_get() {
        let (store, _dir) = open_temp();
        add(&store, "city", "Paris", 1);
        add(&store, "city", "London", 2);
        add(&store, "city", "Paris", 3);

        let txn = store.begin();
        let bm = InvertedIndex::get_tx(&store, &txn, "city", "Paris").unwrap();
        assert_eq!(to_sorted_ids(&bm), vec![1, 3]);
        assert_eq!(
            InvertedIndex::cardinality_tx(&store, &txn, "city", "London").unwrap(),
            1
        );
    }

    #[test]
    fn missing_posting_is_empty() {
        let (store, _dir) = open_temp();
        let txn = store.begin();
        assert!(InvertedIndex::get_tx(&store, &txn, "city", "Nowhere")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn remove_deletes_empty_posting_key() {
        let (store, _dir) = open_temp();
        add(&store, "tag", "a", 1);

        let txn = store.begin();
        InvertedIndex::remove_tx(&store, &txn, "tag", "a", 1).unwrap();
        // idempotent second remove
        InvertedIndex::remove_tx(&store, &txn, "tag", "a", 1).unwrap();
        txn.commit().unwrap();

        let cf = store.cf(CF_INVERTED).unwrap();
        let txn = store.begin();
        assert_eq!(txn.get_cf(cf, posting_key("tag", "a")).unwrap(), None);
    }

    #[test]
    fn any_of_unions_values() {
        let (store, _dir) = open_temp();
        add(&store, "color", "Red", 1);
        add(&store, "color", "Blue", 2);
        add(&store, "color", "Green", 3);

        let txn = store.begin();
        let bm =
            InvertedIndex::any_of_tx(&store, &txn, "color", &["Red", "Green", "Red"]).unwrap();
        assert_eq!(to_sorted_ids(&bm), vec![1, 3]);
    }

    #[test]
    fn values_may_contain_separator() {
        let (store, _dir) = open_temp();
        add(&store, "path", "a:b:c", 9);

        let txn = store.begin();
        let bm = InvertedIndex::get_tx(&store, &txn, "path", "a:b:c").unwrap();
        assert_eq!(to_sorted_ids(&bm), vec![9]);
        assert!(InvertedIndex::get_tx(&store, &txn, "path", "a")
            .unwrap()
            .is_empty());
    }
}
