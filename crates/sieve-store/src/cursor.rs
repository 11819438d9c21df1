//! Ordered-cursor positioning helpers.
//!
//! RocksDB iterators only expose `seek` (first key >= target), so the
//! "bucket owning a value" lookup seeks forward and steps back when the
//! seek overshoots. A seek past the end of the keyspace falls back to the
//! last entry, which is then accepted only if it still belongs to the
//! field being scanned.

use rocksdb::{DBAccess, DBRawIteratorWithThreadMode};

/// Position `it` on the last key `<= target` that starts with `prefix` and
/// return an owned copy of that entry.
///
/// Returns `None` when the field has no key at or below `target`.
pub fn seek_floor<D: DBAccess>(
    it: &mut DBRawIteratorWithThreadMode<'_, D>,
    target: &[u8],
    prefix: &[u8],
) -> Option<(Vec<u8>, Vec<u8>)> {
    it.seek(target);
    if it.valid() {
        let overshoot = it
            .key()
            .map_or(true, |k| !k.starts_with(prefix) || k > target);
        if overshoot {
            it.prev();
        }
    } else {
        it.seek_to_last();
    }
    if !it.valid() {
        return None;
    }
    let key = it.key()?;
    if !key.starts_with(prefix) || key > target {
        return None;
    }
    Some((key.to_vec(), it.value()?.to_vec()))
}

/// Position `it` on the first bucket that can intersect a range starting at
/// `target`: the same-field floor entry when one exists (it may still cover
/// values above its own key), otherwise the first same-field key at or
/// after `target`. Callers then walk forward and stop on the prefix or
/// upper-bound check.
pub fn seek_range_start<D: DBAccess>(
    it: &mut DBRawIteratorWithThreadMode<'_, D>,
    target: &[u8],
    prefix: &[u8],
) {
    it.seek(target);
    if it.valid() {
        let overshoot = it
            .key()
            .map_or(true, |k| !k.starts_with(prefix) || k > target);
        if overshoot {
            it.prev();
            let prev_in_field = it.valid() && it.key().map_or(false, |k| k.starts_with(prefix));
            if !prev_in_field {
                // no same-field predecessor: scan from the overshoot entry
                it.seek(target);
            }
        }
    } else {
        it.seek_to_last();
    }
}
