//! Delta-compressed value buckets for the numeric index.
//!
//! A bucket owns a contiguous window of the sortable-value space. Entries
//! are stored as `u16` deltas from the bucket's base value, sorted
//! ascending, with an ID array aligned index-for-index and a summary
//! bitmap of every member ID. Range scans union the summary directly when
//! a bucket lies entirely inside the query window.
//!
//! Payload layout (little-endian scalars):
//!
//! ```text
//! [bitmap_size: u32][bitmap bytes][count: u16][deltas: u16 * count][ids: IdInt * count]
//! ```
//!
//! The base value is carried by the KV key, never by the payload.

use sieve_core::{read_bitmap, write_bitmap, IdBitmap, IdInt, ID_WIDTH};
use sieve_store::StoreError;

use crate::error::FilterError;

/// Entries per bucket before a split is attempted.
pub const BUCKET_MAX_SIZE: usize = 1024;

/// Largest representable offset from the bucket base.
pub const BUCKET_MAX_DELTA: u32 = 65_535;

// ─────────────────────────────────────────────
// Bucket
// ─────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct Bucket {
    /// Lowest sortable value this bucket can hold; lives in the KV key.
    pub base_value: u32,
    /// Offsets from `base_value`, non-decreasing. Duplicates are legal.
    pub deltas: Vec<u16>,
    /// `ids[i]` holds the value `base_value + deltas[i]`.
    pub ids: Vec<IdInt>,
    /// Every member ID, for O(1) unions during covered range scans.
    pub summary: IdBitmap,
}

impl Bucket {
    pub fn new(base_value: u32) -> Self {
        Self {
            base_value,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.ids.len() >= BUCKET_MAX_SIZE
    }

    /// The sortable value stored at entry `i`.
    pub fn value_at(&self, i: usize) -> u32 {
        self.base_value + u32::from(self.deltas[i])
    }

    /// Insert `(value, id)` keeping the delta array sorted.
    pub fn insert(&mut self, value: u32, id: IdInt) -> Result<(), FilterError> {
        if value < self.base_value || value - self.base_value > BUCKET_MAX_DELTA {
            return Err(FilterError::DeltaOverflow {
                base: self.base_value,
                value,
            });
        }
        let delta = (value - self.base_value) as u16;
        let pos = self.deltas.partition_point(|&d| d < delta);
        self.deltas.insert(pos, delta);
        self.ids.insert(pos, id);
        self.summary.insert(id);
        Ok(())
    }

    /// Remove `id` wherever it sits. Returns whether anything changed.
    pub fn remove(&mut self, id: IdInt) -> bool {
        match self.ids.iter().position(|&x| x == id) {
            Some(i) => {
                self.ids.remove(i);
                self.deltas.remove(i);
                self.summary.remove(id);
                true
            }
            None => false,
        }
    }

    // ── Sliding split ─────────────────────────────────

    /// Split position that keeps the two resulting bucket keys distinct.
    ///
    /// Starts at the median and slides right to the first strictly-greater
    /// delta; if the median's run extends to the end, slides left to the
    /// start of that run instead. Returns `None` when every entry shares
    /// one delta, in which case no value-based split exists and the bucket
    /// is allowed to exceed its nominal capacity.
    pub fn slide_split_point(&self) -> Option<usize> {
        let mid = self.deltas.len() / 2;
        let mut probe = mid;
        while probe > 0 && probe < self.deltas.len() && self.deltas[probe] == self.deltas[probe - 1]
        {
            probe += 1;
        }
        if probe > 0 && probe < self.deltas.len() {
            return Some(probe);
        }
        probe = mid;
        while probe > 0 && self.deltas[probe] == self.deltas[probe - 1] {
            probe -= 1;
        }
        (probe > 0).then_some(probe)
    }

    /// Move entries `[at, len)` into a new bucket keyed at
    /// `base_value + deltas[at]`, rebasing their deltas, and rebuild this
    /// bucket's summary from the survivors.
    pub fn split_off(&mut self, at: usize) -> Result<Bucket, FilterError> {
        let new_base = self.base_value + u32::from(self.deltas[at]);
        let mut right = Bucket::new(new_base);
        for i in at..self.deltas.len() {
            right.insert(self.value_at(i), self.ids[i])?;
        }
        self.deltas.truncate(at);
        self.ids.truncate(at);
        self.summary = self.ids.iter().copied().collect();
        Ok(right)
    }

    // ── Serialization ─────────────────────────────────

    /// Serialize the payload. Run-optimizes the summary bitmap first.
    pub fn serialize(&mut self) -> Result<Vec<u8>, FilterError> {
        let count = self.ids.len();
        if count > usize::from(u16::MAX) {
            return Err(FilterError::CorruptBucket(format!(
                "entry count {count} exceeds the u16 payload field"
            )));
        }

        self.summary.optimize();
        let bm = write_bitmap(&self.summary).map_err(bitmap_err)?;

        let mut buf = Vec::with_capacity(4 + bm.len() + 2 + count * 2 + count * ID_WIDTH);
        buf.extend_from_slice(&(bm.len() as u32).to_le_bytes());
        buf.extend_from_slice(&bm);
        buf.extend_from_slice(&(count as u16).to_le_bytes());
        for d in &self.deltas {
            buf.extend_from_slice(&d.to_le_bytes());
        }
        for id in &self.ids {
            buf.extend_from_slice(&id.to_le_bytes());
        }
        Ok(buf)
    }

    /// Deserialize a payload read at the key carrying `base_value`.
    pub fn deserialize(data: &[u8], base_value: u32) -> Result<Self, FilterError> {
        let mut bucket = Bucket::new(base_value);

        if data.len() < 6 {
            return Err(FilterError::CorruptBucket(format!(
                "payload of {} bytes is below the minimum of 6",
                data.len()
            )));
        }

        let bm_size = read_u32_le(data, 0) as usize;
        let rest = &data[4..];
        if bm_size > rest.len() {
            return Err(FilterError::CorruptBucket(format!(
                "bitmap size {bm_size} exceeds remaining payload {}",
                rest.len()
            )));
        }
        if bm_size > 0 {
            bucket.summary = read_bitmap(&rest[..bm_size])
                .map_err(|e| FilterError::CorruptBucket(format!("summary bitmap: {e}")))?;
        }

        let rest = &rest[bm_size..];
        if rest.len() < 2 {
            return Err(FilterError::CorruptBucket("truncated entry count".into()));
        }
        let count = usize::from(u16::from_le_bytes([rest[0], rest[1]]));
        let rest = &rest[2..];

        let need = count * 2 + count * ID_WIDTH;
        if rest.len() < need {
            return Err(FilterError::CorruptBucket(format!(
                "{count} entries need {need} bytes, payload has {}",
                rest.len()
            )));
        }

        bucket.deltas = rest[..count * 2]
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        bucket.ids = rest[count * 2..need]
            .chunks_exact(ID_WIDTH)
            .map(|c| {
                let mut raw = [0u8; ID_WIDTH];
                raw.copy_from_slice(c);
                IdInt::from_le_bytes(raw)
            })
            .collect();

        Ok(bucket)
    }

    /// Read only the summary bitmap, skipping the entry arrays. Used for
    /// buckets that lie entirely inside a range query.
    pub fn peek_summary(data: &[u8]) -> Result<IdBitmap, FilterError> {
        if data.len() < 4 {
            return Err(FilterError::CorruptBucket("truncated bitmap size".into()));
        }
        let bm_size = read_u32_le(data, 0) as usize;
        if 4 + bm_size > data.len() {
            return Err(FilterError::CorruptBucket(format!(
                "bitmap size {bm_size} exceeds payload {}",
                data.len()
            )));
        }
        if bm_size == 0 {
            return Ok(IdBitmap::new());
        }
        read_bitmap(&data[4..4 + bm_size])
            .map_err(|e| FilterError::CorruptBucket(format!("summary bitmap: {e}")))
    }

    /// Read only the entry count, skipping the bitmap. Used for
    /// cardinality estimation.
    pub fn peek_count(data: &[u8]) -> Result<usize, FilterError> {
        if data.len() < 4 {
            return Err(FilterError::CorruptBucket("truncated bitmap size".into()));
        }
        let bm_size = read_u32_le(data, 0) as usize;
        let at = 4 + bm_size;
        if at + 2 > data.len() {
            return Err(FilterError::CorruptBucket("truncated entry count".into()));
        }
        Ok(usize::from(u16::from_le_bytes([data[at], data[at + 1]])))
    }
}

fn read_u32_le(data: &[u8], at: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&data[at..at + 4]);
    u32::from_le_bytes(raw)
}

fn bitmap_err(e: std::io::Error) -> FilterError {
    FilterError::Store(StoreError::Bitmap(e.to_string()))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket_with(base: u32, values: &[(u32, IdInt)]) -> Bucket {
        let mut b = Bucket::new(base);
        for (v, id) in values {
            b.insert(*v, *id).unwrap();
        }
        b
    }

    #[test]
    fn serialization_round_trip() {
        let mut b = bucket_with(100, &[(105, 1), (110, 2)]);
        let bytes = b.serialize().unwrap();
        assert!(bytes.len() > 6);

        let b2 = Bucket::deserialize(&bytes, 100).unwrap();
        assert_eq!(b2.ids, vec![1, 2]);
        assert_eq!(b2.deltas, vec![5, 10]);
        assert_eq!(b2.summary, b.summary);
    }

    #[test]
    fn insert_keeps_sorted_order_with_duplicates() {
        let b = bucket_with(0, &[(50, 1), (10, 2), (50, 3), (30, 4)]);
        assert_eq!(b.deltas, vec![10, 30, 50, 50]);
        assert_eq!(b.summary.len(), 4);
        for i in 1..b.len() {
            assert!(b.deltas[i - 1] <= b.deltas[i]);
        }
    }

    #[test]
    fn insert_rejects_out_of_window_values() {
        let mut b = Bucket::new(1000);
        assert!(matches!(
            b.insert(999, 1),
            Err(FilterError::DeltaOverflow { .. })
        ));
        assert!(matches!(
            b.insert(1000 + BUCKET_MAX_DELTA + 1, 1),
            Err(FilterError::DeltaOverflow { .. })
        ));
        b.insert(1000 + BUCKET_MAX_DELTA, 1).unwrap();
    }

    #[test]
    fn remove_drops_aligned_entry() {
        let mut b = bucket_with(0, &[(10, 1), (20, 2), (30, 3)]);
        assert!(b.remove(2));
        assert_eq!(b.ids, vec![1, 3]);
        assert_eq!(b.deltas, vec![10, 30]);
        assert!(!b.summary.contains(2));
        assert!(!b.remove(2));
    }

    #[test]
    fn split_point_at_clean_median() {
        let values: Vec<(u32, IdInt)> = (0..8).map(|i| (i * 10, i as IdInt)).collect();
        let b = bucket_with(0, &values);
        assert_eq!(b.slide_split_point(), Some(4));
    }

    #[test]
    fn split_point_slides_right_past_a_run() {
        // deltas: 0 0 5 5 5 5 9 -> median (index 3) sits in the 5-run,
        // first strictly-greater delta is at index 6
        let b = bucket_with(0, &[(0, 1), (0, 2), (5, 3), (5, 4), (5, 5), (5, 6), (9, 7)]);
        assert_eq!(b.slide_split_point(), Some(6));
    }

    #[test]
    fn split_point_slides_left_when_run_reaches_end() {
        // deltas: 1 7 7 7 7 7 -> the run through the median extends to the
        // end, so the split falls back to the run start
        let b = bucket_with(0, &[(1, 1), (7, 2), (7, 3), (7, 4), (7, 5), (7, 6)]);
        assert_eq!(b.slide_split_point(), Some(1));
    }

    #[test]
    fn split_point_none_when_all_identical() {
        let values: Vec<(u32, IdInt)> = (0..6).map(|i| (42, i as IdInt)).collect();
        let b = bucket_with(0, &values);
        assert_eq!(b.slide_split_point(), None);
    }

    #[test]
    fn split_off_rebases_and_rebuilds_summaries() {
        let values: Vec<(u32, IdInt)> = (0..10).map(|i| (100 + i * 10, i as IdInt)).collect();
        let mut left = bucket_with(100, &values);
        let right = left.split_off(5).unwrap();

        assert_eq!(right.base_value, 150);
        assert_eq!(right.deltas, vec![0, 10, 20, 30, 40]);
        assert_eq!(left.len(), 5);
        assert_eq!(left.summary.len(), 5);
        assert_eq!(right.summary.len(), 5);
        for id in 0..5 {
            assert!(left.summary.contains(id as IdInt));
        }
        for id in 5..10 {
            assert!(right.summary.contains(id as IdInt));
        }
    }

    #[test]
    fn deserialize_rejects_truncated_payloads() {
        let mut b = bucket_with(0, &[(1, 1), (2, 2)]);
        let bytes = b.serialize().unwrap();

        assert!(matches!(
            Bucket::deserialize(&bytes[..4], 0),
            Err(FilterError::CorruptBucket(_))
        ));
        assert!(matches!(
            Bucket::deserialize(&bytes[..bytes.len() - 1], 0),
            Err(FilterError::CorruptBucket(_))
        ));
    }

    #[test]
    fn deserialize_rejects_oversized_bitmap_length() {
        let mut payload = vec![0u8; 10];
        payload[..4].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            Bucket::deserialize(&payload, 0),
            Err(FilterError::CorruptBucket(_))
        ));
    }

    #[test]
    fn peek_summary_matches_full_deserialize() {
        let mut b = bucket_with(500, &[(510, 7), (520, 8), (530, 9)]);
        let bytes = b.serialize().unwrap();
        let peeked = Bucket::peek_summary(&bytes).unwrap();
        assert_eq!(peeked, b.summary);
    }

    #[test]
    fn peek_count_skips_bitmap() {
        let mut b = bucket_with(0, &[(1, 1), (2, 2), (3, 3)]);
        let bytes = b.serialize().unwrap();
        assert_eq!(Bucket::peek_count(&bytes).unwrap(), 3);
    }
}
