//! Roaring bitmap helpers shared by bucket payloads and postings.
//!
//! All persisted bitmaps use the roaring portable format, so a store
//! written here can be inspected with any CRoaring-compatible tooling.

use std::io;

use crate::ids::{IdBitmap, IdInt};

/// Serialize a bitmap into portable bytes.
pub fn write_bitmap(bm: &IdBitmap) -> io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(bm.serialized_size());
    bm.serialize_into(&mut buf)?;
    Ok(buf)
}

/// Deserialize a portable bitmap from `bytes`.
pub fn read_bitmap(bytes: &[u8]) -> io::Result<IdBitmap> {
    IdBitmap::deserialize_from(bytes)
}

/// Materialize a bitmap as an ascending `Vec` of IDs.
pub fn to_sorted_ids(bm: &IdBitmap) -> Vec<IdInt> {
    bm.iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let bm: IdBitmap = [1 as IdInt, 7, 100, 65_536].into_iter().collect();
        let bytes = write_bitmap(&bm).unwrap();
        let back = read_bitmap(&bytes).unwrap();
        assert_eq!(bm, back);
    }

    #[test]
    fn empty_round_trip() {
        let bm = IdBitmap::new();
        let bytes = write_bitmap(&bm).unwrap();
        assert!(read_bitmap(&bytes).unwrap().is_empty());
    }

    #[test]
    fn sorted_materialization() {
        let bm: IdBitmap = [9 as IdInt, 3, 27, 1].into_iter().collect();
        assert_eq!(to_sorted_ids(&bm), vec![1 as IdInt, 3, 9, 27]);
    }

    #[test]
    fn garbage_bytes_fail() {
        assert!(read_bitmap(&[0xde, 0xad]).is_err());
    }
}
