//! On-disk key layout.
//!
//! Every key starts with `<field>:`; field names never contain `:`, so the
//! first separator is unambiguous even when a category value contains one.
//! Bucket keys append the bucket base value in big-endian so the store's
//! ascending cursor walks a field's buckets in numeric order.

use sieve_core::IdInt;

pub const KEY_SEPARATOR: u8 = b':';

/// `<field>:` — the common prefix of every key a field owns.
pub fn field_prefix(field: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(field.len() + 1);
    key.extend_from_slice(field.as_bytes());
    key.push(KEY_SEPARATOR);
    key
}

/// Forward-entry key: `<field>:<id_decimal>`.
pub fn forward_key(field: &str, id: IdInt) -> Vec<u8> {
    let mut key = field_prefix(field);
    key.extend_from_slice(id.to_string().as_bytes());
    key
}

/// Bucket key: `<field>:` + big-endian base value.
pub fn bucket_key(field: &str, base: u32) -> Vec<u8> {
    let mut key = field_prefix(field);
    key.extend_from_slice(&base.to_be_bytes());
    key
}

/// Base value from the trailing four bytes of a bucket key.
pub fn bucket_key_base(key: &[u8]) -> u32 {
    match key.len().checked_sub(4) {
        Some(at) => {
            let mut be = [0u8; 4];
            be.copy_from_slice(&key[at..]);
            u32::from_be_bytes(be)
        }
        None => 0,
    }
}

/// Posting key: `<field>:<value>`. The value may itself contain `:`.
pub fn posting_key(field: &str, value: &str) -> Vec<u8> {
    let mut key = field_prefix(field);
    key.extend_from_slice(value.as_bytes());
    key
}
