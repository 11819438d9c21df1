//! # sieve-store
//!
//! Persistence layer for the Sieve metadata filter:
//!
//! - [`store::FilterStore`] — RocksDB `TransactionDB` wrapper with one
//!   column family per index structure
//! - [`keys`] — on-disk key layout for forward entries, buckets, postings
//! - [`cursor`] — ordered-cursor positioning helpers (floor seek,
//!   range-scan start)
//! - [`error::StoreError`] — storage-level failures
//!
//! All mutating callers run inside one transaction obtained from
//! [`store::FilterStore::begin`]; a transaction is committed whole or
//! dropped, in which case every staged write is discarded. Reads inside a
//! transaction observe its own uncommitted writes, which the bucket-split
//! and first-write paths rely on.

pub mod cursor;
pub mod error;
pub mod keys;
pub mod store;

pub use cursor::{seek_floor, seek_range_start};
pub use error::StoreError;
pub use keys::{bucket_key, bucket_key_base, field_prefix, forward_key, posting_key};
pub use store::{
    FilterStore, StoreTxn, CF_INVERTED, CF_META, CF_NUMERIC_FORWARD, CF_NUMERIC_INVERTED,
    CF_SCHEMA,
};
