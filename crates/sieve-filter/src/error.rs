//! Error types for the filter engine.

use thiserror::Error;

use sieve_store::StoreError;

use crate::schema::FieldType;

/// Errors surfaced by filter mutations and queries.
#[derive(Debug, Error)]
pub enum FilterError {
    /// A write or query used a value type that disagrees with the field's
    /// bound type. The enclosing transaction is aborted; the store is
    /// unchanged.
    #[error("type mismatch for field '{field}': bound to {bound}, got {got}")]
    TypeMismatch {
        field: String,
        bound: FieldType,
        got: FieldType,
    },

    /// Field name is empty, non-ASCII, or contains `:`.
    #[error("invalid field name '{0}': must be non-empty ASCII without ':'")]
    KeyFormat(String),

    /// A bucket payload failed structural validation. Never repaired in
    /// place; the enclosing transaction is aborted.
    #[error("corrupt bucket payload: {0}")]
    CorruptBucket(String),

    /// A value was inserted into a bucket that cannot represent it.
    /// Indicates a bucket-location bug, not bad caller input.
    #[error("delta overflow: value {value} does not fit bucket base {base}")]
    DeltaOverflow { base: u32, value: u32 },

    /// Malformed query or attribute JSON.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl From<rocksdb::Error> for FilterError {
    fn from(e: rocksdb::Error) -> Self {
        Self::Store(StoreError::Backend(e))
    }
}
