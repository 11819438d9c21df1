//! RocksDB environment for the filter.
//!
//! One `TransactionDB` holds five column families:
//! - `numeric_forward`  — `<field>:<id>` → 4-byte sortable value
//! - `numeric_inverted` — `<field>:<be_base>` → bucket payload
//! - `inverted`         — `<field>:<value>` → roaring posting bytes
//! - `schema`           — `<field>` → one-byte type tag
//! - `meta`             — store-wide metadata (ID width stamp)
//!
//! Transactions give the single-writer / multi-reader discipline: mutations
//! stage writes and commit whole; queries read inside a transaction that is
//! simply dropped. Reads see the transaction's own staged writes, so
//! read-modify-write sequences (bucket split, first-write schema binding)
//! stay coherent without an external cache.

use std::path::Path;

use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, Options, Transaction, TransactionDB,
    TransactionDBOptions,
};
use tracing::info;

use sieve_core::ID_WIDTH;

use crate::error::StoreError;

// ─────────────────────────────────────────────
// Column Family names
// ─────────────────────────────────────────────

pub const CF_NUMERIC_FORWARD: &str = "numeric_forward";
pub const CF_NUMERIC_INVERTED: &str = "numeric_inverted";
pub const CF_INVERTED: &str = "inverted";
pub const CF_SCHEMA: &str = "schema";
pub const CF_META: &str = "meta";

const ALL_CFS: &[&str] = &[
    CF_NUMERIC_FORWARD,
    CF_NUMERIC_INVERTED,
    CF_INVERTED,
    CF_SCHEMA,
    CF_META,
];

const META_ID_WIDTH_KEY: &[u8] = b"id_width";

/// A transaction over the filter store.
pub type StoreTxn<'db> = Transaction<'db, TransactionDB>;

// ─────────────────────────────────────────────
// FilterStore
// ─────────────────────────────────────────────

/// Persistent environment shared by every index structure.
pub struct FilterStore {
    db: TransactionDB,
}

impl FilterStore {
    /// Open (or create) the store at `path`.
    ///
    /// A freshly created store is stamped with the build's ID width; an
    /// existing store stamped with the other width fails with
    /// [`StoreError::IdWidthMismatch`] instead of silently misreading
    /// bucket payloads.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let txn_opts = TransactionDBOptions::default();
        let cf_descs: Vec<ColumnFamilyDescriptor> = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect();

        let db = TransactionDB::open_cf_descriptors(&opts, &txn_opts, path.as_ref(), cf_descs)?;
        let store = Self { db };
        store.check_id_width()?;

        info!(
            path = %path.as_ref().display(),
            id_width = ID_WIDTH,
            "filter store opened"
        );
        Ok(store)
    }

    /// Begin a transaction. Commit it for mutations; drop it to abort
    /// (the pattern for read-only use).
    pub fn begin(&self) -> StoreTxn<'_> {
        self.db.transaction()
    }

    /// Column family handle by name.
    pub fn cf(&self, name: &'static str) -> Result<&ColumnFamily, StoreError> {
        self.db
            .cf_handle(name)
            .ok_or(StoreError::MissingColumnFamily(name))
    }

    /// The ID width stamped into the store, in bytes.
    pub fn id_width(&self) -> Result<u8, StoreError> {
        let cf = self.cf(CF_META)?;
        let txn = self.db.transaction();
        match txn.get_cf(cf, META_ID_WIDTH_KEY)? {
            Some(bytes) => bytes
                .first()
                .copied()
                .ok_or_else(|| StoreError::CorruptMeta("empty id_width entry".into())),
            None => Err(StoreError::CorruptMeta("missing id_width entry".into())),
        }
    }

    fn check_id_width(&self) -> Result<(), StoreError> {
        let cf = self.cf(CF_META)?;
        let txn = self.db.transaction();
        match txn.get_cf(cf, META_ID_WIDTH_KEY)? {
            Some(bytes) => {
                let stored = *bytes
                    .first()
                    .ok_or_else(|| StoreError::CorruptMeta("empty id_width entry".into()))?;
                if stored as usize != ID_WIDTH {
                    return Err(StoreError::IdWidthMismatch {
                        stored,
                        expected: ID_WIDTH as u8,
                    });
                }
                Ok(())
            }
            None => {
                txn.put_cf(cf, META_ID_WIDTH_KEY, [ID_WIDTH as u8])?;
                txn.commit()?;
                Ok(())
            }
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
