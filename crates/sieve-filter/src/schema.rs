//! Field type registry with first-write-wins binding.
//!
//! The first write to a field binds it to the type inferred from the
//! incoming value; every later write and every typed query predicate is
//! checked against that binding. Bindings are one byte per field in the
//! `schema` column family and are staged in the same transaction as the
//! first data write, so a field can never hold data without a binding.

use std::fmt;

use serde::{Deserialize, Serialize};

use sieve_store::{FilterStore, StoreError, StoreTxn, CF_SCHEMA};

use crate::error::FilterError;

// ─────────────────────────────────────────────
// FieldType
// ─────────────────────────────────────────────

/// The three indexable value kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Numeric,
    Category,
    Boolean,
}

impl FieldType {
    /// One-byte tag persisted in the registry.
    pub fn tag(self) -> u8 {
        match self {
            FieldType::Numeric => 0,
            FieldType::Category => 1,
            FieldType::Boolean => 2,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(FieldType::Numeric),
            1 => Some(FieldType::Category),
            2 => Some(FieldType::Boolean),
            _ => None,
        }
    }

    /// Type inferred from a JSON scalar; `None` for null, arrays, objects.
    pub fn infer(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(_) => Some(FieldType::Numeric),
            serde_json::Value::String(_) => Some(FieldType::Category),
            serde_json::Value::Bool(_) => Some(FieldType::Boolean),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Numeric => write!(f, "numeric"),
            FieldType::Category => write!(f, "category"),
            FieldType::Boolean => write!(f, "boolean"),
        }
    }
}

// ─────────────────────────────────────────────
// SchemaRegistry
// ─────────────────────────────────────────────

pub struct SchemaRegistry;

impl SchemaRegistry {
    /// Reject field names the key layout cannot represent.
    pub fn validate_field_name(field: &str) -> Result<(), FilterError> {
        if field.is_empty() || !field.is_ascii() || field.contains(':') {
            return Err(FilterError::KeyFormat(field.to_string()));
        }
        Ok(())
    }

    /// First-write-wins binding: an absent field binds to `incoming`; a
    /// present field must match it.
    pub fn bind_tx(
        store: &FilterStore,
        txn: &StoreTxn<'_>,
        field: &str,
        incoming: FieldType,
    ) -> Result<(), FilterError> {
        let cf = store.cf(CF_SCHEMA)?;
        match txn.get_cf(cf, field.as_bytes())? {
            Some(bytes) => {
                let bound = decode_tag(field, &bytes)?;
                if bound != incoming {
                    return Err(FilterError::TypeMismatch {
                        field: field.to_string(),
                        bound,
                        got: incoming,
                    });
                }
                Ok(())
            }
            None => {
                txn.put_cf(cf, field.as_bytes(), [incoming.tag()])?;
                Ok(())
            }
        }
    }

    /// The bound type, or `None` for a field that has never been written.
    pub fn get_tx(
        store: &FilterStore,
        txn: &StoreTxn<'_>,
        field: &str,
    ) -> Result<Option<FieldType>, FilterError> {
        let cf = store.cf(CF_SCHEMA)?;
        match txn.get_cf(cf, field.as_bytes())? {
            Some(bytes) => Ok(Some(decode_tag(field, &bytes)?)),
            None => Ok(None),
        }
    }
}

fn decode_tag(field: &str, bytes: &[u8]) -> Result<FieldType, FilterError> {
    let tag = bytes
        .first()
        .copied()
        .ok_or_else(|| StoreError::CorruptMeta(format!("empty schema entry for '{field}'")))?;
    FieldType::from_tag(tag).ok_or_else(|| {
        StoreError::CorruptMeta(format!("unknown type tag {tag} for field '{field}'")).into()
    })
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
