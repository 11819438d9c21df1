//! Typed values and query predicates.
//!
//! The query surface is a JSON array interpreted as a conjunction; each
//! element is `{field: {op: operand}}` with ops `$eq`, `$in`, and `$range`.
//! JSON scalars resolve to [`FieldValue`] variants: integer numbers become
//! `Int`, fractional numbers become `Float`, strings become `Category`,
//! booleans become `Bool`. Range bounds are resolved bound-by-bound the
//! same way.

use serde_json::Value;

use crate::error::FilterError;
use crate::schema::{FieldType, SchemaRegistry};
use crate::sortable::{float_to_sortable, int_to_sortable};

// ─────────────────────────────────────────────
// FieldValue
// ─────────────────────────────────────────────

/// A typed scalar attached to a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i32),
    Float(f32),
    Category(String),
    Bool(bool),
}

impl FieldValue {
    /// Resolve a JSON scalar. Nulls, arrays, and objects are rejected, as
    /// are integers outside the 32-bit range.
    pub fn from_json(value: &Value) -> Result<Self, FilterError> {
        match value {
            Value::Bool(b) => Ok(FieldValue::Bool(*b)),
            Value::String(s) => Ok(FieldValue::Category(s.clone())),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    i32::try_from(i).map(FieldValue::Int).map_err(|_| {
                        FilterError::InvalidQuery(format!("integer {i} outside 32-bit range"))
                    })
                } else if let Some(f) = n.as_f64() {
                    Ok(FieldValue::Float(f as f32))
                } else {
                    Err(FilterError::InvalidQuery(format!(
                        "unrepresentable number: {n}"
                    )))
                }
            }
            other => Err(FilterError::InvalidQuery(format!(
                "unsupported scalar: {other}"
            ))),
        }
    }

    /// The registry type this value binds or matches.
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Int(_) | FieldValue::Float(_) => FieldType::Numeric,
            FieldValue::Category(_) => FieldType::Category,
            FieldValue::Bool(_) => FieldType::Boolean,
        }
    }

    /// Sortable-u32 encoding for the numeric variants.
    pub fn sortable(&self) -> Option<u32> {
        match self {
            FieldValue::Int(i) => Some(int_to_sortable(*i)),
            FieldValue::Float(f) => Some(float_to_sortable(*f)),
            _ => None,
        }
    }

    /// Posting-value rendering for the inverted variants.
    pub fn as_posting(&self) -> Option<&str> {
        match self {
            FieldValue::Category(s) => Some(s.as_str()),
            FieldValue::Bool(true) => Some("1"),
            FieldValue::Bool(false) => Some("0"),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────
// Predicate
// ─────────────────────────────────────────────

/// One atomic predicate of the conjunction.
#[derive(Debug, Clone)]
pub enum Predicate {
    Eq { field: String, value: FieldValue },
    In { field: String, values: Vec<FieldValue> },
    /// Inclusive numeric range; each bound carries its own encoding.
    Range {
        field: String,
        lo: FieldValue,
        hi: FieldValue,
    },
}

impl Predicate {
    pub fn field(&self) -> &str {
        match self {
            Predicate::Eq { field, .. }
            | Predicate::In { field, .. }
            | Predicate::Range { field, .. } => field,
        }
    }

    /// The registry type the predicate requires of its field.
    pub fn required_type(&self) -> Result<FieldType, FilterError> {
        match self {
            Predicate::Eq { value, .. } => Ok(value.field_type()),
            Predicate::In { field, values } => {
                let mut tys = values.iter().map(FieldValue::field_type);
                let Some(first) = tys.next() else {
                    // empty $in matches nothing; category keeps it on the
                    // inverted path
                    return Ok(FieldType::Category);
                };
                if tys.all(|t| t == first) {
                    Ok(first)
                } else {
                    Err(FilterError::InvalidQuery(format!(
                        "$in on '{field}' mixes value types"
                    )))
                }
            }
            Predicate::Range { .. } => Ok(FieldType::Numeric),
        }
    }
}

// ─────────────────────────────────────────────
// Query parsing
// ─────────────────────────────────────────────

/// Parse the query surface into atomic predicates.
pub fn parse_query(query: &Value) -> Result<Vec<Predicate>, FilterError> {
    let clauses = query
        .as_array()
        .ok_or_else(|| FilterError::InvalidQuery("query must be a JSON array".into()))?;

    let mut predicates = Vec::with_capacity(clauses.len());
    for clause in clauses {
        let obj = clause
            .as_object()
            .ok_or_else(|| FilterError::InvalidQuery("each clause must be an object".into()))?;
        for (field, ops) in obj {
            SchemaRegistry::validate_field_name(field)?;
            let ops = ops.as_object().ok_or_else(|| {
                FilterError::InvalidQuery(format!("'{field}' must map to an operator object"))
            })?;
            for (op, operand) in ops {
                predicates.push(parse_op(field, op, operand)?);
            }
        }
    }
    Ok(predicates)
}

fn parse_op(field: &str, op: &str, operand: &Value) -> Result<Predicate, FilterError> {
    match op {
        "$eq" => Ok(Predicate::Eq {
            field: field.to_string(),
            value: FieldValue::from_json(operand)?,
        }),
        "$in" => {
            let items = operand
                .as_array()
                .ok_or_else(|| FilterError::InvalidQuery("$in expects an array".into()))?;
            let values = items
                .iter()
                .map(FieldValue::from_json)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Predicate::In {
                field: field.to_string(),
                values,
            })
        }
        "$range" => {
            let bounds = operand
                .as_array()
                .filter(|a| a.len() == 2)
                .ok_or_else(|| FilterError::InvalidQuery("$range expects [lo, hi]".into()))?;
            let lo = FieldValue::from_json(&bounds[0])?;
            let hi = FieldValue::from_json(&bounds[1])?;
            if lo.sortable().is_none() || hi.sortable().is_none() {
                return Err(FilterError::InvalidQuery(
                    "$range bounds must be numeric".into(),
                ));
            }
            Ok(Predicate::Range {
                field: field.to_string(),
                lo,
                hi,
            })
        }
        other => Err(FilterError::InvalidQuery(format!(
            "unknown operator: {other}"
        ))),
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
