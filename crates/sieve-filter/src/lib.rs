//! # sieve-filter
//!
//! Metadata filtering engine for vector search. Attributes attached to
//! integer IDs are indexed per field and queried as a conjunction of
//! predicates; the result is a roaring bitmap of candidate IDs handed to a
//! downstream search stage.
//!
//! - [`sortable`]  — order-preserving `int32`/`float32` → `u32` encodings
//! - [`bucket`]    — delta-compressed value buckets with summary bitmaps
//! - [`numeric`]   — bucketed numeric index (range queries, sliding splits)
//! - [`inverted`]  — per-`(field, value)` postings for categories/booleans
//! - [`schema`]    — first-write-wins field → type registry
//! - [`predicate`] — typed values and `$eq` / `$in` / `$range` parsing
//! - [`plan`]      — cardinality estimates, cheapest-first intersection
//! - [`search`]    — brute-force vs graph-search dispatch contract
//! - [`filter`]    — the [`Filter`] facade tying it together
//!
//! ## Example
//!
//! ```no_run
//! use sieve_filter::Filter;
//!
//! let filter = Filter::open("/tmp/filters")?;
//! filter.add_filters_from_json(1, &serde_json::json!({"city": "NY", "age": 30}))?;
//! filter.add_filters_from_json(2, &serde_json::json!({"city": "NY", "age": 40}))?;
//!
//! let ids = filter.ids_matching_filter(&serde_json::json!([
//!     {"city": {"$eq": "NY"}},
//!     {"age": {"$range": [0, 35]}},
//! ]))?;
//! assert_eq!(ids, vec![1]);
//! # Ok::<(), sieve_filter::FilterError>(())
//! ```

pub mod bucket;
pub mod error;
pub mod filter;
pub mod inverted;
pub mod numeric;
pub mod plan;
pub mod predicate;
pub mod schema;
pub mod search;
pub mod sortable;

pub use error::FilterError;
pub use filter::Filter;
pub use predicate::{parse_query, FieldValue, Predicate};
pub use schema::FieldType;
pub use search::{SearchPlan, SearchStrategy};
pub use sortable::{float_to_sortable, int_to_sortable, sortable_to_float, sortable_to_int};
