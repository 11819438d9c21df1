//! # sieve-core
//!
//! Shared primitives for the Sieve metadata filter:
//!
//! - [`IdInt`] / [`IdBitmap`] — external ID width and the matching roaring
//!   bitmap type, selected by the `id64` cargo feature
//! - [`bitmap`] — portable bitmap (de)serialization and materialization
//! - [`FilterParams`] — tuning knobs for the planner / search hand-off
//!
//! Everything downstream (`sieve-store`, `sieve-filter`) builds on these
//! aliases so that the 32-bit and 64-bit builds share one code path.

pub mod bitmap;
pub mod ids;
pub mod params;

pub use bitmap::{read_bitmap, to_sorted_ids, write_bitmap};
pub use ids::{IdBitmap, IdInt, ID_WIDTH};
pub use params::{FilterParams, FILTER_BOOST_PERCENTAGE, PREFILTER_CARDINALITY_THRESHOLD};
