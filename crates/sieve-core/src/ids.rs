//! External ID width configuration.
//!
//! IDs are opaque unsigned integers assigned by the caller, never reused.
//! The default build uses 32-bit IDs; enabling the `id64` feature switches
//! every ID-carrying structure (bitmaps, bucket payloads, forward entries)
//! to 64-bit. The two widths produce incompatible on-disk layouts, so the
//! store stamps its width at creation and refuses a cross-width open.

// ── 32-bit configuration (default) ───────────────

/// External record ID, exposed to the caller and stored on disk.
#[cfg(not(feature = "id64"))]
pub type IdInt = u32;

/// Set-of-IDs bitmap matching the configured ID width.
#[cfg(not(feature = "id64"))]
pub type IdBitmap = roaring::RoaringBitmap;

// ── 64-bit configuration ─────────────────────────

/// External record ID, exposed to the caller and stored on disk.
#[cfg(feature = "id64")]
pub type IdInt = u64;

/// Set-of-IDs bitmap matching the configured ID width.
#[cfg(feature = "id64")]
pub type IdBitmap = roaring::RoaringTreemap;

/// On-disk size of one ID, in bytes.
pub const ID_WIDTH: usize = std::mem::size_of::<IdInt>();
